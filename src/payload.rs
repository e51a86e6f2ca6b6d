//! # Payloads and Typed Argument Access
//!
//! Values travel between relays as [`Payload`]s: `Arc<dyn Any + Send + Sync>`.
//! Fan-out hands the same `Arc` to every output relay, so a result is shared,
//! never copied and never exclusively owned by a downstream processor.
//!
//! Processors receive their chunk as [`Args`], which keeps the raw payloads in
//! arrival order and offers checked downcasts by position.
//!
//! ## Example
//!
//! ```rust
//! use relay::{Args, payload};
//!
//! let args = Args::from(vec![payload(true), payload(7u8)]);
//! assert_eq!(args.get::<bool>(0).ok(), Some(&true));
//! assert!(args.try_get::<u8>(0).is_none());
//! ```

use crate::error::ProcessorError;
use std::any::Any;
use std::sync::Arc;

/// A type-erased value flowing through a relay graph.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Wraps a value into a [`Payload`].
///
/// Passing a value that already is a `Payload` returns it unchanged instead of
/// nesting one `Arc` inside another.
pub fn payload<T: Any + Send + Sync>(value: T) -> Payload {
  let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
  match boxed.downcast::<Payload>() {
    Ok(existing) => *existing,
    Err(other) => Arc::from(other),
  }
}

/// The positional arguments of one dispatch.
///
/// A chunk holds exactly as many values as the relay had input edges when the
/// chunk was released (or whatever the caller passed, for a relay without
/// inputs).
#[derive(Clone, Default)]
pub struct Args {
  values: Vec<Payload>,
}

impl Args {
  /// Number of arguments in this chunk.
  pub fn len(&self) -> usize {
    self.values.len()
  }

  /// Returns `true` if the chunk carries no arguments.
  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Raw payload at `index`.
  pub fn raw(&self, index: usize) -> Option<&Payload> {
    self.values.get(index)
  }

  /// Argument at `index` downcast to `T`, or `None` if it is absent or of
  /// another type.
  pub fn try_get<T: Any>(&self, index: usize) -> Option<&T> {
    self.values.get(index).and_then(|value| (**value).downcast_ref::<T>())
  }

  /// Argument at `index` downcast to `T`.
  ///
  /// # Errors
  ///
  /// [`ProcessorError::MissingArgument`] when the chunk is too short and
  /// [`ProcessorError::TypeMismatch`] when the value is not a `T`. Both are
  /// meant to be returned straight out of a processor with `?`.
  pub fn get<T: Any>(&self, index: usize) -> Result<&T, ProcessorError> {
    let value = self
      .values
      .get(index)
      .ok_or(ProcessorError::MissingArgument {
        index,
        len: self.values.len(),
      })?;
    (**value)
      .downcast_ref::<T>()
      .ok_or(ProcessorError::TypeMismatch {
        index,
        expected: std::any::type_name::<T>(),
      })
  }

  /// Iterates over the raw payloads in positional order.
  pub fn iter(&self) -> std::slice::Iter<'_, Payload> {
    self.values.iter()
  }

  /// Consumes the chunk, returning the raw payloads.
  pub fn into_vec(self) -> Vec<Payload> {
    self.values
  }
}

impl From<Vec<Payload>> for Args {
  fn from(values: Vec<Payload>) -> Self {
    Self { values }
  }
}

impl IntoIterator for Args {
  type Item = Payload;
  type IntoIter = std::vec::IntoIter<Payload>;

  fn into_iter(self) -> Self::IntoIter {
    self.values.into_iter()
  }
}

impl<'a> IntoIterator for &'a Args {
  type Item = &'a Payload;
  type IntoIter = std::slice::Iter<'a, Payload>;

  fn into_iter(self) -> Self::IntoIter {
    self.values.iter()
  }
}

impl std::fmt::Debug for Args {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Args").field("len", &self.values.len()).finish()
  }
}
