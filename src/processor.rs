//! # Processors
//!
//! A [`Processor`] is the function a relay runs on every released chunk. It
//! takes the chunk as [`Args`] and returns either a ready value or a pending
//! one:
//!
//! - [`Output::Ready`]: fanned out immediately, inside the `receive` call
//! - [`Output::Pending`]: spawned on tokio; fanned out once it resolves
//!
//! The constructors cover the common shapes so processors rarely build an
//! [`Output`] by hand:
//!
//! ```rust
//! use relay::{Processor, ProcessorError};
//!
//! let and = Processor::sync(|args| {
//!   Ok::<_, ProcessorError>(*args.get::<bool>(0)? && *args.get::<bool>(1)?)
//! });
//! let delayed = Processor::future(|args| async move {
//!   Ok::<_, ProcessorError>(args.len())
//! });
//! # let _ = (and, delayed);
//! ```

use crate::error::ProcessorError;
use crate::payload::{Args, Payload, payload};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A boxed future resolving to a processor result.
pub type PendingOutput = BoxFuture<'static, Result<Payload, ProcessorError>>;

type ProcessorFn = dyn Fn(Args) -> Result<Output, ProcessorError> + Send + Sync;

/// The result of one processor invocation.
pub enum Output {
  /// A value available now.
  Ready(Payload),
  /// A value that becomes available when the future resolves.
  Pending(PendingOutput),
}

impl Output {
  /// Ready output carrying `value`.
  pub fn ready<T: Any + Send + Sync>(value: T) -> Self {
    Self::Ready(payload(value))
  }

  /// Pending output driven by `future`.
  pub fn pending<F>(future: F) -> Self
  where
    F: Future<Output = Result<Payload, ProcessorError>> + Send + 'static,
  {
    Self::Pending(future.boxed())
  }

  /// Returns `true` for [`Output::Pending`].
  pub fn is_pending(&self) -> bool {
    matches!(self, Self::Pending(_))
  }
}

impl fmt::Debug for Output {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Ready(_) => f.write_str("Output::Ready(..)"),
      Self::Pending(_) => f.write_str("Output::Pending(..)"),
    }
  }
}

/// The function a relay applies to each released chunk.
///
/// Cloning is cheap: clones share the same function.
#[derive(Clone)]
pub struct Processor {
  inner: Arc<ProcessorFn>,
}

impl Processor {
  /// Wraps a raw processor that builds its own [`Output`].
  pub fn new<F>(f: F) -> Self
  where
    F: Fn(Args) -> Result<Output, ProcessorError> + Send + Sync + 'static,
  {
    Self { inner: Arc::new(f) }
  }

  /// The pass-through processor: forwards the whole chunk, in order, as a
  /// `Vec<Payload>`.
  pub fn identity() -> Self {
    Self::new(|args| Ok(Output::ready(args.into_vec())))
  }

  /// A synchronous processor whose value is fanned out immediately.
  pub fn sync<F, T>(f: F) -> Self
  where
    F: Fn(Args) -> Result<T, ProcessorError> + Send + Sync + 'static,
    T: Any + Send + Sync,
  {
    Self::new(move |args| f(args).map(Output::ready))
  }

  /// An asynchronous processor whose value is fanned out once the returned
  /// future resolves.
  pub fn future<F, Fut, T>(f: F) -> Self
  where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ProcessorError>> + Send + 'static,
    T: Any + Send + Sync,
  {
    Self::new(move |args| {
      let pending = f(args);
      Ok(Output::pending(async move { pending.await.map(payload) }))
    })
  }

  /// A side-effect-only processor. Downstream relays receive `()`.
  pub fn inspect<F>(f: F) -> Self
  where
    F: Fn(&Args) + Send + Sync + 'static,
  {
    Self::new(move |args| {
      f(&args);
      Ok(Output::ready(()))
    })
  }

  pub(crate) fn call(&self, args: Args) -> Result<Output, ProcessorError> {
    (self.inner)(args)
  }
}

impl Default for Processor {
  fn default() -> Self {
    Self::identity()
  }
}

impl fmt::Debug for Processor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Processor").finish_non_exhaustive()
  }
}
