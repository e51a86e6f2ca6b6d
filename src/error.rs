//! # Processor Errors and Failure Reports
//!
//! A relay never surfaces an error from its public operations. Processor
//! failures are absorbed where they happen: the failing chunk produces no
//! output, the input buffer has already moved past it, and later chunks are
//! processed normally.
//!
//! Absorbed failures are still observable:
//!
//! - every failure is logged with `tracing::warn!`
//! - a relay configured with a failure hook (see
//!   [`RelayConfig::with_failure_hook`](crate::RelayConfig::with_failure_hook))
//!   receives a [`FailureReport`] per failed chunk
//!
//! ## Failure Stages
//!
//! - **Invoke**: the processor returned `Err` or panicked while being called
//! - **Resolve**: a pending output resolved to `Err` or panicked while polled
//! - **Schedule**: a pending output could not be spawned (no tokio runtime)

use crate::relay::RelayId;
use chrono::{DateTime, Utc};
use std::any::Any;
use thiserror::Error;

/// Error type for processor invocations.
#[derive(Error, Debug)]
pub enum ProcessorError {
  /// The processor rejected its input.
  #[error("processor failed: {0}")]
  Failed(String),
  /// An argument was not of the type the processor expected.
  #[error("argument {index} is not a {expected}")]
  TypeMismatch {
    /// Position of the argument in the chunk.
    index: usize,
    /// Name of the expected type.
    expected: &'static str,
  },
  /// The chunk was shorter than the processor expected.
  #[error("argument {index} missing from a chunk of {len}")]
  MissingArgument {
    /// Position that was requested.
    index: usize,
    /// Length of the chunk.
    len: usize,
  },
  /// The processor panicked; carries the panic message when it was a string.
  #[error("processor panicked: {0}")]
  Panicked(String),
  /// A pending output was produced outside of any tokio runtime.
  #[error("no tokio runtime available to drive a pending output")]
  NoRuntime,
  /// Any other error raised by processor code.
  #[error(transparent)]
  Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProcessorError {
  /// Shorthand for [`ProcessorError::Failed`].
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed(message.into())
  }

  pub(crate) fn from_panic(panic: &(dyn Any + Send)) -> Self {
    let message = if let Some(message) = panic.downcast_ref::<&str>() {
      (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
      message.clone()
    } else {
      "non-string panic payload".to_string()
    };
    Self::Panicked(message)
  }
}

/// Where in the dispatch a failure was absorbed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureStage {
  /// Calling the processor.
  Invoke,
  /// Awaiting a pending output.
  Resolve,
  /// Spawning a pending output.
  Schedule,
}

/// Report of an absorbed processor failure, handed to the failure hook.
#[derive(Debug)]
pub struct FailureReport {
  /// Relay whose processor failed.
  pub relay: RelayId,
  /// Configured name of that relay, if any.
  pub name: Option<String>,
  /// Stage the failure happened in.
  pub stage: FailureStage,
  /// The absorbed error.
  pub error: ProcessorError,
  /// When the failure was absorbed.
  pub at: DateTime<Utc>,
}

impl FailureReport {
  pub(crate) fn new(
    relay: RelayId,
    name: Option<String>,
    stage: FailureStage,
    error: ProcessorError,
  ) -> Self {
    Self {
      relay,
      name,
      stage,
      error,
      at: Utc::now(),
    }
  }
}
