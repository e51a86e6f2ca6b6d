//! Per-relay configuration.
//!
//! Built the same way as the other policy types in this crate: start from
//! [`RelayConfig::new`] (or `Default`) and chain `with_*` setters.

use crate::error::FailureReport;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Callback invoked with every absorbed processor failure.
pub type FailureHook = Arc<dyn Fn(&FailureReport) + Send + Sync>;

/// How a relay groups received values into chunks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GateMode {
  /// One FIFO shared by all input edges. A chunk is released as soon as the
  /// buffer holds as many values as the relay has input edges, regardless of
  /// which upstream relay sent them.
  #[default]
  Arity,
  /// One FIFO per input edge. A chunk is released once every edge has a value
  /// queued, and its arguments follow input-edge order. Values from callers
  /// outside the graph fill the least-occupied slot (earliest edge on ties).
  Tagged,
}

/// Configuration of a single relay.
#[derive(Clone)]
pub struct RelayConfig {
  /// Name used in log events and failure reports.
  pub name: Option<String>,
  /// Chunking strategy.
  pub gate: GateMode,
  /// Runtime that drives pending outputs. Falls back to the ambient runtime.
  pub runtime: Option<Handle>,
  /// Receives a report for each absorbed failure.
  pub on_failure: Option<FailureHook>,
  /// Absorb processor panics as failures. When `false`, panics propagate to
  /// the caller of `receive`.
  pub catch_panics: bool,
}

impl RelayConfig {
  /// Default configuration: unnamed, arity gate, ambient runtime, no hook,
  /// panics absorbed.
  pub fn new() -> Self {
    Self {
      name: None,
      gate: GateMode::Arity,
      runtime: None,
      on_failure: None,
      catch_panics: true,
    }
  }

  /// Sets the relay name.
  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// Sets the gate mode.
  pub fn with_gate(mut self, gate: GateMode) -> Self {
    self.gate = gate;
    self
  }

  /// Pins pending outputs to `runtime`.
  pub fn with_runtime(mut self, runtime: Handle) -> Self {
    self.runtime = Some(runtime);
    self
  }

  /// Installs a failure hook.
  pub fn with_failure_hook<F>(mut self, hook: F) -> Self
  where
    F: Fn(&FailureReport) + Send + Sync + 'static,
  {
    self.on_failure = Some(Arc::new(hook));
    self
  }

  /// Chooses whether processor panics are absorbed.
  pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
    self.catch_panics = catch_panics;
    self
  }
}

impl Default for RelayConfig {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for RelayConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RelayConfig")
      .field("name", &self.name)
      .field("gate", &self.gate)
      .field("runtime", &self.runtime.is_some())
      .field("on_failure", &self.on_failure.is_some())
      .field("catch_panics", &self.catch_panics)
      .finish()
  }
}
