//! # Relay
//!
//! A relay is a node in a dataflow graph: it owns a [`Processor`], keeps an
//! ordered set of output relays and an ordered set of input relays, and runs
//! its processor whenever enough values have arrived.
//!
//! ## Connectivity
//!
//! An edge `a -> b` is stored twice: `b` in `a`'s outputs and `a` in `b`'s
//! inputs. Connecting and disconnecting always edit both halves under both
//! relays' locks, so the two lists never disagree. Connecting is idempotent.
//!
//! Outputs are held strongly (a relay created with [`Relay::pass`] lives as
//! long as its upstream); inputs are held weakly. Cycles through outputs keep
//! their relays alive until one of their edges is disconnected.
//!
//! ## Dispatch
//!
//! ```text
//! receive(values) -> gate -> chunk -> processor -> Ready(v)   -> outputs.receive(v)
//!                                               -> Pending(f) -> spawn, then outputs.receive(v)
//!                                               -> Err / panic -> absorbed, reported
//! ```
//!
//! The number of input edges is the arity. A relay without inputs dispatches
//! every `receive` call as one chunk. Otherwise values are buffered and every
//! full chunk is dispatched before `receive` returns.
//!
//! Synchronous fan-out runs on an explicit work stack rather than by
//! recursion, so a chain of any length is walked with constant stack depth.
//! The walk is pre-order: a chunk's result reaches the first output and
//! everything downstream of it before the second output is notified, and
//! the relay takes its next chunk only after the previous one has been fully
//! fanned out. Every relay observes the same order a recursive walk gives.
//!
//! ## Example
//!
//! ```rust
//! use relay::{Processor, ProcessorError, Relay, payload};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//!
//! let a = Relay::new(Processor::sync(|args| Ok::<_, ProcessorError>(*args.get::<bool>(0)?)));
//! let b = Relay::new(Processor::sync(|args| Ok::<_, ProcessorError>(*args.get::<bool>(0)?)));
//! let and = Relay::new(Processor::sync(|args| {
//!   Ok::<_, ProcessorError>(*args.get::<bool>(0)? && *args.get::<bool>(1)?)
//! }));
//!
//! a.connect_to(&and);
//! b.connect_to(&and);
//! and.pass(Processor::inspect(move |args| {
//!   if let Some(v) = args.try_get::<bool>(0) {
//!     sink.lock().unwrap().push(*v);
//!   }
//! }));
//!
//! a.send(true);
//! b.send(false);
//! assert_eq!(*seen.lock().unwrap(), vec![false]);
//! ```

use crate::config::RelayConfig;
use crate::endpoint::Endpoint;
use crate::error::{FailureReport, FailureStage, ProcessorError};
use crate::gate::Gate;
use crate::payload::{Args, Payload, payload};
use crate::processor::{Output, PendingOutput, Processor};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a relay.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RelayId(u64);

impl RelayId {
  fn next() -> Self {
    Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
  }

  /// The raw id value.
  pub fn get(self) -> u64 {
    self.0
  }
}

impl fmt::Display for RelayId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "relay#{}", self.0)
  }
}

struct InputEdge {
  id: RelayId,
  source: Weak<Inner>,
}

struct State {
  outputs: Vec<Relay>,
  inputs: Vec<InputEdge>,
  gate: Gate,
}

impl State {
  fn add_output(&mut self, target: &Relay) -> bool {
    if self.outputs.iter().any(|relay| relay == target) {
      return false;
    }
    self.outputs.push(target.clone());
    true
  }

  fn add_input(&mut self, source: &Relay) -> bool {
    if self.inputs.iter().any(|edge| edge.id == source.id()) {
      return false;
    }
    self.inputs.push(InputEdge {
      id: source.id(),
      source: Arc::downgrade(&source.inner),
    });
    true
  }

  fn remove_output(&mut self, target: RelayId) -> Option<Relay> {
    let index = self.outputs.iter().position(|relay| relay.id() == target)?;
    Some(self.outputs.remove(index))
  }

  fn remove_input(&mut self, source: RelayId) -> bool {
    let before = self.inputs.len();
    self.inputs.retain(|edge| edge.id != source);
    self.gate.discard(source);
    self.inputs.len() != before
  }

  fn input_ids(&self) -> Vec<RelayId> {
    self.inputs.iter().map(|edge| edge.id).collect()
  }
}

struct Inner {
  id: RelayId,
  processor: Processor,
  config: RelayConfig,
  state: Mutex<State>,
}

impl Drop for Inner {
  // Unwinds long output chains iteratively instead of one nested drop per relay.
  fn drop(&mut self) {
    let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
    let mut orphans = std::mem::take(&mut state.outputs);
    while let Some(relay) = orphans.pop() {
      if let Ok(mut inner) = Arc::try_unwrap(relay.inner) {
        let state = inner.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        orphans.append(&mut state.outputs);
      }
    }
  }
}

/// Pending work on the dispatch stack.
enum Step {
  /// Values that still have to pass through `target`'s gate.
  Deliver {
    target: Relay,
    source: Option<RelayId>,
    values: Vec<Payload>,
  },
  /// Dispatch the relay's next complete chunk, if any.
  Drain(Relay),
}

/// Handle to a dataflow node.
///
/// Cloning a `Relay` clones the handle; all clones refer to the same node and
/// compare equal.
#[derive(Clone)]
pub struct Relay {
  inner: Arc<Inner>,
}

impl Relay {
  /// Creates a relay running `processor` with the default configuration.
  pub fn new(processor: Processor) -> Self {
    Self::with_config(processor, RelayConfig::default())
  }

  /// Creates a relay running `processor` with `config`.
  pub fn with_config(processor: Processor, config: RelayConfig) -> Self {
    let gate = Gate::new(config.gate);
    Self {
      inner: Arc::new(Inner {
        id: RelayId::next(),
        processor,
        config,
        state: Mutex::new(State {
          outputs: Vec::new(),
          inputs: Vec::new(),
          gate,
        }),
      }),
    }
  }

  /// Identity of this relay.
  pub fn id(&self) -> RelayId {
    self.inner.id
  }

  /// Configured name, if any.
  pub fn name(&self) -> Option<&str> {
    self.inner.config.name.as_deref()
  }

  /// Configuration this relay was built with.
  pub fn config(&self) -> &RelayConfig {
    &self.inner.config
  }

  /// Snapshot of the output relays, in connection order.
  pub fn outputs(&self) -> Vec<Relay> {
    self.lock().outputs.clone()
  }

  /// Snapshot of the input relays that are still alive, in connection order.
  pub fn inputs(&self) -> Vec<Relay> {
    self
      .lock()
      .inputs
      .iter()
      .filter_map(|edge| edge.source.upgrade())
      .map(|inner| Relay { inner })
      .collect()
  }

  /// Number of input edges, which is the chunk size of this relay.
  ///
  /// Edges whose source has been dropped still count until disconnected.
  pub fn arity(&self) -> usize {
    self.lock().inputs.len()
  }

  /// Number of received values waiting for a complete chunk.
  pub fn buffered(&self) -> usize {
    self.lock().gate.buffered()
  }

  // ==========================================================================
  // Connectivity
  // ==========================================================================

  /// Adds the edge `self -> other`. Does nothing if `other` is not a relay or
  /// the edge already exists.
  pub fn connect_to<E: Endpoint + ?Sized>(&self, other: &E) -> &Self {
    if let Some(target) = other.as_relay() {
      self.link(target);
    }
    self
  }

  /// Adds the edge `other -> self`.
  pub fn connect_from<E: Endpoint + ?Sized>(&self, other: &E) -> &Self {
    if let Some(source) = other.as_relay() {
      source.link(self);
    }
    self
  }

  /// Removes the edge `self -> other` from both endpoints.
  pub fn disconnect_to<E: Endpoint + ?Sized>(&self, other: &E) -> &Self {
    if let Some(target) = other.as_relay() {
      self.unlink(target);
    }
    self
  }

  /// Removes the edge `other -> self` from both endpoints.
  pub fn disconnect_from<E: Endpoint + ?Sized>(&self, other: &E) -> &Self {
    if let Some(source) = other.as_relay() {
      source.unlink(self);
    }
    self
  }

  /// `true` if `other` is a relay among this relay's outputs.
  pub fn is_connected_to<E: Endpoint + ?Sized>(&self, other: &E) -> bool {
    other
      .as_relay()
      .is_some_and(|target| self.lock().outputs.iter().any(|relay| relay == target))
  }

  /// `true` if `other` is a relay among this relay's inputs.
  pub fn is_connected_from<E: Endpoint + ?Sized>(&self, other: &E) -> bool {
    other.as_relay().is_some_and(|source| {
      self
        .lock()
        .inputs
        .iter()
        .any(|edge| edge.id == source.id())
    })
  }

  /// `true` if an edge exists in either direction.
  pub fn is_connected<E: Endpoint + ?Sized>(&self, other: &E) -> bool {
    self.is_connected_to(other) || self.is_connected_from(other)
  }

  /// `true` if edges exist in both directions.
  pub fn is_connected_bothways<E: Endpoint + ?Sized>(&self, other: &E) -> bool {
    self.is_connected_to(other) && self.is_connected_from(other)
  }

  fn link(&self, target: &Relay) {
    let (added_output, added_input) = if self == target {
      let mut state = self.lock();
      (state.add_output(target), state.add_input(self))
    } else {
      let (mut source, mut dest) = self.lock_pair(target);
      (source.add_output(target), dest.add_input(self))
    };
    if added_output || added_input {
      debug!(source = %self.id(), target = %target.id(), "connected");
    }
  }

  fn unlink(&self, target: &Relay) {
    let (removed, removed_input) = if self == target {
      let mut state = self.lock();
      (state.remove_output(target.id()), state.remove_input(self.id()))
    } else {
      let (mut source, mut dest) = self.lock_pair(target);
      (source.remove_output(target.id()), dest.remove_input(self.id()))
    };
    if removed.is_some() || removed_input {
      debug!(source = %self.id(), target = %target.id(), "disconnected");
    }
  }

  /// Locks `self` and `other`, always in id order, returning the guards as
  /// `(self, other)`.
  fn lock_pair<'a>(&'a self, other: &'a Relay) -> (MutexGuard<'a, State>, MutexGuard<'a, State>) {
    if self.id() < other.id() {
      let first = self.lock();
      let second = other.lock();
      (first, second)
    } else {
      let second = other.lock();
      let first = self.lock();
      (first, second)
    }
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ==========================================================================
  // Dispatch
  // ==========================================================================

  /// Delivers `values` to this relay.
  ///
  /// With no input edges the values are dispatched at once as one chunk.
  /// Otherwise they are buffered and every complete chunk is dispatched before
  /// this returns; results are fanned out to the outputs. Processor failures
  /// are absorbed.
  pub fn receive<I>(&self, values: I) -> &Self
  where
    I: IntoIterator<Item = Payload>,
  {
    self.deliver(None, values.into_iter().collect());
    self
  }

  /// Delivers a single value, wrapping it into a [`Payload`].
  pub fn send<T: Any + Send + Sync>(&self, value: T) -> &Self {
    self.receive([payload(value)])
  }

  /// Delivers `values` on behalf of `source`.
  ///
  /// In [`GateMode::Tagged`](crate::GateMode::Tagged) the values are queued on
  /// `source`'s input edge; arity mode ignores the origin.
  pub fn receive_from<E, I>(&self, source: &E, values: I) -> &Self
  where
    E: Endpoint + ?Sized,
    I: IntoIterator<Item = Payload>,
  {
    let source = source.as_relay().map(Relay::id);
    self.deliver(source, values.into_iter().collect());
    self
  }

  /// Creates a relay running `processor`, connects this relay to it, and
  /// returns this relay.
  pub fn pass(&self, processor: Processor) -> &Self {
    self.pass_with(processor, RelayConfig::default())
  }

  /// Like [`Relay::pass`] with an explicit configuration for the new relay.
  pub fn pass_with(&self, processor: Processor, config: RelayConfig) -> &Self {
    let next = Relay::with_config(processor, config);
    self.connect_to(&next)
  }

  fn deliver(&self, source: Option<RelayId>, values: Vec<Payload>) {
    run(vec![Step::Deliver {
      target: self.clone(),
      source,
      values,
    }]);
  }

  /// Feeds one delivery to the gate. A relay without inputs dispatches it
  /// straight away; otherwise the relay is scheduled to drain its buffer.
  fn admit(&self, source: Option<RelayId>, values: Vec<Payload>, stack: &mut Vec<Step>) {
    let immediate = {
      let mut state = self.lock();
      let inputs = state.input_ids();
      state.gate.push(&inputs, source, values)
    };
    match immediate {
      Some(chunk) => {
        if let Some(result) = self.dispatch(chunk) {
          self.push_fan_out(result, stack);
        }
      }
      None => stack.push(Step::Drain(self.clone())),
    }
  }

  /// Dispatches the next buffered chunk. If another complete chunk is already
  /// waiting, its continuation goes underneath this chunk's fan-out; chunks
  /// completed during the fan-out are drained by the delivery that completes
  /// them.
  fn drain_one(&self, stack: &mut Vec<Step>) {
    let (chunk, more) = {
      let mut state = self.lock();
      let inputs = state.input_ids();
      let chunk = state.gate.next_chunk(&inputs);
      (chunk, state.gate.is_ready(&inputs))
    };
    let Some(chunk) = chunk else {
      return;
    };
    if more {
      stack.push(Step::Drain(self.clone()));
    }
    if let Some(result) = self.dispatch(chunk) {
      self.push_fan_out(result, stack);
    }
  }

  fn dispatch(&self, chunk: Vec<Payload>) -> Option<Payload> {
    trace!(relay = %self.id(), name = self.name(), args = chunk.len(), "dispatch");
    match self.invoke(Args::from(chunk)) {
      Ok(Output::Ready(result)) => Some(result),
      Ok(Output::Pending(pending)) => {
        self.schedule(pending);
        None
      }
      Err(error) => {
        self.report(FailureStage::Invoke, error);
        None
      }
    }
  }

  fn invoke(&self, args: Args) -> Result<Output, ProcessorError> {
    let processor = &self.inner.processor;
    if !self.inner.config.catch_panics {
      return processor.call(args);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| processor.call(args))) {
      Ok(result) => result,
      Err(panic) => Err(ProcessorError::from_panic(&*panic)),
    }
  }

  fn schedule(&self, pending: PendingOutput) {
    let runtime = match self.inner.config.runtime.clone() {
      Some(runtime) => runtime,
      None => match Handle::try_current() {
        Ok(runtime) => runtime,
        Err(_) => {
          self.report(FailureStage::Schedule, ProcessorError::NoRuntime);
          return;
        }
      },
    };
    let relay = self.clone();
    let catch_panics = self.inner.config.catch_panics;
    runtime.spawn(async move {
      let resolved = if catch_panics {
        match AssertUnwindSafe(pending).catch_unwind().await {
          Ok(resolved) => resolved,
          Err(panic) => Err(ProcessorError::from_panic(&*panic)),
        }
      } else {
        pending.await
      };
      match resolved {
        Ok(result) => {
          trace!(relay = %relay.id(), name = relay.name(), "pending output resolved");
          let mut stack = Vec::new();
          relay.push_fan_out(result, &mut stack);
          run(stack);
        }
        Err(error) => relay.report(FailureStage::Resolve, error),
      }
    });
  }

  /// Stacks one delivery of `result` per output, the first output on top.
  fn push_fan_out(&self, result: Payload, stack: &mut Vec<Step>) {
    for output in self.outputs().into_iter().rev() {
      stack.push(Step::Deliver {
        target: output,
        source: Some(self.id()),
        values: vec![result.clone()],
      });
    }
  }

  fn report(&self, stage: FailureStage, error: ProcessorError) {
    warn!(
      relay = %self.id(),
      name = self.name(),
      ?stage,
      %error,
      "processor failure absorbed"
    );
    if let Some(hook) = &self.inner.config.on_failure {
      hook(&FailureReport::new(
        self.id(),
        self.inner.config.name.clone(),
        stage,
        error,
      ));
    }
  }
}

fn run(mut stack: Vec<Step>) {
  while let Some(step) = stack.pop() {
    match step {
      Step::Deliver {
        target,
        source,
        values,
      } => target.admit(source, values, &mut stack),
      Step::Drain(relay) => relay.drain_one(&mut stack),
    }
  }
}

impl Default for Relay {
  /// A pass-through relay running [`Processor::identity`].
  fn default() -> Self {
    Self::new(Processor::identity())
  }
}

impl PartialEq for Relay {
  fn eq(&self, other: &Self) -> bool {
    self.inner.id == other.inner.id
  }
}

impl Eq for Relay {}

impl Hash for Relay {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.inner.id.hash(state);
  }
}

impl fmt::Debug for Relay {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Relay")
      .field("id", &self.inner.id)
      .field("name", &self.inner.config.name)
      .finish_non_exhaustive()
  }
}
