//! # Relay
//!
//! Arity-gated dataflow nodes for composing small functions into a graph.
//!
//! A [`Relay`] holds a [`Processor`], is wired to other relays as inputs and
//! outputs, and fires its processor only once it has received as many values as
//! it has input edges. The single result is forwarded to every output relay,
//! which repeats the same protocol. There is no central scheduler: the graph
//! runs inside the `receive` calls that feed it, plus tokio tasks for
//! processors that return futures.
//!
//! ## Key Features
//!
//! - **Arity Gate**: values are buffered and released in chunks sized to the
//!   number of input edges ([`GateMode::Arity`]), or one per input edge in edge
//!   order ([`GateMode::Tagged`])
//! - **Sync and Async**: processors return a ready value or a future
//!   ([`Output`]); futures are spawned on tokio and fanned out on resolution
//! - **Absorbed Failures**: errors and panics in processors never escape
//!   `receive`; they are logged and optionally reported ([`FailureReport`])
//! - **Zero-Copy Fan-Out**: results are [`Payload`]s (`Arc<dyn Any>`), shared
//!   by every output
//!
//! ## Quick Start
//!
//! ```rust
//! use relay::{Processor, ProcessorError, Relay};
//!
//! let double = Relay::new(Processor::sync(|args| {
//!   Ok::<_, ProcessorError>(args.get::<i32>(0)? * 2)
//! }));
//! double.pass(Processor::inspect(|args| {
//!   assert_eq!(args.try_get::<i32>(0), Some(&42));
//! }));
//! double.send(21);
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Per-relay configuration.
pub mod config;
/// The "is this a relay" capability.
pub mod endpoint;
/// Processor errors and failure reports.
pub mod error;
mod gate;
/// Payloads and typed argument access.
pub mod payload;
/// Processor functions and their outputs.
pub mod processor;
/// The relay node.
pub mod relay;

pub use config::{FailureHook, GateMode, RelayConfig};
pub use endpoint::Endpoint;
pub use error::{FailureReport, FailureStage, ProcessorError};
pub use payload::{Args, Payload, payload};
pub use processor::{Output, PendingOutput, Processor};
pub use relay::{Relay, RelayId};

#[cfg(test)]
mod gate_test;
