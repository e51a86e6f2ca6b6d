//! # AND gate
//!
//! Two input relays validate booleans and feed a two-input gate; a reporter
//! relay prints every result. Runs the full truth table.
//!
//! ```text
//! cargo run --example and_gate
//! RUST_LOG=relay=trace cargo run --example and_gate
//! ```

use relay::{Processor, ProcessorError, Relay};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let gate = Relay::new(Processor::sync(|args| {
    Ok::<_, ProcessorError>(*args.get::<bool>(0)? && *args.get::<bool>(1)?)
  }));
  let validate = || {
    Relay::new(Processor::sync(|args| {
      Ok::<_, ProcessorError>(args.try_get::<bool>(0).copied().unwrap_or(false))
    }))
  };
  let input_a = validate();
  let input_b = validate();

  input_a.connect_to(&gate);
  input_b.connect_to(&gate);

  gate.pass(Processor::inspect(|args| {
    if let Some(result) = args.try_get::<bool>(0) {
      println!("The result is {}", result);
    }
  }));

  for (a, b) in [(true, true), (true, false), (false, true), (false, false)] {
    input_a.send(a);
    input_b.send(b);
  }
}
