//! # Byte multiplexer
//!
//! Two byte inputs and a boolean selector. Each input has a filter relay that
//! also listens to the selector; a filter passes its byte on only when the
//! selector matches its key, so exactly one byte is reported per round.
//!
//! ```text
//! cargo run --example byte_multiplexer
//! ```

use relay::{Args, Processor, ProcessorError, Relay};
use tracing_subscriber::EnvFilter;

/// Forwards `Some(byte)` for integers in `0..=255`, `None` otherwise.
fn byte_input() -> Relay {
  Relay::new(Processor::sync(|args| {
    let byte = args
      .try_get::<i64>(0)
      .and_then(|value| u8::try_from(*value).ok());
    Ok::<_, ProcessorError>(byte)
  }))
}

/// The byte of the chunk if the selector in it equals `key`. Selector and byte
/// may sit in either position, since the arity gate does not track origin.
fn select(args: &Args, key: bool) -> Option<u8> {
  let pick = |selector: usize, byte: usize| match (
    args.try_get::<bool>(selector),
    args.try_get::<Option<u8>>(byte),
  ) {
    (Some(selected), Some(byte)) if *selected == key => *byte,
    _ => None,
  };
  pick(0, 1).or_else(|| pick(1, 0))
}

fn filter(key: bool) -> Relay {
  Relay::new(Processor::sync(move |args| {
    Ok::<_, ProcessorError>(select(&args, key))
  }))
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let input_a = byte_input();
  let input_b = byte_input();
  let selector = Relay::new(Processor::sync(|args| {
    Ok::<_, ProcessorError>(args.try_get::<bool>(0).copied().unwrap_or(false))
  }));
  let filter_a = filter(true);
  let filter_b = filter(false);

  input_a.connect_to(&filter_a);
  input_b.connect_to(&filter_b);
  selector.connect_to(&filter_a).connect_to(&filter_b);

  let report = Processor::inspect(|args| {
    if let Some(Some(byte)) = args.try_get::<Option<u8>>(0) {
      println!("Input selected: {}", byte);
    }
  });
  filter_a.pass(report.clone());
  filter_b.pass(report);

  for select_a in [true, false] {
    selector.send(select_a);
    input_a.send(127i64);
    input_b.send(255i64);
  }
}
