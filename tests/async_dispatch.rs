//! Relays whose processors return futures.

use relay::{FailureStage, Output, Processor, ProcessorError, Relay, RelayConfig, payload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Relay forwarding every `i32` it receives into a channel.
fn channel_sink() -> (Relay, mpsc::UnboundedReceiver<i32>) {
  let (tx, rx) = mpsc::unbounded_channel();
  let relay = Relay::new(Processor::inspect(move |args| {
    if let Some(value) = args.try_get::<i32>(0) {
      let _ = tx.send(*value);
    }
  }));
  (relay, rx)
}

fn failure_channel() -> (RelayConfig, mpsc::UnboundedReceiver<(FailureStage, String)>) {
  let (tx, rx) = mpsc::unbounded_channel();
  let config = RelayConfig::new().with_failure_hook(move |report| {
    let _ = tx.send((report.stage, report.error.to_string()));
  });
  (config, rx)
}

#[tokio::test]
async fn test_pending_output_fans_out_after_resolution() {
  let release = Arc::new(Notify::new());
  let gate = release.clone();
  let doubler = Relay::new(Processor::future(move |args| {
    let gate = gate.clone();
    async move {
      let value = *args.get::<i32>(0)?;
      gate.notified().await;
      Ok::<_, ProcessorError>(value * 2)
    }
  }));
  let (sink, mut rx) = channel_sink();
  doubler.connect_to(&sink);

  doubler.send(21i32);
  tokio::task::yield_now().await;
  assert!(rx.try_recv().is_err());

  release.notify_one();
  assert_eq!(rx.recv().await, Some(42));
}

#[tokio::test]
async fn test_resolved_value_is_delivered_verbatim() {
  let shared = payload(String::from("shared"));
  let expected = shared.clone();
  let source = Relay::new(Processor::new(move |_| {
    let value = shared.clone();
    Ok(Output::pending(async move { Ok(value) }))
  }));
  let (tx, mut rx) = mpsc::unbounded_channel();
  source.pass(Processor::inspect(move |args| {
    if let Some(value) = args.raw(0) {
      let _ = tx.send(value.clone());
    }
  }));

  source.send(());
  let received = rx.recv().await.unwrap();
  assert!(Arc::ptr_eq(&received, &expected));
}

#[tokio::test]
async fn test_overlapping_dispatches_complete_in_any_order() {
  let sleeper = Relay::new(Processor::future(|args| async move {
    let millis = *args.get::<i32>(0)?;
    tokio::time::sleep(Duration::from_millis(millis as u64)).await;
    Ok::<_, ProcessorError>(millis)
  }));
  let (sink, mut rx) = channel_sink();
  sleeper.connect_to(&sink);

  sleeper.send(200i32).send(1i32);
  assert_eq!(rx.recv().await, Some(1));
  assert_eq!(rx.recv().await, Some(200));
}

#[tokio::test]
async fn test_rejected_output_is_absorbed_and_reported() {
  let (config, mut failures) = failure_channel();
  let checker = Relay::with_config(
    Processor::future(|args| async move {
      let value = *args.get::<i32>(0)?;
      if value < 0 {
        return Err(ProcessorError::failed("negative"));
      }
      Ok::<_, ProcessorError>(value)
    }),
    config,
  );
  let (sink, mut rx) = channel_sink();
  checker.connect_to(&sink);

  checker.send(-1i32);
  let (stage, error) = failures.recv().await.unwrap();
  assert_eq!(stage, FailureStage::Resolve);
  assert_eq!(error, "processor failed: negative");

  checker.send(7i32);
  assert_eq!(rx.recv().await, Some(7));
  assert!(failures.try_recv().is_err());
}

async fn explode() -> Result<relay::Payload, ProcessorError> {
  panic!("async oops")
}

#[tokio::test]
async fn test_panicking_future_is_absorbed() {
  let (config, mut failures) = failure_channel();
  let faulty = Relay::with_config(
    Processor::new(|_| Ok(Output::pending(explode()))),
    config,
  );
  let (sink, mut rx) = channel_sink();
  faulty.connect_to(&sink);

  faulty.send(());
  let (stage, error) = failures.recv().await.unwrap();
  assert_eq!(stage, FailureStage::Resolve);
  assert!(error.contains("async oops"));
  assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_async_inputs_feed_a_sync_gate() {
  let delayed = || {
    Relay::new(Processor::future(|args| async move {
      tokio::time::sleep(Duration::from_millis(5)).await;
      Ok::<_, ProcessorError>(*args.get::<i32>(0)?)
    }))
  };
  let left = delayed();
  let right = delayed();
  let sum = Relay::new(Processor::sync(|args| {
    Ok::<_, ProcessorError>(args.get::<i32>(0)? + args.get::<i32>(1)?)
  }));
  left.connect_to(&sum);
  right.connect_to(&sum);
  let (sink, mut rx) = channel_sink();
  sum.connect_to(&sink);

  left.send(2i32);
  right.send(3i32);
  assert_eq!(rx.recv().await, Some(5));
}

#[test]
fn test_configured_runtime_drives_pending_outputs() {
  let runtime = tokio::runtime::Runtime::new().unwrap();
  let (tx, rx) = std::sync::mpsc::channel();
  let source = Relay::with_config(
    Processor::future(|args| async move { Ok::<_, ProcessorError>(*args.get::<i32>(0)? + 1) }),
    RelayConfig::new().with_runtime(runtime.handle().clone()),
  );
  source.pass(Processor::inspect(move |args| {
    if let Some(value) = args.try_get::<i32>(0) {
      let _ = tx.send(*value);
    }
  }));

  source.send(41i32);
  assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(42));
}

#[test]
fn test_ambient_runtime_from_block_on() {
  let source = Relay::new(Processor::future(|args| async move {
    tokio::task::yield_now().await;
    Ok::<_, ProcessorError>(args.len() as i32)
  }));
  let (sink, mut rx) = channel_sink();
  source.connect_to(&sink);

  let received = tokio_test::block_on(async move {
    source.receive([payload(1i32), payload(2i32), payload(3i32)]);
    rx.recv().await
  });
  assert_eq!(received, Some(3));
}
