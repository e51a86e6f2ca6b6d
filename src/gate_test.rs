//! # Gate Test Suite
//!
//! Buffering and chunking rules of both gate modes, independent of relays'
//! dispatch.

use crate::config::GateMode;
use crate::gate::{Gate, least_occupied};
use crate::payload::{Payload, payload};
use crate::relay::{Relay, RelayId};

fn ids(n: usize) -> Vec<RelayId> {
  (0..n).map(|_| Relay::default().id()).collect()
}

fn ints(values: &[i32]) -> Vec<Payload> {
  values.iter().map(|v| payload(*v)).collect()
}

/// Pushes one delivery and collects what the gate releases, the way a relay
/// drains it.
fn admit(
  gate: &mut Gate,
  inputs: &[RelayId],
  source: Option<RelayId>,
  values: Vec<Payload>,
) -> Vec<Vec<Payload>> {
  if let Some(chunk) = gate.push(inputs, source, values) {
    return vec![chunk];
  }
  std::iter::from_fn(|| gate.next_chunk(inputs)).collect()
}

fn unwrap_chunks(chunks: Vec<Vec<Payload>>) -> Vec<Vec<i32>> {
  chunks
    .into_iter()
    .map(|chunk| {
      chunk
        .iter()
        .map(|v| *v.downcast_ref::<i32>().unwrap())
        .collect()
    })
    .collect()
}

// ============================================================================
// Arity mode
// ============================================================================

#[test]
fn test_no_inputs_releases_every_delivery_unbuffered() {
  let mut gate = Gate::new(GateMode::Arity);
  let chunks = admit(&mut gate, &[], None, ints(&[1, 2, 3]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 2, 3]]);
  assert_eq!(gate.buffered(), 0);
}

#[test]
fn test_no_inputs_releases_empty_delivery() {
  let mut gate = Gate::new(GateMode::Arity);
  let chunks = admit(&mut gate, &[], None, Vec::new());
  assert_eq!(chunks.len(), 1);
  assert!(chunks[0].is_empty());
}

#[test]
fn test_arity_carries_remainder() {
  let inputs = ids(2);
  let mut gate = Gate::new(GateMode::Arity);

  assert!(admit(&mut gate, &inputs, None, ints(&[1])).is_empty());
  assert_eq!(gate.buffered(), 1);

  let chunks = admit(&mut gate, &inputs, None, ints(&[2, 3]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 2]]);
  assert_eq!(gate.buffered(), 1);

  let chunks = admit(&mut gate, &inputs, None, ints(&[4]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![3, 4]]);
  assert_eq!(gate.buffered(), 0);
}

#[test]
fn test_arity_drains_every_full_chunk() {
  let inputs = ids(2);
  let mut gate = Gate::new(GateMode::Arity);
  let chunks = admit(&mut gate, &inputs, None, ints(&[1, 2, 3, 4, 5]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 2], vec![3, 4]]);
  assert_eq!(gate.buffered(), 1);
}

#[test]
fn test_next_chunk_releases_one_chunk_at_a_time() {
  let inputs = ids(2);
  let mut gate = Gate::new(GateMode::Arity);
  assert!(gate.push(&inputs, None, ints(&[1, 2, 3, 4])).is_none());

  let first = gate.next_chunk(&inputs).unwrap();
  assert_eq!(unwrap_chunks(vec![first]), vec![vec![1, 2]]);
  assert_eq!(gate.buffered(), 2);

  let second = gate.next_chunk(&inputs).unwrap();
  assert_eq!(unwrap_chunks(vec![second]), vec![vec![3, 4]]);
  assert!(!gate.is_ready(&inputs));
  assert!(gate.next_chunk(&inputs).is_none());
}

#[test]
fn test_next_chunk_without_inputs_is_empty() {
  let mut gate = Gate::new(GateMode::Tagged);
  assert!(gate.next_chunk(&[]).is_none());
}

#[test]
fn test_arity_ignores_source() {
  let inputs = ids(2);
  let mut gate = Gate::new(GateMode::Arity);
  admit(&mut gate, &inputs, Some(inputs[0]), ints(&[1]));
  let chunks = admit(&mut gate, &inputs, Some(inputs[0]), ints(&[2]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 2]]);
}

// ============================================================================
// Tagged mode
// ============================================================================

#[test]
fn test_tagged_waits_for_every_edge() {
  let inputs = ids(2);
  let mut gate = Gate::new(GateMode::Tagged);

  assert!(admit(&mut gate, &inputs, Some(inputs[0]), ints(&[1])).is_empty());
  assert!(admit(&mut gate, &inputs, Some(inputs[0]), ints(&[2])).is_empty());
  assert_eq!(gate.buffered(), 2);

  let chunks = admit(&mut gate, &inputs, Some(inputs[1]), ints(&[10]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 10]]);

  let chunks = admit(&mut gate, &inputs, Some(inputs[1]), ints(&[20]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![2, 20]]);
  assert_eq!(gate.buffered(), 0);
}

#[test]
fn test_tagged_orders_arguments_by_edge() {
  let inputs = ids(2);
  let mut gate = Gate::new(GateMode::Tagged);
  admit(&mut gate, &inputs, Some(inputs[1]), ints(&[2]));
  let chunks = admit(&mut gate, &inputs, Some(inputs[0]), ints(&[1]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 2]]);
}

#[test]
fn test_tagged_untagged_values_fill_least_occupied_slot() {
  let inputs = ids(3);
  let mut gate = Gate::new(GateMode::Tagged);
  admit(&mut gate, &inputs, Some(inputs[0]), ints(&[1]));
  let chunks = admit(&mut gate, &inputs, None, ints(&[2, 3]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 2, 3]]);
}

#[test]
fn test_tagged_unknown_source_is_untagged() {
  let inputs = ids(2);
  let stranger = Relay::default().id();
  let mut gate = Gate::new(GateMode::Tagged);
  let chunks = admit(&mut gate, &inputs, Some(stranger), ints(&[1, 2]));
  assert_eq!(unwrap_chunks(chunks), vec![vec![1, 2]]);
}

#[test]
fn test_tagged_discard_drops_queued_values() {
  let inputs = ids(2);
  let mut gate = Gate::new(GateMode::Tagged);
  admit(&mut gate, &inputs, Some(inputs[0]), ints(&[1, 2]));
  gate.discard(inputs[0]);
  assert_eq!(gate.buffered(), 0);
}

#[test]
fn test_least_occupied_prefers_earliest_edge_on_ties() {
  let inputs = ids(3);
  let mut gate = Gate::new(GateMode::Tagged);
  gate.push(&inputs, Some(inputs[0]), ints(&[1]));
  let Gate::Tagged(slots) = &gate else {
    panic!("tagged gate expected");
  };
  assert_eq!(least_occupied(slots, &inputs), Some(inputs[1]));
}

#[test]
fn test_least_occupied_without_inputs_is_none() {
  let Gate::Tagged(slots) = Gate::new(GateMode::Tagged) else {
    panic!("tagged gate expected");
  };
  assert_eq!(least_occupied(&slots, &[]), None);
}
