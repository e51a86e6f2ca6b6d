//! # Input Gate
//!
//! Buffers received values and releases them as chunks sized to the number of
//! input edges. The gate only sees edge identities and counts; it never holds
//! relay handles.
//!
//! ## Arity Mode
//!
//! Values from every sender share one FIFO. With `n` input edges, each chunk is
//! the first `n` buffered values:
//!
//! ```text
//! arity 2   receive(1)     pending [1]
//!           receive(2, 3)  pending [1, 2, 3] -> chunk (1, 2), pending [3]
//! ```
//!
//! ## Tagged Mode
//!
//! Each input edge owns a FIFO slot. A chunk takes the head of every slot, in
//! input-edge order, once all slots are non-empty.
//!
//! In both modes a relay without input edges gets every delivery back as one
//! chunk, unbuffered.

use crate::config::GateMode;
use crate::payload::Payload;
use crate::relay::RelayId;
use std::collections::{HashMap, VecDeque};
use tracing::trace;

#[derive(Debug)]
pub(crate) enum Gate {
  Arity(VecDeque<Payload>),
  Tagged(HashMap<RelayId, VecDeque<Payload>>),
}

impl Gate {
  pub(crate) fn new(mode: GateMode) -> Self {
    match mode {
      GateMode::Arity => Self::Arity(VecDeque::new()),
      GateMode::Tagged => Self::Tagged(HashMap::new()),
    }
  }

  /// Buffers `values`. A relay without input edges does not buffer: the
  /// values come straight back as its chunk. `inputs` is the current
  /// input-edge list, `source` the upstream relay that sent the values, if
  /// known.
  pub(crate) fn push(
    &mut self,
    inputs: &[RelayId],
    source: Option<RelayId>,
    values: Vec<Payload>,
  ) -> Option<Vec<Payload>> {
    if inputs.is_empty() {
      return Some(values);
    }
    match self {
      Self::Arity(pending) => pending.extend(values),
      Self::Tagged(slots) => {
        let tagged = source.filter(|id| inputs.contains(id));
        for value in values {
          let Some(slot) = tagged.or_else(|| least_occupied(slots, inputs)) else {
            continue;
          };
          slots.entry(slot).or_default().push_back(value);
        }
      }
    }
    trace!(arity = inputs.len(), buffered = self.buffered(), "gate");
    None
  }

  /// Removes the oldest complete chunk, if there is one. Chunks are released
  /// one at a time so that each is fanned out before the next is taken.
  pub(crate) fn next_chunk(&mut self, inputs: &[RelayId]) -> Option<Vec<Payload>> {
    if !self.is_ready(inputs) {
      return None;
    }
    let chunk = match self {
      Self::Arity(pending) => pending.drain(..inputs.len()).collect(),
      Self::Tagged(slots) => inputs
        .iter()
        .filter_map(|id| slots.get_mut(id).and_then(VecDeque::pop_front))
        .collect(),
    };
    Some(chunk)
  }

  /// Whether a complete chunk is buffered.
  pub(crate) fn is_ready(&self, inputs: &[RelayId]) -> bool {
    if inputs.is_empty() {
      return false;
    }
    match self {
      Self::Arity(pending) => pending.len() >= inputs.len(),
      Self::Tagged(slots) => inputs
        .iter()
        .all(|id| slots.get(id).is_some_and(|queue| !queue.is_empty())),
    }
  }

  /// Drops whatever the given input edge had queued. Arity mode does not
  /// track origin, so there is nothing to drop.
  pub(crate) fn discard(&mut self, source: RelayId) {
    if let Self::Tagged(slots) = self {
      slots.remove(&source);
    }
  }

  /// Number of values waiting for a chunk.
  pub(crate) fn buffered(&self) -> usize {
    match self {
      Self::Arity(pending) => pending.len(),
      Self::Tagged(slots) => slots.values().map(VecDeque::len).sum(),
    }
  }
}

/// The input slot with the fewest queued values, earliest edge on ties.
/// `None` only when there are no input edges.
pub(crate) fn least_occupied(
  slots: &HashMap<RelayId, VecDeque<Payload>>,
  inputs: &[RelayId],
) -> Option<RelayId> {
  let occupancy = |id: &RelayId| slots.get(id).map_or(0, VecDeque::len);
  // min_by_key keeps the first of equal keys
  inputs.iter().copied().min_by_key(|id| occupancy(id))
}
