//! The "is this a relay" capability.
//!
//! Connectivity operations accept anything implementing [`Endpoint`]. Values
//! that are not relays (an empty `Option`, a payload carrying something else)
//! make predicates return `false` and mutators do nothing. Because a [`Payload`]
//! is an endpoint, a relay can travel through the graph as a value and be wired
//! by whoever receives it.

use crate::payload::Payload;
use crate::relay::Relay;
use std::any::Any;

/// Something that may resolve to a relay.
pub trait Endpoint {
  /// The relay behind this value, if there is one.
  fn as_relay(&self) -> Option<&Relay>;
}

impl Endpoint for Relay {
  fn as_relay(&self) -> Option<&Relay> {
    Some(self)
  }
}

impl Endpoint for Option<Relay> {
  fn as_relay(&self) -> Option<&Relay> {
    self.as_ref()
  }
}

impl Endpoint for dyn Any + Send + Sync {
  fn as_relay(&self) -> Option<&Relay> {
    self.downcast_ref::<Relay>()
  }
}

impl Endpoint for Payload {
  fn as_relay(&self) -> Option<&Relay> {
    (**self).downcast_ref::<Relay>()
  }
}

impl<E: Endpoint + ?Sized> Endpoint for &E {
  fn as_relay(&self) -> Option<&Relay> {
    (**self).as_relay()
  }
}
