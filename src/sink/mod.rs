//! Sink components.
//!
//! - [`ConnectionGate`]: blocks buffers until a subscriber connects
//! - [`extract()`]: maps a buffer into read-only segments
//! - [`pack_and_send()`]: wraps segments into one payload unit and sends it
//! - [`announce()`]: appends format descriptions to the transport's `CAPS` entry
//! - [`TransportController`]: transport creation, start, stop, and release
//! - [`EdgeSink`]: the element driving all of the above

mod caps;
mod config;
mod element;
mod error;
mod extract;
mod gate;
mod lifecycle;
mod packer;
#[cfg(test)]
mod test_support;

pub use caps::{Caps, accumulate, announce, history};
pub use config::{EdgeSinkBuilder, SinkConfig, WaitPolicy};
pub use element::{Delivery, EdgeSink};
pub use error::*;
pub use extract::{Extraction, Segment, extract};
pub use gate::ConnectionGate;
pub use lifecycle::{ControllerState, TransportController};
pub use packer::{pack, pack_and_send};
