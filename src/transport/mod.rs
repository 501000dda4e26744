//! Edge Transport - pluggable delivery backends.
//!
//! The sink talks to the network only through the [`EdgeTransport`] trait.
//! It provides:
//!
//! - **Info store**: string key/value metadata ([`InfoStore`]) used for
//!   endpoint configuration and format descriptions
//! - **Payload units**: [`EdgeData`], an ordered list of borrowed segments
//! - **Events**: [`EdgeEvent`] delivered through an [`EventCallback`] on the
//!   backend's own threads
//! - **Backend selection**: [`TransportFactory`] with built-in kinds and a
//!   [`CustomRegistry`] for user supplied backends
//! - **TCP backend**: [`TcpPublisher`] on tokio (requires `tcp` feature)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Edge Sink                  │
//! ├─────────────────────────────────────────┤
//! │          EdgeTransport trait            │  ← This module
//! │   info, events, start/stop, send        │
//! ├──────────────┬──────────────────────────┤
//! │ TcpPublisher │ custom backends (registry)│
//! └──────────────┴──────────────────────────┘
//! ```

mod data;
mod error;
mod factory;
mod info;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
#[cfg(feature = "tcp")]
mod tcp;
mod types;

pub use data::*;
pub use error::*;
pub use factory::*;
pub use info::InfoStore;
#[cfg(feature = "tcp")]
pub use tcp::TcpPublisher;
pub use types::*;

/// Handle to an active transport backend.
///
/// A handle is created stopped. The owner pushes configuration through
/// [`set_info`](Self::set_info), registers an event callback, then calls
/// [`start`](Self::start). Releasing consumes the handle, so it can only
/// happen once.
pub trait EdgeTransport: Send {
    /// Kind of backend behind this handle.
    fn connect_type(&self) -> ConnectType;

    /// Set a metadata entry.
    fn set_info(&mut self, key: &str, value: &str) -> EdgeResult<()>;

    /// Read a metadata entry.
    fn get_info(&self, key: &str) -> Option<String>;

    /// Register the event callback, replacing any previous one.
    fn set_event_callback(&mut self, callback: EventCallback);

    /// Start accepting peers.
    fn start(&mut self) -> EdgeResult<()>;

    /// Stop accepting peers and drop existing connections.
    fn stop(&mut self) -> EdgeResult<()>;

    /// Deliver one payload unit to every connected peer.
    fn send(&self, data: &EdgeData<'_>) -> EdgeResult<()>;

    /// Release every resource held by the backend.
    fn release(self: Box<Self>) {}
}
