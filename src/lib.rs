//! # Edge Sink
//!
//! Publish-side endpoint of a media/tensor pipeline. An [`EdgeSink`] receives
//! multi-part buffers one at a time and forwards each as a single payload
//! unit to a pluggable edge transport. It provides:
//!
//! - **Connection gating**: optionally hold buffers until a subscriber connects
//! - **Zero-copy forwarding**: segments are mapped read-only and borrowed by
//!   the payload unit, never copied
//! - **Format announcement**: every format change is appended to the
//!   transport's `CAPS` info entry
//! - **Backend selection**: built-in TCP backend, or custom backends registered
//!   by library path
//!
//! ## Feature Flags
//!
//! - `tcp` (default): built-in TCP publish backend on tokio
//! - `logging` (default): [`logging::init`] backed by `tracing-subscriber`
//! - `test-util`: recording mock transport under `transport::mock`
//!
//! ## Modules
//!
//! - [`core`]: constants, error types, memory and buffer model (always included)
//! - [`transport`]: edge transport trait, payload units, backends
//! - [`sink`]: gate, extractor, packer, caps announcer, lifecycle, element
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use edge_sink::prelude::*;
//!
//! let config = EdgeSinkBuilder::new()
//!     .host("0.0.0.0")
//!     .wait_connection(true)
//!     .connection_timeout(Duration::from_millis(500))
//!     .build();
//!
//! let mut sink = EdgeSink::new(config);
//! sink.start()?;
//! sink.set_caps("other/tensors,num_tensors=2,format=static");
//!
//! let buffer = EdgeBuffer::with_packed_tensors(vec![0u8; 12], &[4, 8])?;
//! match sink.render(&buffer) {
//!     Ok(Delivery::Sent { bytes, .. }) => println!("sent {bytes} bytes"),
//!     Ok(Delivery::Dropped(reason)) => eprintln!("dropped: {reason}"),
//!     Err(err) => eprintln!("not delivered: {err}"),
//! }
//!
//! sink.stop()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport interface and backends
pub mod transport;

// Sink components
pub mod sink;

// Log output (feature-gated)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    // Transport types
    pub use crate::transport::{
        BuiltinFactory, ConnectType, CustomRegistry, EdgeData, EdgeError, EdgeEvent,
        EdgeResult, EdgeTransport, EventCallback, NodeType, TransportFactory,
    };

    #[cfg(feature = "tcp")]
    pub use crate::transport::TcpPublisher;

    // Sink types
    pub use crate::sink::{
        Caps, ConnectionGate, ControllerState, Delivery, DropReason, EdgeSink, EdgeSinkBuilder,
        LifecycleError, RenderError, SinkConfig, WaitPolicy,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{Buffer, ConfigError, EdgeBuffer, MapError, Memory};
pub use sink::{Delivery, EdgeSink, EdgeSinkBuilder, SinkConfig};
pub use transport::{ConnectType, EdgeError, EdgeTransport};
