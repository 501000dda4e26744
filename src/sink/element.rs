//! The publish-side sink element.
//!
//! [`EdgeSink`] ties the components together. The host drives it from one
//! streaming thread:
//!
//! 1. [`start`](EdgeSink::start) creates and starts the transport
//! 2. [`set_caps`](EdgeSink::set_caps) on every format change
//! 3. [`render`](EdgeSink::render) once per buffer
//! 4. [`stop`](EdgeSink::stop), or drop the sink

use std::sync::Arc;

use super::caps::{self, Caps};
use super::config::SinkConfig;
use super::error::{DropReason, LifecycleError, RenderError};
use super::extract::extract;
use super::gate::ConnectionGate;
use super::lifecycle::{ControllerState, TransportController};
use super::packer::pack_and_send;
use crate::core::Buffer;
use crate::core::constants::LOG_TARGET;
use crate::transport::{BuiltinFactory, TransportFactory};

/// Outcome of rendering one buffer.
#[derive(Debug)]
pub enum Delivery {
    /// The payload unit was handed to the transport.
    Sent {
        /// Segments in the payload unit.
        segments: usize,
        /// Total payload bytes.
        bytes: usize,
    },
    /// The buffer was dropped; the stream keeps running.
    Dropped(DropReason),
}

impl Delivery {
    /// Whether the buffer reached the transport.
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent { .. })
    }

    /// Why the buffer was dropped, if it was.
    pub fn drop_reason(&self) -> Option<&DropReason> {
        match self {
            Delivery::Dropped(reason) => Some(reason),
            Delivery::Sent { .. } => None,
        }
    }
}

/// Publish-side endpoint forwarding buffers to an edge transport.
#[derive(Debug)]
pub struct EdgeSink {
    config: SinkConfig,
    gate: Arc<ConnectionGate>,
    controller: TransportController,
    caps: Option<Caps>,
}

impl EdgeSink {
    /// Create a sink using the built-in backends.
    pub fn new(config: SinkConfig) -> Self {
        Self::with_factory(config, Arc::new(BuiltinFactory::new()))
    }

    /// Create a sink that builds its transport with `factory`.
    pub fn with_factory(config: SinkConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            config,
            gate: Arc::new(ConnectionGate::new()),
            controller: TransportController::new(factory),
            caps: None,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Change the configuration.
    ///
    /// Endpoint settings apply from the next [`start`](Self::start); wait
    /// settings apply from the next buffer.
    pub fn update_config(&mut self, update: impl FnOnce(&mut SinkConfig)) {
        update(&mut self.config);
    }

    /// Lifecycle state of the transport.
    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }

    /// Whether a subscriber connection completed since the last start.
    pub fn is_connected(&self) -> bool {
        self.gate.is_connected()
    }

    /// The connection gate shared with the transport callback.
    pub fn gate(&self) -> &Arc<ConnectionGate> {
        &self.gate
    }

    /// Most recent format description.
    pub fn caps(&self) -> Option<&Caps> {
        self.caps.as_ref()
    }

    /// Read an info entry from the running transport.
    pub fn transport_info(&self, key: &str) -> Option<String> {
        self.controller.handle()?.get_info(key)
    }

    /// Create, configure, and start the transport.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        self.gate.reset();
        self.controller.start(&self.config, self.gate.event_callback())
    }

    /// Stop the transport and release it.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        self.controller.stop()
    }

    /// Record a format change and announce it to the transport.
    ///
    /// Returns `false` when no transport is held or the info write failed.
    pub fn set_caps(&mut self, caps: impl Into<Caps>) -> bool {
        let caps = caps.into();
        let announced = match self.controller.handle_mut() {
            Some(handle) => caps::announce(handle, &caps),
            None => {
                tracing::warn!(target: LOG_TARGET, caps = %caps, "caps set before transport start");
                false
            }
        };
        self.caps = Some(caps);
        announced
    }

    /// Forward one buffer to the transport.
    ///
    /// Extraction, packing, and send failures drop the buffer and are
    /// reported as [`Delivery::Dropped`]. A failed connection wait is an
    /// error, but the sink stays running.
    pub fn render(&self, buffer: &dyn Buffer) -> Result<Delivery, RenderError> {
        let handle = self.controller.handle().ok_or(RenderError::NotStarted)?;
        if !self.controller.is_running() {
            return Err(RenderError::NotStarted);
        }

        let policy = self.config.wait_policy();
        if !self.gate.await_policy(policy) {
            return Err(RenderError::NotConnected {
                timeout_ms: policy.connection_timeout_ms,
            });
        }

        let is_tensor_stream = self.caps.as_ref().is_some_and(Caps::is_tensor_stream);
        let segments = match extract(buffer, is_tensor_stream) {
            Ok(extraction) => match extraction.into_result() {
                Ok(segments) => segments,
                Err(err) => return Ok(Delivery::Dropped(err.into())),
            },
            Err(err) => {
                tracing::error!(target: LOG_TARGET, error = %err, "dropping oversized buffer");
                return Ok(Delivery::Dropped(err.into()));
            }
        };

        let bytes: usize = segments.iter().map(|segment| segment.len()).sum();
        match pack_and_send(handle, &segments) {
            Ok(()) => {
                tracing::trace!(
                    target: LOG_TARGET,
                    segments = segments.len(),
                    bytes,
                    "buffer sent"
                );
                Ok(Delivery::Sent {
                    segments: segments.len(),
                    bytes,
                })
            }
            Err(err) => Ok(Delivery::Dropped(err.into())),
        }
    }

    /// Release the transport if one is still held. Safe to call repeatedly.
    pub fn teardown(&mut self) -> bool {
        self.controller.teardown()
    }
}
