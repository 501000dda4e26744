//! Fixed values shared with the rest of the streaming pipeline.
//!
//! These values are part of the contract with subscribers and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// LOGGING
// =============================================================================

/// Target used by every `tracing` event emitted by this crate.
pub const LOG_TARGET: &str = "edge_sink";

/// Environment variable consulted by [`crate::logging::init`].
pub const LOG_ENV: &str = "EDGE_SINK_LOG";

// =============================================================================
// SEGMENT LIMITS
// =============================================================================

/// Maximum number of segments in one buffer and in one payload unit.
pub const TENSOR_SIZE_LIMIT: usize = 256;

// =============================================================================
// TRANSPORT INFO KEYS
// =============================================================================

/// Self host address the publisher accepts connections on.
pub const INFO_HOST: &str = "HOST";

/// Self port (decimal string). Backends write the bound port back here.
pub const INFO_PORT: &str = "PORT";

/// Broker host for broker-style transports.
pub const INFO_DEST_HOST: &str = "DEST_HOST";

/// Broker port for broker-style transports (decimal string).
pub const INFO_DEST_PORT: &str = "DEST_PORT";

/// Publish topic.
pub const INFO_TOPIC: &str = "TOPIC";

/// Accumulated format descriptions.
pub const INFO_CAPS: &str = "CAPS";

/// Token joining consecutive format descriptions under [`INFO_CAPS`].
pub const CAPS_DELIMITER: &str = "@edge_sink_caps@";

// =============================================================================
// FORMAT DESCRIPTIONS
// =============================================================================

/// Media type of a single-tensor stream.
pub const MEDIA_TYPE_TENSOR: &str = "other/tensor";

/// Media type of a multi-tensor stream.
pub const MEDIA_TYPE_TENSORS: &str = "other/tensors";

// =============================================================================
// CONFIGURATION DEFAULTS
// =============================================================================

/// Default self host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default self port (0 = let the backend pick one).
pub const DEFAULT_PORT: u16 = 0;

/// Default broker host.
pub const DEFAULT_DEST_HOST: &str = "127.0.0.1";

/// Default broker port.
pub const DEFAULT_DEST_PORT: u16 = 1883;

/// Default connection timeout in milliseconds (0 = wait forever).
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 0;

// =============================================================================
// TCP BACKEND
// =============================================================================

/// Worker threads of the TCP backend runtime.
pub const TCP_WORKER_THREADS: usize = 2;

/// Upper bound on one subscriber write before it is considered lost.
pub const TCP_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
