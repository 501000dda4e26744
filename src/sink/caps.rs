//! Format descriptions and their out-of-band announcement.
//!
//! Every format change is appended to the transport's `CAPS` info entry, so
//! subscribers can read the full history of formats seen on the stream.

use std::fmt;

use crate::core::constants::{
    CAPS_DELIMITER, INFO_CAPS, LOG_TARGET, MEDIA_TYPE_TENSOR, MEDIA_TYPE_TENSORS,
};
use crate::transport::EdgeTransport;

/// A format description string, e.g. `other/tensors,num_tensors=2,format=static`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Caps(String);

impl Caps {
    /// Wrap a description string.
    pub fn new(description: impl Into<String>) -> Self {
        Self(description.into())
    }

    /// The full description.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Media type: the text before the first `,`, trimmed.
    pub fn media_type(&self) -> &str {
        self.0.split(',').next().unwrap_or_default().trim()
    }

    /// Whether this describes a tensor stream.
    pub fn is_tensor_stream(&self) -> bool {
        matches!(self.media_type(), MEDIA_TYPE_TENSOR | MEDIA_TYPE_TENSORS)
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Caps {
    fn from(description: &str) -> Self {
        Self::new(description)
    }
}

impl From<String> for Caps {
    fn from(description: String) -> Self {
        Self(description)
    }
}

/// Append `description` to an accumulated history.
pub fn accumulate(previous: &str, description: &str) -> String {
    if previous.is_empty() {
        description.to_owned()
    } else {
        format!("{previous}{CAPS_DELIMITER}{description}")
    }
}

/// Split an accumulated history back into its descriptions.
pub fn history(accumulated: &str) -> Vec<&str> {
    if accumulated.is_empty() {
        return Vec::new();
    }
    accumulated.split(CAPS_DELIMITER).collect()
}

/// Append `caps` to the transport's `CAPS` entry.
///
/// Identical consecutive descriptions are appended again. Returns whether the
/// info write succeeded.
pub fn announce(transport: &mut dyn EdgeTransport, caps: &Caps) -> bool {
    let previous = transport.get_info(INFO_CAPS).unwrap_or_default();
    let updated = accumulate(&previous, caps.as_str());

    match transport.set_info(INFO_CAPS, &updated) {
        Ok(()) => {
            tracing::debug!(target: LOG_TARGET, caps = %caps, "announced caps");
            true
        }
        Err(err) => {
            tracing::warn!(
                target: LOG_TARGET,
                caps = %caps,
                error = %err,
                "failed to announce caps"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ConnectType;
    use crate::transport::mock::MockTransport;

    #[test]
    fn test_media_type() {
        let caps = Caps::new("other/tensors, num_tensors=(int)2, format=static");
        assert_eq!(caps.media_type(), "other/tensors");
        assert!(caps.is_tensor_stream());

        assert!(Caps::from("other/tensor").is_tensor_stream());
        assert!(!Caps::from("video/x-raw,format=RGB").is_tensor_stream());
        assert!(!Caps::default().is_tensor_stream());
    }

    #[test]
    fn test_accumulates_without_dedup() {
        let mut transport = MockTransport::new(ConnectType::Tcp);

        assert!(announce(&mut transport, &Caps::from("A")));
        assert!(announce(&mut transport, &Caps::from("B")));
        assert_eq!(
            transport.get_info(INFO_CAPS).as_deref(),
            Some("A@edge_sink_caps@B")
        );

        assert!(announce(&mut transport, &Caps::from("A")));
        assert_eq!(
            transport.get_info(INFO_CAPS).as_deref(),
            Some("A@edge_sink_caps@B@edge_sink_caps@A")
        );
    }

    #[test]
    fn test_history_roundtrip() {
        let acc = accumulate(&accumulate(&accumulate("", "x"), "y"), "y");
        assert_eq!(history(&acc), vec!["x", "y", "y"]);
        assert!(history("").is_empty());
    }

    #[test]
    fn test_write_failure_reported() {
        let mut transport = MockTransport::new(ConnectType::Tcp);
        transport
            .handle()
            .with(|state| state.fail_info_keys.insert(INFO_CAPS.to_owned()));

        assert!(!announce(&mut transport, &Caps::from("video/x-raw")));
        assert_eq!(transport.get_info(INFO_CAPS), None);
    }
}
