//! Transport lifecycle.
//!
//! Owns the transport handle from creation to release:
//!
//! ```text
//! Idle ──start──▶ Starting ──ok──▶ Running ──stop──▶ Stopping ──▶ Idle
//!                    │
//!                    └──setup failure──▶ Idle
//! ```
//!
//! The handle is released exactly once: by `stop`, by a later `start` that
//! finds a handle left over from a failed start command, or by teardown.

use std::fmt;
use std::sync::Arc;

use super::config::SinkConfig;
use super::error::LifecycleError;
use crate::core::ConfigError;
use crate::core::constants::{
    INFO_DEST_HOST, INFO_DEST_PORT, INFO_HOST, INFO_PORT, INFO_TOPIC, LOG_TARGET,
};
use crate::transport::{
    ConnectType, EdgeTransport, EventCallback, NodeType, TransportFactory,
};

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No running transport.
    Idle,
    /// Creating and configuring a handle.
    Starting,
    /// Transport started.
    Running,
    /// Stop command in progress.
    Stopping,
}

/// Selects, configures, starts, stops, and releases the transport.
pub struct TransportController {
    factory: Arc<dyn TransportFactory>,
    handle: Option<Box<dyn EdgeTransport>>,
    state: ControllerState,
}

impl TransportController {
    /// Create an idle controller that builds handles with `factory`.
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            handle: None,
            state: ControllerState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Whether the transport is running.
    pub fn is_running(&self) -> bool {
        self.state == ControllerState::Running
    }

    /// Whether a handle is currently held.
    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// The held handle.
    pub fn handle(&self) -> Option<&dyn EdgeTransport> {
        self.handle.as_deref()
    }

    /// The held handle, mutably.
    pub fn handle_mut(&mut self) -> Option<&mut (dyn EdgeTransport + 'static)> {
        self.handle.as_deref_mut()
    }

    /// Create, configure, and start a transport for `config`.
    ///
    /// On a failed start command the handle stays held so it can be released
    /// later; every other failure leaves no handle behind.
    pub fn start(
        &mut self,
        config: &SinkConfig,
        callback: EventCallback,
    ) -> Result<(), LifecycleError> {
        if self.state != ControllerState::Idle {
            return Err(LifecycleError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        // Left over from a start whose start command failed.
        self.teardown();
        self.state = ControllerState::Starting;

        let mut handle = match self.create_handle(config) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(target: LOG_TARGET, error = %err, "failed to get edge handle");
                self.state = ControllerState::Idle;
                return Err(err);
            }
        };

        push_endpoint_info(handle.as_mut(), config);
        handle.set_event_callback(callback);

        let started = handle.start();
        self.handle = Some(handle);
        if let Err(source) = started {
            tracing::error!(
                target: LOG_TARGET,
                host = %config.host,
                port = config.port,
                error = %source,
                "failed to start edge transport, check host and port"
            );
            self.state = ControllerState::Idle;
            return Err(LifecycleError::Start(source));
        }

        tracing::info!(
            target: LOG_TARGET,
            connect_type = %config.connect_type,
            host = %config.host,
            port = config.port,
            "edge transport started"
        );
        self.state = ControllerState::Running;
        Ok(())
    }

    /// Stop the transport and release its handle.
    ///
    /// The handle is released even when the stop command fails.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        if self.state != ControllerState::Running {
            if self.state == ControllerState::Idle {
                self.teardown();
                return Ok(());
            }
            return Err(LifecycleError::InvalidState {
                operation: "stop",
                state: self.state,
            });
        }

        self.state = ControllerState::Stopping;
        let stopped = match self.handle.as_mut() {
            Some(handle) => handle.stop(),
            None => Ok(()),
        };
        self.teardown();

        stopped.map_err(|source| {
            tracing::error!(target: LOG_TARGET, error = %source, "failed to stop edge transport");
            LifecycleError::Stop(source)
        })
    }

    /// Release the handle if one is held. Returns whether one was released.
    ///
    /// Calling this again is a no-op.
    pub fn teardown(&mut self) -> bool {
        self.state = ControllerState::Idle;
        match self.handle.take() {
            Some(handle) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    connect_type = %handle.connect_type(),
                    "releasing edge handle"
                );
                handle.release();
                true
            }
            None => false,
        }
    }

    fn create_handle(&self, config: &SinkConfig) -> Result<Box<dyn EdgeTransport>, LifecycleError> {
        config.validate()?;

        let kind = config.connect_type;
        let created = if kind == ConnectType::Custom {
            let path = config
                .custom_lib_path()
                .ok_or(ConfigError::MissingCustomLibrary)?;
            self.factory.create_custom(path, NodeType::Pub)
        } else {
            self.factory.create(kind, NodeType::Pub)
        };
        created.map_err(|source| LifecycleError::Create { kind, source })
    }
}

impl Drop for TransportController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for TransportController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportController")
            .field("state", &self.state)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

/// Push non-empty endpoint settings into the transport's info store.
fn push_endpoint_info(handle: &mut dyn EdgeTransport, config: &SinkConfig) {
    let mut entries: Vec<(&str, String)> = Vec::with_capacity(5);
    if !config.host.is_empty() {
        entries.push((INFO_HOST, config.host.clone()));
    }
    if config.port > 0 {
        entries.push((INFO_PORT, config.port.to_string()));
    }
    if !config.dest_host.is_empty() {
        entries.push((INFO_DEST_HOST, config.dest_host.clone()));
    }
    if config.dest_port > 0 {
        entries.push((INFO_DEST_PORT, config.dest_port.to_string()));
    }
    if let Some(topic) = config.topic() {
        entries.push((INFO_TOPIC, topic.to_owned()));
    }

    for (key, value) in entries {
        if let Err(err) = handle.set_info(key, &value) {
            tracing::warn!(target: LOG_TARGET, key, error = %err, "failed to set transport info");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::config::EdgeSinkBuilder;
    use crate::transport::mock::{MockFactory, MockHandle};
    use crate::transport::{EdgeError, EdgeEvent};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn controller() -> (TransportController, MockHandle) {
        let factory = MockFactory::new();
        let handle = factory.handle();
        (TransportController::new(Arc::new(factory)), handle)
    }

    fn noop_callback() -> EventCallback {
        Arc::new(|_event: &EdgeEvent| Ok(()))
    }

    #[test]
    fn test_start_pushes_endpoint_info() {
        let (mut ctl, mock) = controller();
        let config = EdgeSinkBuilder::new()
            .host("0.0.0.0")
            .port(4000)
            .topic("camera")
            .build();

        ctl.start(&config, noop_callback()).unwrap();
        assert_eq!(ctl.state(), ControllerState::Running);

        assert_eq!(mock.info(INFO_HOST).as_deref(), Some("0.0.0.0"));
        assert_eq!(mock.info(INFO_PORT).as_deref(), Some("4000"));
        assert_eq!(mock.info(INFO_DEST_HOST).as_deref(), Some("127.0.0.1"));
        assert_eq!(mock.info(INFO_DEST_PORT).as_deref(), Some("1883"));
        assert_eq!(mock.info(INFO_TOPIC).as_deref(), Some("camera"));
        assert_eq!(mock.with(|s| s.starts), 1);
    }

    #[test]
    fn test_zero_and_empty_values_not_pushed() {
        let (mut ctl, mock) = controller();
        let config = EdgeSinkBuilder::new().port(0).dest_port(0).topic("").build();

        ctl.start(&config, noop_callback()).unwrap();
        assert_eq!(mock.info(INFO_PORT), None);
        assert_eq!(mock.info(INFO_DEST_PORT), None);
        assert_eq!(mock.info(INFO_TOPIC), None);
    }

    #[test]
    fn test_callback_registered_before_start() {
        let (mut ctl, mock) = controller();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let callback: EventCallback = Arc::new(move |event: &EdgeEvent| {
            if *event == EdgeEvent::ConnectionCompleted {
                flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        });

        ctl.start(&SinkConfig::default(), callback).unwrap();
        mock.emit(EdgeEvent::ConnectionCompleted).unwrap().unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_custom_without_library_creates_nothing() {
        let (mut ctl, mock) = controller();
        let config = EdgeSinkBuilder::new()
            .connect_type(ConnectType::Custom)
            .build();

        let err = ctl.start(&config, noop_callback()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Config(ConfigError::MissingCustomLibrary)
        ));
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert!(!ctl.has_handle());
        assert_eq!(mock.with(|s| s.created), 0);
    }

    #[test]
    fn test_custom_resolved_by_path() {
        let (mut ctl, mock) = controller();
        let config = EdgeSinkBuilder::new()
            .connect_type(ConnectType::Custom)
            .custom_lib("/opt/edge/libcustom.so")
            .build();

        ctl.start(&config, noop_callback()).unwrap();
        assert_eq!(ctl.handle().unwrap().connect_type(), ConnectType::Custom);
        assert_eq!(
            mock.with(|s| s.custom_paths.clone()),
            vec![std::path::PathBuf::from("/opt/edge/libcustom.so")]
        );
    }

    #[test]
    fn test_create_failure_holds_no_handle() {
        let (mut ctl, mock) = controller();
        mock.with(|s| s.fail_create = true);

        let err = ctl.start(&SinkConfig::default(), noop_callback()).unwrap_err();
        assert!(err.is_setup_error());
        assert!(!ctl.has_handle());
        assert_eq!(mock.releases(), 0);
    }

    #[test]
    fn test_start_command_failure_keeps_handle_for_release() {
        let (mut ctl, mock) = controller();
        mock.with(|s| s.fail_start = true);

        let err = ctl.start(&SinkConfig::default(), noop_callback()).unwrap_err();
        assert!(matches!(err, LifecycleError::Start(EdgeError::ConnectionFailure(_))));
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert!(ctl.has_handle());

        assert!(ctl.teardown());
        assert_eq!(mock.releases(), 1);
    }

    #[test]
    fn test_restart_releases_stale_handle() {
        let (mut ctl, mock) = controller();
        mock.with(|s| s.fail_start = true);
        assert!(ctl.start(&SinkConfig::default(), noop_callback()).is_err());

        mock.with(|s| s.fail_start = false);
        ctl.start(&SinkConfig::default(), noop_callback()).unwrap();
        assert_eq!(mock.releases(), 1);
        assert_eq!(mock.with(|s| s.created), 2);
    }

    #[test]
    fn test_stop_releases_even_on_failure() {
        let (mut ctl, mock) = controller();
        ctl.start(&SinkConfig::default(), noop_callback()).unwrap();
        mock.with(|s| s.fail_stop = true);

        let err = ctl.stop().unwrap_err();
        assert!(matches!(err, LifecycleError::Stop(_)));
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert!(!ctl.has_handle());
        assert_eq!(mock.releases(), 1);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let (mut ctl, mock) = controller();
        ctl.start(&SinkConfig::default(), noop_callback()).unwrap();

        assert!(ctl.teardown());
        assert!(!ctl.teardown());
        drop(ctl);
        assert_eq!(mock.releases(), 1);
    }

    #[test]
    fn test_drop_releases_running_handle() {
        let (mut ctl, mock) = controller();
        ctl.start(&SinkConfig::default(), noop_callback()).unwrap();
        drop(ctl);
        assert_eq!(mock.releases(), 1);
    }

    #[test]
    fn test_double_start_rejected() {
        let (mut ctl, mock) = controller();
        ctl.start(&SinkConfig::default(), noop_callback()).unwrap();

        let err = ctl.start(&SinkConfig::default(), noop_callback()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidState {
                operation: "start",
                state: ControllerState::Running
            }
        ));
        assert_eq!(mock.with(|s| s.created), 1);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (mut ctl, mock) = controller();
        assert!(ctl.stop().is_ok());
        assert_eq!(mock.with(|s| s.stops), 0);
    }

    #[test]
    fn test_info_write_failure_does_not_abort_start() {
        let (mut ctl, mock) = controller();
        mock.with(|s| s.fail_info_keys.insert(INFO_HOST.to_owned()));

        ctl.start(&SinkConfig::default(), noop_callback()).unwrap();
        assert_eq!(mock.info(INFO_HOST), None);
        assert_eq!(mock.info(INFO_DEST_HOST).as_deref(), Some("127.0.0.1"));
        assert!(ctl.is_running());
    }
}
