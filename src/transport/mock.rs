//! Recording transport for tests.
//!
//! [`MockTransport`] keeps everything it is asked to do in a shared
//! [`MockState`], so a test can hand the transport to the sink and still
//! inspect sends, info writes, and releases afterwards. Failures are injected
//! through the same state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{EdgeError, EdgeResult};
use super::factory::TransportFactory;
use super::info::InfoStore;
use super::types::{ConnectType, EdgeEvent, EventCallback, NodeType};
use super::{EdgeData, EdgeTransport};

/// Everything observed by mock transports sharing one state.
#[derive(Default)]
pub struct MockState {
    /// Current info entries.
    pub info: InfoStore,
    /// Every `set_info` call in order.
    pub info_writes: Vec<(String, String)>,
    /// Segments of every payload unit passed to `send`.
    pub sent: Vec<Vec<Vec<u8>>>,
    /// Number of `start` calls.
    pub starts: usize,
    /// Number of `stop` calls.
    pub stops: usize,
    /// Number of handles released.
    pub releases: usize,
    /// Number of handles created through [`MockFactory`].
    pub created: usize,
    /// Custom library paths requested through [`MockFactory`].
    pub custom_paths: Vec<PathBuf>,
    /// Registered event callback.
    pub callback: Option<EventCallback>,

    /// Fail handle creation.
    pub fail_create: bool,
    /// Fail `start`.
    pub fail_start: bool,
    /// Fail `stop`.
    pub fail_stop: bool,
    /// Fail `send`.
    pub fail_send: bool,
    /// Keys whose `set_info` fails.
    pub fail_info_keys: HashSet<String>,
}

/// Shared handle to a [`MockState`].
#[derive(Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Create a fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the state locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Deliver `event` through the registered callback, as a backend thread would.
    pub fn emit(&self, event: EdgeEvent) -> Option<EdgeResult<()>> {
        let callback = self.state.lock().callback.clone();
        callback.map(|cb| cb(&event))
    }

    /// Payload units sent so far.
    pub fn sent(&self) -> Vec<Vec<Vec<u8>>> {
        self.state.lock().sent.clone()
    }

    /// Current value of an info entry.
    pub fn info(&self, key: &str) -> Option<String> {
        self.state.lock().info.get(key).map(str::to_owned)
    }

    /// Number of handles released.
    pub fn releases(&self) -> usize {
        self.state.lock().releases
    }
}

/// Transport that records calls into a [`MockHandle`].
pub struct MockTransport {
    kind: ConnectType,
    handle: MockHandle,
}

impl MockTransport {
    /// Create a transport with its own state.
    pub fn new(kind: ConnectType) -> Self {
        Self::with_handle(kind, MockHandle::new())
    }

    /// Create a transport recording into `handle`.
    pub fn with_handle(kind: ConnectType, handle: MockHandle) -> Self {
        Self { kind, handle }
    }

    /// The shared state handle.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

impl EdgeTransport for MockTransport {
    fn connect_type(&self) -> ConnectType {
        self.kind
    }

    fn set_info(&mut self, key: &str, value: &str) -> EdgeResult<()> {
        self.handle.with(|state| {
            if state.fail_info_keys.contains(&key.to_ascii_uppercase()) {
                return Err(EdgeError::Backend(format!("info {key} rejected")));
            }
            state.info_writes.push((key.to_owned(), value.to_owned()));
            state.info.set(key, value)
        })
    }

    fn get_info(&self, key: &str) -> Option<String> {
        self.handle.info(key)
    }

    fn set_event_callback(&mut self, callback: EventCallback) {
        self.handle.with(|state| state.callback = Some(callback));
    }

    fn start(&mut self) -> EdgeResult<()> {
        self.handle.with(|state| {
            state.starts += 1;
            if state.fail_start {
                return Err(EdgeError::ConnectionFailure("mock start failure".into()));
            }
            Ok(())
        })
    }

    fn stop(&mut self) -> EdgeResult<()> {
        self.handle.with(|state| {
            state.stops += 1;
            if state.fail_stop {
                return Err(EdgeError::Backend("mock stop failure".into()));
            }
            Ok(())
        })
    }

    fn send(&self, data: &EdgeData<'_>) -> EdgeResult<()> {
        self.handle.with(|state| {
            if state.fail_send {
                return Err(EdgeError::SendFailed { failed: 1 });
            }
            state.sent.push(data.iter().map(<[u8]>::to_vec).collect());
            Ok(())
        })
    }

    fn release(self: Box<Self>) {
        self.handle.with(|state| {
            state.releases += 1;
            state.callback = None;
        });
    }
}

/// Factory producing [`MockTransport`]s that share one [`MockHandle`].
#[derive(Clone, Default)]
pub struct MockFactory {
    handle: MockHandle,
}

impl MockFactory {
    /// Create a factory with a fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared state handle.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    fn build(&self, kind: ConnectType) -> EdgeResult<Box<dyn EdgeTransport>> {
        self.handle.with(|state| {
            if state.fail_create {
                return Err(EdgeError::Backend("mock create failure".into()));
            }
            state.created += 1;
            Ok(())
        })?;
        Ok(Box::new(MockTransport::with_handle(kind, self.handle())))
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, kind: ConnectType, _node: NodeType) -> EdgeResult<Box<dyn EdgeTransport>> {
        self.build(kind)
    }

    fn create_custom(
        &self,
        lib_path: &Path,
        _node: NodeType,
    ) -> EdgeResult<Box<dyn EdgeTransport>> {
        self.handle
            .with(|state| state.custom_paths.push(lib_path.to_path_buf()));
        self.build(ConnectType::Custom)
    }
}
