//! Connection gate.
//!
//! A single `connected` flag guarded by a mutex, paired with a condition
//! variable. The transport's event callback is the only writer; buffer senders
//! wait on it before handing data to the transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::config::WaitPolicy;
use crate::core::constants::LOG_TARGET;
use crate::transport::{EdgeEvent, EventCallback};

/// Blocking admission check for outgoing buffers.
#[derive(Debug, Default)]
pub struct ConnectionGate {
    connected: Mutex<bool>,
    cond: Condvar,
}

impl ConnectionGate {
    /// Create a gate in the disconnected state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a connection is established.
    ///
    /// - `wait_enabled == false`: returns `true` at once, whatever the state.
    /// - `timeout_ms == 0`: blocks until connected.
    /// - otherwise: blocks until connected or the deadline passes, then
    ///   reports the flag as last seen under the lock.
    pub fn await_connection(&self, wait_enabled: bool, timeout_ms: u64) -> bool {
        if !wait_enabled {
            return true;
        }

        let deadline = match timeout_ms {
            0 => None,
            ms => Instant::now().checked_add(Duration::from_millis(ms)),
        };

        let mut connected = self.connected.lock();
        while !*connected {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut connected, deadline).timed_out() {
                        tracing::error!(
                            target: LOG_TARGET,
                            timeout_ms,
                            "failed to wait for connection"
                        );
                        break;
                    }
                }
                None => self.cond.wait(&mut connected),
            }
        }
        *connected
    }

    /// [`await_connection`](Self::await_connection) with a policy snapshot.
    pub fn await_policy(&self, policy: WaitPolicy) -> bool {
        self.await_connection(policy.wait_connection, policy.connection_timeout_ms)
    }

    /// Mark the gate connected and wake every waiter.
    pub fn notify_connected(&self) {
        let mut connected = self.connected.lock();
        *connected = true;
        self.cond.notify_all();
    }

    /// Current value of the flag.
    pub fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    /// Return to the disconnected state for a new stream.
    pub fn reset(&self) {
        *self.connected.lock() = false;
    }

    /// Build the transport event callback that drives this gate.
    ///
    /// The callback only flips the flag on `ConnectionCompleted`; every other
    /// event is ignored.
    pub fn event_callback(self: &Arc<Self>) -> EventCallback {
        let gate = Arc::clone(self);
        Arc::new(move |event: &EdgeEvent| {
            if let EdgeEvent::ConnectionCompleted = event {
                tracing::debug!(target: LOG_TARGET, "connection completed");
                gate.notify_connected();
            }
            Ok(())
        })
    }
}
