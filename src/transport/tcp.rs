//! Built-in TCP publish backend.
//!
//! The publisher listens on `HOST:PORT` and pushes every payload unit to all
//! connected subscribers. It owns a small tokio runtime so the sink's producer
//! thread can stay synchronous; accepted peers trigger
//! [`EdgeEvent::ConnectionCompleted`] from a runtime worker thread.
//!
//! The publisher may be driven from inside another tokio runtime. Blocking
//! calls then run on a short-lived helper thread outside that runtime.
//!
//! Frame layout, one frame per payload unit:
//!
//! ```text
//! +0  Segment count (4 bytes LE32)
//! +4  For each segment:
//!     +0  Segment length (8 bytes LE64)
//!     +8  Segment bytes
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::error::{EdgeError, EdgeResult};
use super::info::InfoStore;
use super::types::{ConnectType, EdgeEvent, EventCallback, NodeType};
use super::{EdgeData, EdgeTransport};
use crate::core::constants::{
    DEFAULT_HOST, INFO_HOST, INFO_PORT, LOG_TARGET, TCP_WORKER_THREADS, TCP_WRITE_TIMEOUT,
};

/// Back-off after a failed `accept`.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Grace period for in-flight tasks on stop.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct Subscriber {
    peer: SocketAddr,
    stream: TcpStream,
}

type Subscribers = Arc<Mutex<Vec<Subscriber>>>;

/// TCP publisher backend.
pub struct TcpPublisher {
    info: InfoStore,
    callback: Option<EventCallback>,
    runtime: Option<Runtime>,
    accept_task: Option<JoinHandle<()>>,
    subscribers: Subscribers,
    local_addr: Option<SocketAddr>,
}

impl TcpPublisher {
    /// Create a stopped publisher. Only [`NodeType::Pub`] is supported.
    pub fn new(node: NodeType) -> EdgeResult<Self> {
        if node != NodeType::Pub {
            return Err(EdgeError::NotSupported(format!(
                "TCP backend cannot act as {node:?}"
            )));
        }
        Ok(Self {
            info: InfoStore::new(),
            callback: None,
            runtime: None,
            accept_task: None,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            local_addr: None,
        })
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        let Some(runtime) = &self.runtime else {
            return 0;
        };
        let subscribers = &self.subscribers;
        off_runtime(|| runtime.block_on(async { subscribers.lock().await.len() })).unwrap_or(0)
    }

    fn bind_target(&self) -> EdgeResult<(String, u16)> {
        let host = self.info.get(INFO_HOST).unwrap_or(DEFAULT_HOST).to_owned();
        let port = match self.info.get(INFO_PORT) {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| EdgeError::InvalidParameter(format!("invalid port: {port}")))?,
            None => 0,
        };
        Ok((host, port))
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        if let Some(runtime) = self.runtime.take() {
            let subscribers = Arc::clone(&self.subscribers);
            let closed = off_runtime(move || {
                runtime.block_on(async { subscribers.lock().await.clear() });
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
            });
            if let Err(err) = closed {
                tracing::warn!(target: LOG_TARGET, error = %err, "tcp publisher shutdown failed");
            }
        }
        self.local_addr = None;
    }
}

impl EdgeTransport for TcpPublisher {
    fn connect_type(&self) -> ConnectType {
        ConnectType::Tcp
    }

    fn set_info(&mut self, key: &str, value: &str) -> EdgeResult<()> {
        self.info.set(key, value)
    }

    fn get_info(&self, key: &str) -> Option<String> {
        self.info.get(key).map(str::to_owned)
    }

    fn set_event_callback(&mut self, callback: EventCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self) -> EdgeResult<()> {
        if self.runtime.is_some() {
            return Err(EdgeError::InvalidParameter("publisher already started".into()));
        }

        let (host, port) = self.bind_target()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(TCP_WORKER_THREADS)
            .thread_name("edge-sink-tcp")
            .enable_all()
            .build()?;

        let bound = off_runtime(|| runtime.block_on(TcpListener::bind((host.as_str(), port))))
            .and_then(|bound| {
                bound.map_err(|e| EdgeError::ConnectionFailure(format!("bind {host}:{port}: {e}")))
            })
            .and_then(|listener| {
                let local_addr = listener.local_addr()?;
                Ok((listener, local_addr))
            });
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(err) => {
                runtime.shutdown_background();
                return Err(err);
            }
        };

        tracing::info!(target: LOG_TARGET, %local_addr, "tcp publisher listening");

        let task = runtime.spawn(accept_loop(
            listener,
            Arc::clone(&self.subscribers),
            self.callback.clone(),
        ));

        self.accept_task = Some(task);
        self.runtime = Some(runtime);
        self.local_addr = Some(local_addr);
        self.info.set(INFO_PORT, &local_addr.port().to_string())
    }

    fn stop(&mut self) -> EdgeResult<()> {
        if self.runtime.is_none() {
            return Ok(());
        }
        tracing::info!(target: LOG_TARGET, local_addr = ?self.local_addr, "tcp publisher stopping");
        self.shutdown();
        Ok(())
    }

    fn send(&self, data: &EdgeData<'_>) -> EdgeResult<()> {
        let runtime = self.runtime.as_ref().ok_or(EdgeError::NotStarted)?;
        let segments: Vec<&[u8]> = data.iter().collect();
        let subscribers = &self.subscribers;
        off_runtime(|| runtime.block_on(broadcast(subscribers, &segments)))?
    }

    fn release(mut self: Box<Self>) {
        self.shutdown();
    }
}

impl Drop for TcpPublisher {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Run blocking runtime work outside any tokio context.
///
/// On a plain thread `work` runs inline. Inside a runtime, where `block_on`
/// and runtime shutdown would panic, it runs on a scoped helper thread.
fn off_runtime<R, F>(work: F) -> EdgeResult<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if Handle::try_current().is_err() {
        return Ok(work());
    }
    thread::scope(|scope| scope.spawn(work).join())
        .map_err(|_| EdgeError::Backend("tcp helper thread panicked".into()))
}

async fn accept_loop(
    listener: TcpListener,
    subscribers: Subscribers,
    callback: Option<EventCallback>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                if let Err(err) = stream.set_nodelay(true) {
                    tracing::debug!(target: LOG_TARGET, %peer, error = %err, "set_nodelay failed");
                }
                subscribers.lock().await.push(Subscriber { peer, stream });
                tracing::info!(target: LOG_TARGET, %peer, "subscriber connected");

                if let Some(callback) = &callback {
                    if let Err(err) = callback(&EdgeEvent::ConnectionCompleted) {
                        tracing::warn!(target: LOG_TARGET, error = %err, "event callback failed");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(target: LOG_TARGET, error = %err, "accept failed");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

/// Write one frame to every subscriber, dropping those whose write fails.
async fn broadcast(subscribers: &Subscribers, segments: &[&[u8]]) -> EdgeResult<()> {
    let mut subscribers = subscribers.lock().await;
    if subscribers.is_empty() {
        tracing::debug!(target: LOG_TARGET, "no subscribers, payload unit dropped");
        return Ok(());
    }

    let total = subscribers.len();
    let mut kept = Vec::with_capacity(total);
    for mut subscriber in subscribers.drain(..) {
        let write = write_frame(&mut subscriber.stream, segments);
        let written = match tokio::time::timeout(TCP_WRITE_TIMEOUT, write).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
        };
        match written {
            Ok(()) => kept.push(subscriber),
            Err(err) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    peer = %subscriber.peer,
                    error = %err,
                    "dropping subscriber"
                );
            }
        }
    }

    let failed = total - kept.len();
    *subscribers = kept;
    if failed == total {
        Err(EdgeError::SendFailed { failed })
    } else {
        Ok(())
    }
}

async fn write_frame(stream: &mut TcpStream, segments: &[&[u8]]) -> io::Result<()> {
    stream.write_all(&(segments.len() as u32).to_le_bytes()).await?;
    for segment in segments {
        stream.write_all(&(segment.len() as u64).to_le_bytes()).await?;
        stream.write_all(segment).await?;
    }
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn started_publisher() -> TcpPublisher {
        let mut publisher = TcpPublisher::new(NodeType::Pub).unwrap();
        publisher.set_info(INFO_HOST, "127.0.0.1").unwrap();
        publisher.start().unwrap();
        publisher
    }

    fn wait_for_subscribers(publisher: &TcpPublisher, count: usize) {
        for _ in 0..200 {
            if publisher.subscriber_count() >= count {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("subscribers did not connect");
    }

    #[test]
    fn test_rejects_non_pub_nodes() {
        assert!(matches!(
            TcpPublisher::new(NodeType::Sub),
            Err(EdgeError::NotSupported(_))
        ));
    }

    #[test]
    fn test_port_auto_assign_written_back() {
        let mut publisher = started_publisher();
        let addr = publisher.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(publisher.get_info("port"), Some(addr.port().to_string()));
        publisher.stop().unwrap();
        assert!(publisher.local_addr().is_none());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut publisher = TcpPublisher::new(NodeType::Pub).unwrap();
        publisher.set_info(INFO_PORT, "http").unwrap();
        assert!(matches!(
            publisher.start(),
            Err(EdgeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_send_before_start() {
        let publisher = TcpPublisher::new(NodeType::Pub).unwrap();
        assert!(matches!(
            publisher.send(&EdgeData::new()),
            Err(EdgeError::NotStarted)
        ));
    }

    #[test]
    fn test_send_without_subscribers_is_dropped() {
        let publisher = started_publisher();
        let bytes = [1u8, 2, 3];
        let mut data = EdgeData::new();
        data.add(&bytes, None).unwrap();
        assert!(publisher.send(&data).is_ok());
        Box::new(publisher).release();
    }

    #[test]
    fn test_connection_event_and_frame() {
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);

        let mut publisher = TcpPublisher::new(NodeType::Pub).unwrap();
        publisher.set_info(INFO_HOST, "127.0.0.1").unwrap();
        publisher.set_event_callback(Arc::new(move |event| {
            if *event == EdgeEvent::ConnectionCompleted {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }));
        publisher.start().unwrap();

        let addr = publisher.local_addr().unwrap();
        let mut client = std::net::TcpStream::connect(addr).unwrap();
        wait_for_subscribers(&publisher, 1);
        for _ in 0..200 {
            if events.load(Ordering::SeqCst) > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(events.load(Ordering::SeqCst), 1);

        let first = b"tensor-0".to_vec();
        let second = b"t1".to_vec();
        let mut data = EdgeData::new();
        data.add(&first, None).unwrap();
        data.add(&second, None).unwrap();
        publisher.send(&data).unwrap();

        let mut frame = vec![0u8; 4 + 8 + first.len() + 8 + second.len()];
        client.read_exact(&mut frame).unwrap();
        assert_eq!(u32::from_le_bytes(frame[0..4].try_into().unwrap()), 2);
        assert_eq!(u64::from_le_bytes(frame[4..12].try_into().unwrap()), 8);
        assert_eq!(&frame[12..20], b"tensor-0");
        assert_eq!(u64::from_le_bytes(frame[20..28].try_into().unwrap()), 2);
        assert_eq!(&frame[28..30], b"t1");

        Box::new(publisher).release();
    }

    #[test]
    fn test_usable_from_async_context() {
        let host = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        host.block_on(async {
            let mut publisher = started_publisher();
            let addr = publisher.local_addr().unwrap();
            let mut client = std::net::TcpStream::connect(addr).unwrap();
            wait_for_subscribers(&publisher, 1);

            let bytes = b"inside".to_vec();
            let mut data = EdgeData::new();
            data.add(&bytes, None).unwrap();
            publisher.send(&data).unwrap();

            let mut frame = vec![0u8; 4 + 8 + bytes.len()];
            client.read_exact(&mut frame).unwrap();
            assert_eq!(&frame[12..], b"inside");

            publisher.stop().unwrap();
            assert_eq!(publisher.subscriber_count(), 0);
            Box::new(publisher).release();
        });
    }

    #[test]
    fn test_bind_failure_inside_async_context() {
        let host = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        host.block_on(async {
            let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            let port = taken.local_addr().unwrap().port();

            let mut publisher = TcpPublisher::new(NodeType::Pub).unwrap();
            publisher.set_info(INFO_HOST, "127.0.0.1").unwrap();
            publisher.set_info(INFO_PORT, &port.to_string()).unwrap();
            assert!(matches!(
                publisher.start(),
                Err(EdgeError::ConnectionFailure(_))
            ));
            assert!(publisher.local_addr().is_none());
        });
    }
}
