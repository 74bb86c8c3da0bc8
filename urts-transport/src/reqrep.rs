//! Request/reply transport (spec §4.6): the associator's replicated
//! workers and the picker's command surface both answer synchronous
//! requests from a background thread. The worker loop here mirrors
//! the receiver threads in the audio crates this workspace started
//! from: an `AtomicBool` run flag, a polling read with a timeout, and
//! a clean join on shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use urts_config::ServiceConfig;

use crate::error::TransportError;
use crate::queue::BoundedQueue;

/// A client that can issue a request and block (up to `timeout`) for
/// the matching reply.
pub trait RequestClient<Req, Resp> {
    fn request(&self, req: Req, timeout: Duration) -> Result<Resp, TransportError>;
}

/// A named-command surface a reply worker exposes, e.g. the picker
/// pipeline's runtime controls (spec §4.4 design note). `on_terminate`
/// runs once, on the worker thread, right before it exits.
pub trait CommandReplier: Send + Sync {
    fn on_available_commands(&self) -> Vec<String>;
    fn on_command(&self, command: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError>;
    fn on_terminate(&self) {}
}

type PendingMap<Resp> = Arc<Mutex<HashMap<u64, Arc<BoundedQueue<Resp>>>>>;

/// A single in-process request/reply channel backed by one background
/// worker thread. `Req`/`Resp` travel through bounded queues; each
/// in-flight request gets its own one-slot response queue keyed by a
/// monotonically increasing request id, so replies can arrive out of
/// the order requests were issued.
pub struct ReplyServer<Req, Resp> {
    next_id: AtomicU64,
    requests: Arc<BoundedQueue<(u64, Req)>>,
    pending: PendingMap<Resp>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    poll_timeout: Duration,
}

impl<Req, Resp> ReplyServer<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn new(queue_capacity: usize, poll_timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            requests: Arc::new(BoundedQueue::new(queue_capacity)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            poll_timeout,
        }
    }

    /// Builds a server sized and paced from `config`: `receive_high_water_mark`
    /// becomes the request queue's capacity and `polling_time_out` the
    /// worker thread's poll interval (spec §4.5: "each worker polls a
    /// socket with a configurable timeout").
    pub fn from_service_config(config: &ServiceConfig) -> Self {
        Self::new(config.receive_high_water_mark as usize, config.polling_time_out)
    }

    /// Starts the worker thread, applying `handler` to every request
    /// popped from the queue until [`ReplyServer::stop`] is called.
    pub fn start<F>(&self, handler: F)
    where
        F: Fn(Req) -> Resp + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let requests = self.requests.clone();
        let pending = self.pending.clone();
        let running = self.running.clone();
        let poll_timeout = self.poll_timeout;

        let handle = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let Some((id, req)) = requests.pop_timeout(poll_timeout) else {
                    continue;
                };
                let response = handler(req);
                if let Some(slot) = pending.lock().get(&id) {
                    if slot.try_push(response).is_err() {
                        tracing::warn!(request_id = id, "reply dropped, requester already gave up");
                    }
                }
            }
        });
        *self.worker.lock() = Some(handle);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl<Req, Resp> RequestClient<Req, Resp> for ReplyServer<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn request(&self, req: Req, timeout: Duration) -> Result<Resp, TransportError> {
        if !self.is_running() {
            return Err(TransportError::WorkerTerminated);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response_queue = Arc::new(BoundedQueue::new(1));
        self.pending.lock().insert(id, response_queue.clone());

        if self.requests.try_push((id, req)).is_err() {
            self.pending.lock().remove(&id);
            return Err(TransportError::QueueFull);
        }

        let result = response_queue.pop_timeout(timeout);
        self.pending.lock().remove(&id);
        result.ok_or(TransportError::Timeout)
    }
}

impl<Req, Resp> Drop for ReplyServer<Req, Resp> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

/// Wraps a [`CommandReplier`] as a named-command `ReplyServer`. Calls
/// `on_terminate` once, from the worker thread, on shutdown.
pub struct CommandReplyServer {
    inner: ReplyServer<(String, Vec<u8>), Result<Vec<u8>, TransportError>>,
}

impl CommandReplyServer {
    pub fn new(queue_capacity: usize, poll_timeout: Duration) -> Self {
        Self {
            inner: ReplyServer::new(queue_capacity, poll_timeout),
        }
    }

    pub fn from_service_config(config: &ServiceConfig) -> Self {
        Self {
            inner: ReplyServer::from_service_config(config),
        }
    }

    pub fn start(&self, replier: Arc<dyn CommandReplier>) {
        let terminate_replier = replier.clone();
        let running = self.inner.running.clone();
        self.inner.start(move |(command, payload): (String, Vec<u8>)| {
            replier.on_command(&command, &payload)
        });
        // Ensure on_terminate fires exactly once, after the worker's
        // run loop has actually exited.
        let handle = self.inner.worker.lock().take();
        if let Some(handle) = handle {
            self.inner.worker.lock().replace(std::thread::spawn(move || {
                handle.join().ok();
                if !running.load(Ordering::SeqCst) {
                    terminate_replier.on_terminate();
                }
            }));
        }
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn send_command(
        &self,
        command: impl Into<String>,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.inner.request((command.into(), payload), timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_reaches_handler_and_returns_response() {
        let server: ReplyServer<i32, i32> = ReplyServer::new(8, Duration::from_millis(10));
        server.start(|req| req * 2);
        let response = server.request(21, Duration::from_millis(200)).unwrap();
        assert_eq!(response, 42);
        server.stop();
    }

    #[test]
    fn request_times_out_when_worker_never_starts() {
        let server: ReplyServer<i32, i32> = ReplyServer::new(8, Duration::from_millis(10));
        let result = server.request(1, Duration::from_millis(10));
        assert_eq!(result, Err(TransportError::WorkerTerminated));
    }

    #[test]
    fn concurrent_requests_get_their_own_reply() {
        use std::sync::Arc;
        let server = Arc::new(ReplyServer::<i32, i32>::new(8, Duration::from_millis(10)));
        server.start(|req| {
            std::thread::sleep(Duration::from_millis(5));
            req + 1
        });

        let mut handles = Vec::new();
        for i in 0..8 {
            let server = server.clone();
            handles.push(std::thread::spawn(move || {
                server.request(i, Duration::from_millis(500)).unwrap()
            }));
        }
        let mut results: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        results.sort();
        assert_eq!(results, (1..=8).collect::<Vec<_>>());
        server.stop();
    }

    struct EchoReplier;
    impl CommandReplier for EchoReplier {
        fn on_available_commands(&self) -> Vec<String> {
            vec!["echo".to_string()]
        }
        fn on_command(&self, command: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
            if command == "echo" {
                Ok(payload.to_vec())
            } else {
                Err(TransportError::UnknownCommand(command.to_string()))
            }
        }
    }

    #[test]
    fn command_reply_server_dispatches_named_commands() {
        let server = CommandReplyServer::new(8, Duration::from_millis(10));
        server.start(Arc::new(EchoReplier));
        let response = server
            .send_command("echo", b"hi".to_vec(), Duration::from_millis(200))
            .unwrap();
        assert_eq!(response, b"hi".to_vec());
        server.stop();
    }
}
