//! Dedicated picker pipeline thread (spec §4.4 closing paragraph): a
//! worker reads initial picks from a bounded queue fed by the
//! threshold extractor and writes refined picks to a bounded queue
//! drained by the pick publisher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use urts_config::ServiceConfig;
use urts_transport::{BoundedQueue, Publisher};
use urts_types::{ChannelId, Pick};

use crate::pipeline::PickerChannel;

/// Owns one worker thread that drains `input`, routes each pick to its
/// channel's [`PickerChannel`], and republishes the refined pick via
/// `output`. Picks for channels with no registered pipeline are
/// logged and dropped, matching spec §7 kind 3 (message-validity
/// errors are logged and the message dropped, the listener continues).
pub struct PickerWorker {
    channels: Arc<HashMap<ChannelId, PickerChannel>>,
    input: Arc<BoundedQueue<Pick>>,
    output: Arc<dyn Publisher<Pick> + Send + Sync>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    poll_timeout: Duration,
}

impl PickerWorker {
    /// `poll_timeout` is the picker service's `ServiceConfig.polling_time_out`
    /// (spec §4.5's "each worker polls a socket with a configurable
    /// timeout (default 10 ms)") — pass `config.polling_time_out` from the
    /// deployment's [`urts_config::ServiceConfig`].
    pub fn new(
        channels: HashMap<ChannelId, PickerChannel>,
        input: Arc<BoundedQueue<Pick>>,
        output: Arc<dyn Publisher<Pick> + Send + Sync>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            channels: Arc::new(channels),
            input,
            output,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            poll_timeout,
        }
    }

    pub fn from_service_config(
        channels: HashMap<ChannelId, PickerChannel>,
        input: Arc<BoundedQueue<Pick>>,
        output: Arc<dyn Publisher<Pick> + Send + Sync>,
        config: &ServiceConfig,
    ) -> Self {
        Self::new(channels, input, output, config.polling_time_out)
    }

    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let channels = self.channels.clone();
        let input = self.input.clone();
        let output = self.output.clone();
        let running = self.running.clone();
        let poll_timeout = self.poll_timeout;

        self.thread = Some(std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let Some(initial) = input.pop_timeout(poll_timeout) else {
                    continue;
                };
                let Some(pipeline) = channels.get(&initial.channel) else {
                    tracing::warn!(channel = %initial.channel, "picker worker has no pipeline for this channel, dropping pick");
                    continue;
                };
                let refined = pipeline.process(initial);
                if output.publish(refined).is_err() {
                    tracing::warn!("failed to publish refined pick");
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for PickerWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
