//! Real-time job status channel.
//!
//! A [`StatusChannel`] follows one job over a [`FrameTransport`]:
//!
//! ```text
//! DISCONNECTED ──connect──▶ CONNECTING ──▶ OPEN ──terminal / error / close──▶ CLOSED
//!                                 └───────── connect failure ─────────────────┘
//! ```
//!
//! Events come out of [`StatusChannel::next_event`] in receive order. The
//! first terminal event (or a synthesized connection failure) is the last
//! one; after it, and after [`close`](StatusChannel::close), the channel
//! yields nothing more.

use elev_metrics::{metric_defs, metrics};
use futures::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::transport::{Connector, FrameTransport};
use crate::{decode_frame, JobEvent, JobId, TransportError};

/// Channel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Not yet connected.
    Disconnected,
    /// Transport being established.
    Connecting,
    /// Receiving frames.
    Open,
    /// Finished; the transport has been released.
    Closed,
}

/// Status channel settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Give up with a terminal failure if no frame arrives for this long.
    pub idle_timeout: Option<Duration>,
}

impl ChannelConfig {
    /// Set the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }
}

/// State shared between a channel and its close handles.
struct Shared {
    close_tx: watch::Sender<bool>,
    transport: Mutex<Option<Box<dyn FrameTransport>>>,
    finished: AtomicBool,
}

impl Shared {
    /// Drop the transport without waiting.
    ///
    /// Fails only while a receive holds the transport; that receive is woken
    /// by the close flag and releases it itself.
    fn drop_transport(&self) -> bool {
        let Ok(mut slot) = self.transport.try_lock() else {
            return false;
        };
        match slot.take() {
            Some(transport) => {
                drop(transport);
                transport_released();
                true
            }
            None => false,
        }
    }
}

fn transport_released() {
    metrics::gauge!(metric_defs::STATUS_OPEN_CHANNELS.name).decrement(1.0);
}

/// Closes a [`StatusChannel`] from anywhere, including while another task
/// is waiting on it.
#[derive(Clone)]
pub struct CloseHandle {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl CloseHandle {
    /// Close the channel and release its transport. Idempotent.
    ///
    /// An idle channel loses its connection immediately; a channel blocked
    /// in [`StatusChannel::next_event`] releases it as that call returns.
    pub fn close(&self) {
        self.shared.close_tx.send_replace(true);
        self.shared.drop_transport();
    }

    /// True once the channel was closed or has delivered its last event.
    pub fn is_closed(&self) -> bool {
        *self.shared.close_tx.borrow() || self.shared.finished.load(Ordering::Acquire)
    }
}

enum Received {
    Frame(Option<Result<bytes::Bytes, TransportError>>),
    Idle(Duration),
    Cancelled,
}

/// Per-job status stream.
pub struct StatusChannel {
    job_id: JobId,
    config: ChannelConfig,
    state: ChannelState,
    pending: Option<JobEvent>,
    shared: Arc<Shared>,
    close_rx: watch::Receiver<bool>,
}

impl std::fmt::Debug for StatusChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusChannel")
            .field("job_id", &self.job_id)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

impl StatusChannel {
    /// Create a disconnected channel for `job_id`.
    pub fn new(job_id: impl Into<JobId>, config: ChannelConfig) -> Self {
        let (close_tx, close_rx) = watch::channel(false);
        Self {
            job_id: job_id.into(),
            config,
            state: ChannelState::Disconnected,
            pending: None,
            shared: Arc::new(Shared {
                close_tx,
                transport: Mutex::new(None),
                finished: AtomicBool::new(false),
            }),
            close_rx,
        }
    }

    /// Create and connect a channel in one step.
    pub async fn open(
        job_id: impl Into<JobId>,
        connector: &dyn Connector,
        config: ChannelConfig,
    ) -> Self {
        let mut channel = Self::new(job_id, config);
        channel.connect(connector).await;
        channel
    }

    /// Job this channel follows.
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        if self.close_requested() {
            ChannelState::Closed
        } else {
            self.state
        }
    }

    /// Handle that can close this channel from another task.
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn close_requested(&self) -> bool {
        *self.close_rx.borrow()
    }

    /// Establish the transport.
    ///
    /// Only acts on a disconnected channel. A connection failure does not
    /// return an error: it becomes the channel's terminal `Failed` event.
    pub async fn connect(&mut self, connector: &dyn Connector) {
        if self.state != ChannelState::Disconnected || self.close_requested() {
            return;
        }
        self.state = ChannelState::Connecting;
        debug!(job_id = %self.job_id, "connecting status channel");

        match connector.connect(&self.job_id).await {
            Ok(mut transport) => {
                if self.close_requested() {
                    transport.close().await;
                    self.finish();
                    return;
                }
                *self.shared.transport.lock().await = Some(transport);
                self.state = ChannelState::Open;
                metrics::gauge!(metric_defs::STATUS_OPEN_CHANNELS.name).increment(1.0);

                // A handle may have closed us while the transport was stored.
                if self.close_requested() {
                    self.release().await;
                    return;
                }
                info!(job_id = %self.job_id, "status channel open");
            }
            Err(err) => {
                warn!(job_id = %self.job_id, error = %err, "status channel failed to connect");
                metrics::counter!(metric_defs::STATUS_TRANSPORT_FAILURES.name).increment(1);
                self.pending = Some(JobEvent::connection_lost(err));
                self.finish();
            }
        }
    }

    /// Wait for the next event.
    ///
    /// Undecodable frames are logged and skipped. Returns `None` once the
    /// channel is closed.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        loop {
            if self.close_requested() {
                self.release().await;
                self.pending = None;
                return None;
            }
            if let Some(event) = self.pending.take() {
                return Some(self.deliver(event));
            }
            if self.state != ChannelState::Open {
                return None;
            }

            let received = {
                let shared = Arc::clone(&self.shared);
                let mut slot = shared.transport.lock().await;
                let Some(transport) = slot.as_mut() else {
                    self.finish();
                    continue;
                };
                let idle_timeout = self.config.idle_timeout;
                let close_rx = &mut self.close_rx;
                tokio::select! {
                    biased;
                    _ = close_rx.changed() => Received::Cancelled,
                    received = receive(&mut **transport, idle_timeout) => received,
                }
            };

            // Frames that raced a close are discarded.
            if self.close_requested() {
                continue;
            }

            match received {
                Received::Cancelled => continue,
                Received::Frame(Some(Ok(frame))) => match decode_frame(&frame) {
                    Ok(event) => {
                        if event.is_terminal() {
                            self.release().await;
                        }
                        return Some(self.deliver(event));
                    }
                    Err(err) => {
                        warn!(
                            job_id = %self.job_id,
                            error = %err,
                            "dropping undecodable status frame"
                        );
                        metrics::counter!(metric_defs::STATUS_DECODE_DROPS.name).increment(1);
                    }
                },
                Received::Frame(Some(Err(err))) => return Some(self.fail(err).await),
                Received::Frame(None) => {
                    let err = TransportError::Stream(
                        "stream closed before a terminal status".to_string(),
                    );
                    return Some(self.fail(err).await);
                }
                Received::Idle(timeout) => {
                    return Some(self.fail(TransportError::IdleTimeout(timeout.as_secs())).await);
                }
            }
        }
    }

    /// Close the channel and release the transport. Idempotent.
    pub async fn close(&mut self) {
        self.shared.close_tx.send_replace(true);
        self.pending = None;
        self.release().await;
    }

    /// Consume the channel as a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = JobEvent> + Send {
        futures::stream::unfold(self, |mut channel| async move {
            let event = channel.next_event().await?;
            Some((event, channel))
        })
    }

    fn deliver(&self, event: JobEvent) -> JobEvent {
        debug!(
            job_id = %self.job_id,
            kind = event.kind(),
            progress = ?event.progress(),
            "status event"
        );
        metrics::counter!(metric_defs::STATUS_EVENTS.name, "kind" => event.kind()).increment(1);
        event
    }

    async fn fail(&mut self, err: TransportError) -> JobEvent {
        warn!(job_id = %self.job_id, error = %err, "status channel lost");
        metrics::counter!(metric_defs::STATUS_TRANSPORT_FAILURES.name).increment(1);
        self.release().await;
        self.deliver(JobEvent::connection_lost(err))
    }

    async fn release(&mut self) {
        let transport = self.shared.transport.lock().await.take();
        if let Some(mut transport) = transport {
            transport.close().await;
            transport_released();
            debug!(job_id = %self.job_id, "status channel closed");
        }
        self.finish();
    }

    fn finish(&mut self) {
        self.state = ChannelState::Closed;
        self.shared.finished.store(true, Ordering::Release);
    }
}

impl Drop for StatusChannel {
    fn drop(&mut self) {
        if self.shared.drop_transport() {
            debug!(job_id = %self.job_id, "status channel dropped while open");
        }
        self.shared.finished.store(true, Ordering::Release);
    }
}

async fn receive(transport: &mut dyn FrameTransport, idle_timeout: Option<Duration>) -> Received {
    match idle_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, transport.next_frame()).await {
            Ok(frame) => Received::Frame(frame),
            Err(_) => Received::Idle(timeout),
        },
        None => Received::Frame(transport.next_frame().await),
    }
}
