//! Streaming transports for job status frames.
//!
//! A [`Connector`] opens one [`FrameTransport`] per job. The production
//! connector speaks WebSocket; [`ChannelConnector`] feeds frames from memory
//! so the status channel can be driven deterministically.

use async_trait::async_trait;
use bytes::Bytes;
use elev_common::{ApiEndpoints, Credentials};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::{JobId, TransportError};

/// One open stream of raw status frames.
#[async_trait]
pub trait FrameTransport: Send {
    /// Wait for the next frame.
    ///
    /// `None` means the peer closed the stream.
    async fn next_frame(&mut self) -> Option<Result<Bytes, TransportError>>;

    /// Release the underlying connection. Safe to call more than once.
    async fn close(&mut self);
}

/// Opens status streams.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open the status stream of one job.
    async fn connect(&self, job_id: &JobId) -> Result<Box<dyn FrameTransport>, TransportError>;
}

// ============================================================================
// WebSocket
// ============================================================================

/// Connects to the backend's per-job WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    endpoints: ApiEndpoints,
    credentials: Credentials,
}

impl WebSocketConnector {
    /// Create a connector; credentials are sent as handshake headers.
    pub fn new(endpoints: ApiEndpoints, credentials: Credentials) -> Self {
        Self {
            endpoints,
            credentials,
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, job_id: &JobId) -> Result<Box<dyn FrameTransport>, TransportError> {
        let url = self.endpoints.stream_url(job_id.as_str());
        let connect_err = |reason: String| TransportError::Connect {
            url: url.clone(),
            reason,
        };

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| connect_err(e.to_string()))?;
        for (name, value) in self.credentials.headers() {
            let name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| connect_err(e.to_string()))?;
            let value = HeaderValue::from_str(&value).map_err(|e| connect_err(e.to_string()))?;
            request.headers_mut().insert(name, value);
        }

        debug!(%job_id, %url, "opening status stream");
        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| connect_err(e.to_string()))?;

        Ok(Box::new(WebSocketTransport {
            stream: Some(stream),
        }))
    }
}

struct WebSocketTransport {
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

#[async_trait]
impl FrameTransport for WebSocketTransport {
    async fn next_frame(&mut self) -> Option<Result<Bytes, TransportError>> {
        let stream = self.stream.as_mut()?;
        loop {
            match stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Bytes::from(text))),
                Ok(Message::Binary(data)) => return Some(Ok(Bytes::from(data))),
                Ok(Message::Close(frame)) => {
                    trace!(?frame, "server closed status stream");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(TransportError::Stream(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                trace!(error = %e, "error while closing status stream");
            }
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Feeds frames into a [`ChannelTransport`].
///
/// Dropping the sender ends the stream as if the server disconnected.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<Result<Bytes, TransportError>>,
}

impl FrameSender {
    /// Queue a text frame. Returns `false` once the transport is gone.
    pub fn send_text(&self, frame: impl Into<String>) -> bool {
        self.tx.send(Ok(Bytes::from(frame.into()))).is_ok()
    }

    /// Queue a raw frame.
    pub fn send_bytes(&self, frame: impl Into<Bytes>) -> bool {
        self.tx.send(Ok(frame.into())).is_ok()
    }

    /// Queue a transport failure.
    pub fn send_error(&self, error: TransportError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// True once the receiving transport has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// In-memory transport backed by an unbounded channel.
#[derive(Debug)]
pub struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<Result<Bytes, TransportError>>,
}

impl ChannelTransport {
    /// Create a connected sender/transport pair.
    pub fn pair() -> (FrameSender, ChannelTransport) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FrameSender { tx }, ChannelTransport { rx })
    }
}

#[async_trait]
impl FrameTransport for ChannelTransport {
    async fn next_frame(&mut self) -> Option<Result<Bytes, TransportError>> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

/// Hands out pre-registered in-memory transports by job id.
#[derive(Debug, Default)]
pub struct ChannelConnector {
    transports: Mutex<HashMap<JobId, Vec<ChannelTransport>>>,
    connects: Mutex<Vec<JobId>>,
}

impl ChannelConnector {
    /// Create an empty connector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream for `job_id` and return its sender.
    ///
    /// Several streams may be registered for one job; each connect takes the
    /// oldest. Connecting with none left fails.
    pub fn register(&self, job_id: impl Into<JobId>) -> FrameSender {
        let (sender, transport) = ChannelTransport::pair();
        if let Ok(mut transports) = self.transports.lock() {
            transports.entry(job_id.into()).or_default().push(transport);
        }
        sender
    }

    /// Jobs connected so far, in order.
    pub fn connects(&self) -> Vec<JobId> {
        self.connects
            .lock()
            .map(|connects| connects.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, job_id: &JobId) -> Result<Box<dyn FrameTransport>, TransportError> {
        if let Ok(mut connects) = self.connects.lock() {
            connects.push(job_id.clone());
        }
        let transport = self.transports.lock().ok().and_then(|mut transports| {
            let queue = transports.get_mut(job_id)?;
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        });
        match transport {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(TransportError::Connect {
                url: format!("memory://{job_id}"),
                reason: "no stream registered".to_string(),
            }),
        }
    }
}
