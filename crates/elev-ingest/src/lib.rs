//! # elev-ingest
//!
//! Submission and tracking of elevation ingestion jobs.
//!
//! An operator describes what to ingest with an [`IngestionRequest`] (a
//! bounding box plus either remote source URLs or one uploaded file), hands
//! it to a [`JobSubmissionClient`] and gets a [`Job`] back. Progress then
//! arrives over a [`StatusChannel`] as decoded [`JobEvent`]s until exactly
//! one terminal event.
//!
//! ## Example
//!
//! ```rust,ignore
//! use elev_common::{ApiEndpoints, Credentials, ReqwestClient};
//! use elev_ingest::{
//!     ChannelConfig, IngestionRequest, JobSubmissionClient, StatusChannel, WebSocketConnector,
//! };
//!
//! let endpoints = ApiEndpoints::new("https://elevation.example.org");
//! let credentials = Credentials::bearer(token);
//! let client = JobSubmissionClient::new(ReqwestClient::new()?, endpoints.clone());
//!
//! let request = IngestionRequest::remote("uk", [-8.6, 49.9, 1.8, 60.9], [source_url]);
//! let job = client.submit(&request, &credentials).await?;
//!
//! let connector = WebSocketConnector::new(endpoints, credentials);
//! let mut channel = StatusChannel::open(job.id().clone(), &connector, ChannelConfig::default()).await;
//! while let Some(event) = channel.next_event().await {
//!     println!("{:?}", event);
//! }
//! ```

mod channel;
mod error;
mod event;
mod job;
mod registry;
mod request;
mod submit;
pub mod transport;

pub use channel::{ChannelConfig, ChannelState, CloseHandle, StatusChannel};
pub use error::{DecodeError, IngestError, Result, TransportError, ValidationError};
pub use event::{decode_frame, JobEvent};
pub use job::{Job, JobId, JobState};
pub use registry::ChannelRegistry;
pub use request::{IngestionMode, IngestionRequest, IngestionSource, LocalFile, ValidatedRequest};
pub use submit::{HealthStatus, JobStatus, JobSubmissionClient};
pub use transport::{ChannelConnector, Connector, FrameTransport, WebSocketConnector};
