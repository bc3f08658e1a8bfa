//! # elev-common
//!
//! Shared building blocks for the elevation ingestion client and the terrain
//! auto-selection engine:
//!
//! - [`Bbox`] and [`GeoPoint`] geographic primitives in EPSG:4326 degrees
//! - [`Credentials`] forwarded verbatim to the backend
//! - [`ApiEndpoints`] describing where the backend lives
//! - the [`HttpClient`] seam and its reqwest implementation
//!
//! ## Example
//!
//! ```
//! use elev_common::{Bbox, GeoPoint};
//!
//! let bbox = Bbox::new(-2.5, 42.0, -1.0, 43.5)?;
//! assert!(bbox.contains(GeoPoint::new(-2.0, 43.0)));
//! # Ok::<(), elev_common::BboxError>(())
//! ```

mod credentials;
mod endpoints;
mod error;
mod geo;
mod http;

pub use credentials::{Credentials, TENANT_HEADER};
pub use endpoints::{ApiEndpoints, DEFAULT_API_BASE_URL, DEFAULT_STREAM_PATH_TEMPLATE};
pub use error::{BboxError, HttpError};
pub use geo::{Bbox, GeoPoint};
pub use http::{
    FormPart, HttpClient, HttpRequest, HttpResponse, Method, ReqwestClient, RequestBody,
    DEFAULT_REQUEST_TIMEOUT,
};
