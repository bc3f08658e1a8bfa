//! Job submission client.
//!
//! [`JobSubmissionClient::submit`] validates a request, sends exactly one
//! POST and turns the answer into a [`Job`] handle. It never retries: a
//! rejection or transport failure goes straight back to the caller.

use elev_common::{ApiEndpoints, Credentials, FormPart, HttpClient, HttpRequest, HttpResponse};
use elev_metrics::{metric_defs, metrics};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    IngestError, IngestionRequest, IngestionSource, Job, JobId, JobState, Result,
    ValidatedRequest,
};

/// Body of a successful submission.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Snapshot returned by the status polling endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    /// Job id echoed by the backend.
    pub job_id: JobId,
    /// Mapped state; `None` when the backend reported something unknown.
    pub state: Option<JobState>,
    /// Status string exactly as reported.
    pub raw_status: String,
    /// Result document of a succeeded job.
    pub result: Option<Value>,
    /// Error text of a failed job.
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    job_id: String,
    status: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Service health report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    /// `"healthy"` when the service is up.
    pub status: String,
    /// Module name.
    #[serde(default)]
    pub module: Option<String>,
    /// Service version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Submits ingestion requests and queries job status.
#[derive(Debug, Clone)]
pub struct JobSubmissionClient<H> {
    http: H,
    endpoints: ApiEndpoints,
}

impl<H: HttpClient> JobSubmissionClient<H> {
    /// Create a client over the given HTTP collaborator.
    pub fn new(http: H, endpoints: ApiEndpoints) -> Self {
        Self { http, endpoints }
    }

    /// Endpoints this client talks to.
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Validate and submit one ingestion request.
    ///
    /// Validation failures return before anything is sent. Otherwise exactly
    /// one POST is made; its outcome is returned as-is.
    pub async fn submit(
        &self,
        request: &IngestionRequest,
        credentials: &Credentials,
    ) -> Result<Job> {
        let validated = request.validate().inspect_err(|err| {
            warn!(field = err.field, reason = %err.reason, "ingestion request rejected locally");
            metrics::counter!(metric_defs::INGEST_VALIDATION_FAILURES.name, "field" => err.field)
                .increment(1);
        })?;

        let mode = validated.mode().as_str();
        let http_request = self.build_request(&validated).with_credentials(credentials);
        let url = http_request.url.clone();
        info!(region = validated.region_code(), mode, %url, "submitting ingestion request");

        let response = match self.http.execute(http_request).await {
            Ok(response) => response,
            Err(err) => {
                metrics::counter!(
                    metric_defs::INGEST_SUBMISSIONS.name,
                    "mode" => mode,
                    "outcome" => "transport_error"
                )
                .increment(1);
                return Err(err.into());
            }
        };

        if !response.is_success() {
            let detail = rejection_detail(&response);
            warn!(status = response.status, %detail, "ingestion request rejected");
            metrics::counter!(
                metric_defs::INGEST_SUBMISSIONS.name,
                "mode" => mode,
                "outcome" => "rejected"
            )
            .increment(1);
            return Err(IngestError::Rejected {
                status: response.status,
                detail,
            });
        }

        let body: SubmitResponse = response.json().map_err(|e| IngestError::InvalidResponse {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let state = match body.status.as_deref() {
            Some(status) => JobState::parse(status).unwrap_or_else(|| {
                warn!(job_id = %body.job_id, status, "unrecognised initial status, assuming queued");
                JobState::Queued
            }),
            None => JobState::Queued,
        };

        metrics::counter!(
            metric_defs::INGEST_SUBMISSIONS.name,
            "mode" => mode,
            "outcome" => "accepted"
        )
        .increment(1);
        info!(job_id = %body.job_id, %state, "ingestion job accepted");

        Ok(Job::new(body.job_id, state, body.message))
    }

    /// Poll the backend for a job's current status. One call, no retries.
    pub async fn job_status(&self, job_id: &JobId, credentials: &Credentials) -> Result<JobStatus> {
        let url = self.endpoints.status_url(job_id.as_str());
        let response = self
            .http
            .execute(HttpRequest::get(&url).with_credentials(credentials))
            .await?;

        if !response.is_success() {
            return Err(IngestError::Rejected {
                status: response.status,
                detail: rejection_detail(&response),
            });
        }

        let body: StatusResponse = response
            .json()
            .map_err(|e| IngestError::InvalidResponse {
                url,
                reason: e.to_string(),
            })?;
        let state = JobState::parse(&body.status);
        debug!(job_id = %body.job_id, status = %body.status, ?state, "job status polled");

        Ok(JobStatus {
            job_id: JobId::new(body.job_id),
            state,
            raw_status: body.status,
            result: body.result,
            error: body.error.filter(|e| !e.is_empty()),
        })
    }

    /// Query the service health endpoint.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoints.health_url();
        let response = self.http.execute(HttpRequest::get(&url)).await?;
        if !response.is_success() {
            return Err(IngestError::Rejected {
                status: response.status,
                detail: rejection_detail(&response),
            });
        }
        response.json().map_err(|e| IngestError::InvalidResponse {
            url,
            reason: e.to_string(),
        })
    }

    fn build_request(&self, request: &ValidatedRequest) -> HttpRequest {
        match request.source() {
            IngestionSource::Remote { source_urls } => {
                let bbox = request.bbox().map(|b| b.to_array());
                HttpRequest::post_json(
                    self.endpoints.ingest_url(),
                    json!({
                        "country_code": request.region_code(),
                        "bbox": bbox,
                        "source_urls": source_urls,
                    }),
                )
            }
            IngestionSource::Upload(file) => {
                metrics::histogram!(metric_defs::INGEST_UPLOAD_SIZE.name)
                    .record(file.payload.len() as f64);
                let mut parts = vec![
                    FormPart::File {
                        name: "file".to_string(),
                        file_name: file.file_name.clone(),
                        data: file.payload.clone(),
                    },
                    FormPart::Text {
                        name: "country_code".to_string(),
                        value: request.region_code().to_string(),
                    },
                ];
                if let Some(bbox) = request.bbox() {
                    parts.push(FormPart::Text {
                        name: "bbox".to_string(),
                        value: bbox.to_csv(),
                    });
                }
                HttpRequest::post_multipart(self.endpoints.upload_url(), parts)
            }
        }
    }
}

/// Server `detail` when present, otherwise a generic status message.
///
/// String details are returned verbatim; structured details (validation
/// error lists) are rendered as compact JSON.
fn rejection_detail(response: &HttpResponse) -> String {
    let detail = response
        .json::<Value>()
        .ok()
        .and_then(|body| body.get("detail").cloned());
    match detail {
        Some(Value::String(text)) if !text.is_empty() => text,
        Some(Value::Null) | Some(Value::String(_)) | None => {
            format!("request failed with HTTP {}", response.status)
        }
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_detail_verbatim() {
        let response = HttpResponse::new(
            503,
            r#"{"detail":"Processing queue unavailable. Please try again later."}"#,
        );
        assert_eq!(
            rejection_detail(&response),
            "Processing queue unavailable. Please try again later."
        );
    }

    #[test]
    fn test_rejection_detail_generic_fallback() {
        assert_eq!(
            rejection_detail(&HttpResponse::new(500, "<html>oops</html>")),
            "request failed with HTTP 500"
        );
        assert_eq!(
            rejection_detail(&HttpResponse::new(502, r#"{"detail":""}"#)),
            "request failed with HTTP 502"
        );
    }

    #[test]
    fn test_rejection_detail_structured() {
        let response = HttpResponse::new(422, r#"{"detail":[{"loc":["body","bbox"]}]}"#);
        assert_eq!(rejection_detail(&response), r#"[{"loc":["body","bbox"]}]"#);
    }
}
