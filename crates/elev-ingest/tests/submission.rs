//! End-to-end tests of job submission and status tracking against
//! in-memory collaborators.

use async_trait::async_trait;
use elev_common::{
    ApiEndpoints, Credentials, FormPart, HttpClient, HttpError, HttpRequest, HttpResponse, Method,
    RequestBody, TENANT_HEADER,
};
use elev_ingest::{
    ChannelConfig, ChannelConnector, IngestError, IngestionRequest, JobEvent, JobId, JobState,
    JobSubmissionClient, LocalFile, StatusChannel,
};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// HTTP fake that records every request and replays canned responses.
#[derive(Default)]
struct RecordingHttpClient {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
}

impl RecordingHttpClient {
    fn replying(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(HttpError::Request {
                    url,
                    reason: "no canned response".into(),
                })
            })
    }
}

fn client(http: &Arc<RecordingHttpClient>) -> JobSubmissionClient<Arc<RecordingHttpClient>> {
    JobSubmissionClient::new(Arc::clone(http), ApiEndpoints::new("http://backend:8000"))
}

fn uk_request() -> IngestionRequest {
    IngestionRequest::remote(
        "uk",
        [-8.6, 49.9, 1.8, 60.9],
        ["https://data.example.org/uk_dtm.tif"],
    )
}

fn accepted(job_id: &str, status: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse::new(
        202,
        format!(r#"{{"job_id":"{job_id}","status":"{status}","message":"Ingestion job queued."}}"#),
    ))
}

#[tokio::test]
async fn test_uk_submission_tracked_to_success() {
    let http = RecordingHttpClient::replying(vec![accepted("abc123", "queued")]);
    let job = client(&http)
        .submit(&uk_request(), &Credentials::bearer("tok"))
        .await
        .unwrap();

    assert_eq!(job.id(), &JobId::new("abc123"));
    assert_eq!(job.state(), JobState::Queued);

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, "http://backend:8000/api/elevation/ingest");
    assert_eq!(
        requests[0].body,
        RequestBody::Json(serde_json::json!({
            "country_code": "uk",
            "bbox": [-8.6, 49.9, 1.8, 60.9],
            "source_urls": ["https://data.example.org/uk_dtm.tif"],
        }))
    );

    let connector = ChannelConnector::new();
    let sender = connector.register("abc123");
    for frame in [
        r#"{"status":"RUNNING","progress":10}"#,
        r#"{"status":"RUNNING","progress":80}"#,
        r#"{"status":"SUCCESS","progress":100}"#,
    ] {
        sender.send_text(frame);
    }

    let mut job = job;
    let mut channel =
        StatusChannel::open(job.id().clone(), &connector, ChannelConfig::default()).await;
    let mut progress = Vec::new();
    let mut terminal = 0;
    while let Some(event) = channel.next_event().await {
        progress.extend(event.progress());
        if event.is_terminal() {
            terminal += 1;
        }
        job.apply(&event);
    }

    assert_eq!(progress, vec![10, 80, 100]);
    assert_eq!(terminal, 1);
    assert_eq!(job.state(), JobState::Succeeded);
}

#[tokio::test]
async fn test_frames_after_terminal_are_never_delivered() {
    let connector = ChannelConnector::new();
    let sender = connector.register("abc123");
    sender.send_text(r#"{"status":"RUNNING","progress":50}"#);
    sender.send_text(r#"{"status":"FAILURE","message":"GDAL error"}"#);
    sender.send_text(r#"{"status":"RUNNING","progress":60}"#);
    sender.send_text(r#"{"status":"SUCCESS","progress":100}"#);

    let channel = StatusChannel::open("abc123", &connector, ChannelConfig::default()).await;
    let events: Vec<JobEvent> = channel.into_stream().collect().await;

    assert_eq!(
        events,
        vec![
            JobEvent::Running {
                progress: Some(50),
                message: None,
            },
            JobEvent::Failed {
                message: "GDAL error".into(),
            },
        ]
    );
    assert!(sender.is_closed());
}

#[tokio::test]
async fn test_inverted_bbox_makes_no_network_call() {
    let http = RecordingHttpClient::replying(vec![accepted("never", "queued")]);
    let request = IngestionRequest::remote("uk", [1.8, 49.9, -8.6, 60.9], ["https://x/a.tif"]);

    let err = client(&http)
        .submit(&request, &Credentials::none())
        .await
        .unwrap_err();

    match err {
        IngestError::Validation(err) => assert_eq!(err.field, "bbox"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_upload_without_file_makes_no_network_call() {
    let http = RecordingHttpClient::replying(vec![accepted("never", "queued")]);
    let request = IngestionRequest::upload("es", None).with_bbox([-2.5, 42.0, -1.0, 43.5]);

    let err = client(&http)
        .submit(&request, &Credentials::none())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Validation(ref e) if e.field == "local_file"));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_upload_sends_multipart_form() {
    let http = RecordingHttpClient::replying(vec![accepted("up-1", "PENDING")]);
    let file = LocalFile::new("navarra.tif", vec![0x49u8, 0x49, 0x2a, 0x00]);
    let request = IngestionRequest::upload("es", Some(file)).with_bbox([-2.5, 42.0, -1.0, 43.5]);

    let job = client(&http)
        .submit(&request, &Credentials::none())
        .await
        .unwrap();
    assert_eq!(job.state(), JobState::Queued);

    let requests = http.requests();
    assert_eq!(requests[0].url, "http://backend:8000/api/elevation/upload");
    let RequestBody::Multipart(parts) = &requests[0].body else {
        panic!("expected multipart body");
    };
    let names: Vec<&str> = parts.iter().map(FormPart::name).collect();
    assert_eq!(names, vec!["file", "country_code", "bbox"]);
    assert_eq!(
        parts[2],
        FormPart::Text {
            name: "bbox".into(),
            value: "-2.5,42,-1,43.5".into(),
        }
    );
}

#[tokio::test]
async fn test_credentials_attached_only_when_supplied() {
    let http = RecordingHttpClient::replying(vec![
        accepted("a", "queued"),
        accepted("b", "queued"),
    ]);
    let client = client(&http);

    client
        .submit(&uk_request(), &Credentials::none())
        .await
        .unwrap();
    client
        .submit(
            &uk_request(),
            &Credentials::bearer("tok").with_tenant("farm-7"),
        )
        .await
        .unwrap();

    let requests = http.requests();
    assert_eq!(requests[0].header("Authorization"), None);
    assert_eq!(requests[0].header(TENANT_HEADER), None);
    assert_eq!(requests[1].header("Authorization"), Some("Bearer tok"));
    assert_eq!(requests[1].header(TENANT_HEADER), Some("farm-7"));
}

#[tokio::test]
async fn test_rejection_carries_server_detail() {
    let http = RecordingHttpClient::replying(vec![Ok(HttpResponse::new(
        503,
        r#"{"detail":"Processing queue unavailable. Please try again later."}"#,
    ))]);

    let err = client(&http)
        .submit(&uk_request(), &Credentials::none())
        .await
        .unwrap_err();

    match err {
        IngestError::Rejected { status, detail } => {
            assert_eq!(status, 503);
            assert_eq!(detail, "Processing queue unavailable. Please try again later.");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn test_transport_failure_is_not_retried() {
    let http = RecordingHttpClient::replying(vec![
        Err(HttpError::Request {
            url: "http://backend:8000/api/elevation/ingest".into(),
            reason: "connection refused".into(),
        }),
        accepted("retry", "queued"),
    ]);

    let err = client(&http)
        .submit(&uk_request(), &Credentials::none())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Http(_)));
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn test_unrecognised_initial_status_is_queued() {
    let http = RecordingHttpClient::replying(vec![accepted("abc123", "teleporting")]);
    let job = client(&http)
        .submit(&uk_request(), &Credentials::none())
        .await
        .unwrap();
    assert_eq!(job.state(), JobState::Queued);
    assert_eq!(job.message(), Some("Ingestion job queued."));
}

#[tokio::test]
async fn test_job_status_polling() {
    let http = RecordingHttpClient::replying(vec![Ok(HttpResponse::new(
        200,
        r#"{"job_id":"abc123","status":"FAILURE","result":null,"error":"No source data"}"#,
    ))]);

    let status = client(&http)
        .job_status(&JobId::new("abc123"), &Credentials::bearer("tok"))
        .await
        .unwrap();

    assert_eq!(status.state, Some(JobState::Failed));
    assert_eq!(status.raw_status, "FAILURE");
    assert_eq!(status.error.as_deref(), Some("No source data"));

    let requests = http.requests();
    assert_eq!(requests[0].method, Method::Get);
    assert_eq!(
        requests[0].url,
        "http://backend:8000/api/elevation/status/abc123"
    );
}

#[tokio::test]
async fn test_health() {
    let http = RecordingHttpClient::replying(vec![Ok(HttpResponse::new(
        200,
        r#"{"status":"healthy","module":"elevation","version":"1.0.0"}"#,
    ))]);

    let health = client(&http).health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version.as_deref(), Some("1.0.0"));
    assert_eq!(http.requests()[0].url, "http://backend:8000/health");
}
