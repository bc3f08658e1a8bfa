//! Layer directory behavior and its hand-off to the selection engine.

use async_trait::async_trait;
use elev_common::{
    ApiEndpoints, Credentials, GeoPoint, HttpClient, HttpError, HttpRequest, HttpResponse,
};
use elev_terrain::{
    AutoSelectionEngine, DirectoryError, FilePreferences, LayerDirectory, MemoryViewer,
    RefreshOutcome, SelectionMode,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ScriptedHttpClient {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
}

impl ScriptedHttpClient {
    fn replying(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
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
                    reason: "connection refused".into(),
                })
            })
    }
}

const LAYERS: &str = r#"[
    {"id": "world", "name": "World", "url": "https://cdn/world", "is_active": true},
    {"id": "navarra", "name": "Navarra 5m", "url": "https://cdn/navarra",
     "bbox_minx": -2.5, "bbox_miny": 42.0, "bbox_maxx": -1.0, "bbox_maxy": 43.5,
     "is_active": true},
    {"id": "broken", "name": "Broken"},
    {"id": "spain", "name": "Spain", "url": "https://cdn/spain",
     "bbox_minx": -9.5, "bbox_miny": 36.0, "bbox_maxx": 3.5, "bbox_maxy": 44.0,
     "is_active": true}
]"#;

fn directory(
    http: &Arc<ScriptedHttpClient>,
) -> LayerDirectory<Arc<ScriptedHttpClient>> {
    LayerDirectory::new(
        Arc::clone(http),
        ApiEndpoints::new("http://backend:8000"),
        Credentials::bearer("tok").with_tenant("farm-7"),
    )
}

#[tokio::test]
async fn test_refresh_loads_layers_in_order() {
    let http = ScriptedHttpClient::replying(vec![Ok(HttpResponse::new(200, LAYERS))]);
    let mut directory = directory(&http);
    assert!(directory.list().is_empty());

    let outcome = directory.refresh().await;
    assert!(outcome.is_first_fetch());

    let ids: Vec<&str> = directory.list().iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["world", "navarra", "spain"]);
    assert!(directory.get("world").unwrap().bbox.is_none());

    let requests = http.requests.lock().unwrap();
    assert_eq!(requests[0].url, "http://backend:8000/api/elevation/layers");
    assert_eq!(requests[0].header("Authorization"), Some("Bearer tok"));
}

#[tokio::test]
async fn test_failed_refresh_keeps_last_list() {
    let http = ScriptedHttpClient::replying(vec![
        Ok(HttpResponse::new(200, LAYERS)),
        Ok(HttpResponse::new(502, "bad gateway")),
        Ok(HttpResponse::new(200, "{\"not\": \"a list\"}")),
    ]);
    let mut directory = directory(&http);
    directory.refresh().await;

    match directory.refresh().await {
        RefreshOutcome::Retained {
            error: DirectoryError::Status(502),
        } => {}
        other => panic!("expected retained list, got {other:?}"),
    }
    assert_eq!(directory.list().len(), 3);

    assert!(matches!(
        directory.refresh().await,
        RefreshOutcome::Retained {
            error: DirectoryError::InvalidBody(_)
        }
    ));
    assert_eq!(directory.list().len(), 3);

    assert!(matches!(
        directory.refresh().await,
        RefreshOutcome::Retained {
            error: DirectoryError::Http(_)
        }
    ));
    assert_eq!(directory.list().len(), 3);
}

#[tokio::test]
async fn test_unreachable_directory_is_empty() {
    let http = ScriptedHttpClient::replying(Vec::new());
    let mut directory = directory(&http);

    let outcome = directory.refresh().await;
    assert!(!outcome.is_first_fetch());
    assert!(directory.list().is_empty());
    assert!(!directory.has_fetched());
}

#[tokio::test]
async fn test_second_fetch_is_not_first() {
    let http = ScriptedHttpClient::replying(vec![
        Ok(HttpResponse::new(200, "[]")),
        Ok(HttpResponse::new(200, LAYERS)),
    ]);
    let mut directory = directory(&http);
    assert!(directory.refresh().await.is_first_fetch());
    assert!(!directory.refresh().await.is_first_fetch());
}

#[tokio::test]
async fn test_engine_follows_directory_and_persists_mode() {
    let http = ScriptedHttpClient::replying(vec![Ok(HttpResponse::new(200, LAYERS))]);
    let mut directory = directory(&http);
    let prefs_dir = tempfile::tempdir().unwrap();
    let prefs = FilePreferences::new(prefs_dir.path().join("prefs.json"));

    let mut engine = AutoSelectionEngine::attach(
        MemoryViewer::new(Some("https://cdn/base")),
        prefs.clone(),
        None,
    );
    engine.on_camera_settled(GeoPoint::new(-1.64, 42.81));
    assert_eq!(engine.viewer().mutations(), 0);

    directory.refresh().await;
    engine.on_directory_fetched(directory.list());
    assert_eq!(engine.active_provider(), Some("https://cdn/navarra"));

    engine.set_mode(SelectionMode::Off).unwrap();
    assert_eq!(engine.viewer().current(), Some("https://cdn/base"));
    drop(engine);

    let engine = AutoSelectionEngine::attach(MemoryViewer::new(None), prefs, None);
    assert_eq!(engine.mode(), &SelectionMode::Off);
}
