use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::error::Error;
use crate::models::{DocumentPatch, NewDocument};
use crate::service::{DocumentService, ListQuery};

#[derive(Clone)]
pub struct ServerState {
    pub service: DocumentService,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub folder: Option<String>,
    pub folders: Option<String>,
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        ListQuery {
            search: params.q,
            folder: params.folder,
            folders_only: params.folders.as_deref() == Some("true"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::ReadOnly(_) => StatusCode::FORBIDDEN,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the API router.
pub fn router(service: DocumentService) -> Router {
    let state = Arc::new(ServerState { service });

    // Configure CORS to allow the local dashboard front-end
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/documents", get(list_documents).post(create_document))
        .route(
            "/api/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/api/settings", get(get_settings))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
pub async fn start_server(
    addr: SocketAddr,
    service: DocumentService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Merged, filtered and ranked documents, or folder names with `folders=true`.
async fn list_documents(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(params) = params.map_err(|e| Error::InvalidInput(e.body_text()))?;
    let listing = state.service.list(&params.into()).await?;
    Ok(Json(listing).into_response())
}

async fn create_document(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(doc) = payload.map_err(|e| Error::InvalidInput(e.body_text()))?;
    let created = state.service.create(doc).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn get_document(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Response, Error> {
    let doc = state.service.get(&id).await?;
    Ok(Json(doc).into_response())
}

async fn update_document(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    payload: Result<Json<DocumentPatch>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(patch) = payload.map_err(|e| Error::InvalidInput(e.body_text()))?;
    let doc = state.service.update(&id, patch).await?;
    Ok(Json(doc).into_response())
}

async fn delete_document(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Response, Error> {
    state.service.delete(&id).await?;
    Ok(Json(DeleteResponse { success: true }).into_response())
}

/// Scan roots are loaded from the settings table at startup; they are not
/// writable over HTTP.
async fn get_settings(State(state): State<Arc<ServerState>>) -> Json<AppConfig> {
    Json(state.service.config().get().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;
    use crate::db::Store;
    use crate::scanner::ScanRoot;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    async fn app(roots: Vec<ScanRoot>) -> (TempDir, Router) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("test.db")).unwrap();
        let config = ConfigManager::new(store.clone()).unwrap();
        config
            .save(&AppConfig {
                scan_roots: roots,
                skip_dirs: vec!["node_modules".to_string()],
                baseline_folders: vec!["Notes".to_string()],
            })
            .await
            .unwrap();

        let service = DocumentService::new(store, Arc::new(config));
        (dir, router(service))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = app(vec![]).await;
        let (status, body) = send(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_and_list_documents() {
        let notes = tempdir().unwrap();
        fs::write(notes.path().join("notes.md"), "# My Notes").unwrap();
        let (_dir, app) = app(vec![ScanRoot::deep(notes.path())]).await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/documents",
            Some(json!({ "title": "Budget", "content": "the budget", "pinned": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["source"], "db");
        assert_eq!(created["folder"], "Uncategorized");
        assert_eq!(created["author"], "larry");

        let (status, list) = send(&app, Method::GET, "/api/documents", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["title"], "Budget");
        assert_eq!(list[1]["title"], "My Notes");
        assert_eq!(list[1]["source"], "file");
        assert!(list[1]["filePath"].is_string());
        assert!(list[0].get("filePath").is_none());

        let (_, found) = send(&app, Method::GET, "/api/documents?q=BUDGET", None).await;
        assert_eq!(found.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_folders_only() {
        let (_dir, app) = app(vec![]).await;
        send(
            &app,
            Method::POST,
            "/api/documents",
            Some(json!({ "title": "Trip", "folder": "Family" })),
        )
        .await;

        let (status, folders) = send(&app, Method::GET, "/api/documents?folders=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(folders, json!(["Family", "Notes"]));
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let (_dir, app) = app(vec![]).await;

        let (status, body) = send(&app, Method::POST, "/api/documents", Some(json!({ "content": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, Method::POST, "/api/documents", Some(json!({ "title": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_dir, app) = app(vec![]).await;
        let (_, created) = send(
            &app,
            Method::POST,
            "/api/documents",
            Some(json!({ "title": "Draft" })),
        )
        .await;
        let uri = format!("/api/documents/{}", created["id"].as_str().unwrap());

        let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({ "pinned": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["pinned"], true);
        assert_eq!(updated["title"], "Draft");

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true }));

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_file_documents_reject_writes() {
        let notes = tempdir().unwrap();
        fs::write(notes.path().join("notes.md"), "# My Notes").unwrap();
        let (_dir, app) = app(vec![ScanRoot::deep(notes.path())]).await;

        let (_, list) = send(&app, Method::GET, "/api/documents", None).await;
        let uri = format!("/api/documents/{}", list[0]["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, doc) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["title"], "My Notes");
    }

    #[tokio::test]
    async fn test_settings_are_read_only() {
        let (_dir, app) = app(vec![ScanRoot::flat("/srv/notes")]).await;

        let (status, config) = send(&app, Method::GET, "/api/settings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            config["scan_roots"],
            json!([{ "path": "/srv/notes", "recursive": false }])
        );

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/settings",
            Some(json!({ "scan_roots": [], "skip_dirs": [], "baseline_folders": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (_, after) = send(&app, Method::GET, "/api/settings", None).await;
        assert_eq!(after, config);
    }

    #[tokio::test]
    async fn test_malformed_query_returns_json_error() {
        let (_dir, app) = app(vec![]).await;

        let (status, body) = send(&app, Method::GET, "/api/documents?q=a&q=b", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
