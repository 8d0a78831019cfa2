//! HTTP snapshot server used by the `http` remote backend.
//!
//! # Endpoints
//!
//! - `GET /health`: health check (no auth)
//! - `GET /snapshot`: current snapshot, 404 before the first upload (no auth)
//! - `PUT /snapshot`: replace the snapshot (bearer API key required)

mod auth;
pub mod storage;

pub use auth::{auth_middleware, ApiKeyStore, AuthClient};
pub use storage::{ServerStorageError, SnapshotStore};

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::models::{CollectionCounts, Snapshot};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    api_keys: Arc<ApiKeyStore>,
    store: SnapshotStore,
    write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: SnapshotStore, api_keys: ApiKeyStore) -> Self {
        Self {
            api_keys: Arc::new(api_keys),
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Error body returned by every failing endpoint.
#[derive(Serialize)]
pub(crate) struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub(crate) fn error_response(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn get_snapshot(State(state): State<AppState>) -> Response {
    match state.store.load() {
        Ok(Some(snapshot)) => Json(snapshot).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "not_found", "No snapshot stored yet"),
        Err(e) => {
            tracing::error!("Failed to load snapshot: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Failed to load snapshot",
            )
        }
    }
}

#[derive(Serialize)]
struct PutResponse {
    status: &'static str,
    counts: CollectionCounts,
}

async fn put_snapshot(
    State(state): State<AppState>,
    Extension(client): Extension<AuthClient>,
    Json(snapshot): Json<Snapshot>,
) -> Response {
    let _write = state.write_lock.lock().await;

    match state.store.save(&snapshot) {
        Ok(()) => {
            let counts = snapshot.counts();
            tracing::info!(
                client = %client.name,
                records = counts.total(),
                "stored snapshot"
            );
            Json(PutResponse {
                status: "ok",
                counts,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to save snapshot: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Failed to save snapshot",
            )
        }
    }
}

pub fn router(state: AppState) -> Router {
    let write_snapshot = put(put_snapshot).route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    Router::new()
        .route("/health", get(health))
        .route("/snapshot", get(get_snapshot).merge(write_snapshot))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(temp: &TempDir) -> Router {
        router(AppState::new(
            SnapshotStore::new(temp.path()),
            ApiKeyStore::from_entries([("secret-key", "laptop")]),
        ))
    }

    fn put_request(body: &Snapshot, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::PUT)
            .uri("/snapshot")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let temp = TempDir::new().unwrap();
        let response = app(&temp)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_before_upload_is_not_found() {
        let temp = TempDir::new().unwrap();
        let response = app(&temp)
            .oneshot(Request::get("/snapshot").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_requires_valid_bearer_key() {
        let temp = TempDir::new().unwrap();
        let snapshot = Snapshot::empty();

        for auth in [None, Some("Basic abc"), Some("Bearer wrong")] {
            let response = app(&temp)
                .oneshot(put_request(&snapshot, auth))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "auth: {auth:?}");
        }
        assert!(SnapshotStore::new(temp.path()).load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let temp = TempDir::new().unwrap();
        let mut snapshot = Snapshot::empty();
        snapshot.vehicles.push(crate::models::Vehicle::new(
            "Triumph TR6",
            "Triumph",
            "TR6",
            uuid::Uuid::new_v4(),
        ));

        let response = app(&temp)
            .oneshot(put_request(&snapshot, Some("Bearer secret-key")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(&temp)
            .oneshot(Request::get("/snapshot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let fetched: Snapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched, snapshot);
    }

    #[tokio::test]
    async fn test_put_rejects_malformed_body() {
        let temp = TempDir::new().unwrap();
        let request = Request::builder()
            .method(Method::PUT)
            .uri("/snapshot")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, "Bearer secret-key")
            .body(Body::from("{\"users\": 5}"))
            .unwrap();

        let response = app(&temp).oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
