//! Shopdesk document server.
//!
//! Serves JSON document collections and revisioned binary blobs to the
//! remote stores of `shopdesk-core`.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check (no auth required)
//! - `GET|PUT|DELETE /collections/{name}`: whole collection
//! - `GET|PUT|DELETE /collections/{name}/{id}`: one document
//! - `GET|PUT /blobs/{*path}`: binary blob
//!
//! Every response that touches stored data carries the current revision in
//! `x-revision`. Writes may send `if-match`; a stale revision gets 409.

pub mod storage;


pub use storage::{ServerStorage, ServerStorageError, StoredCollection};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shopdesk_core::remote::protocol::{
    parse_revision, CollectionBody, HealthResponse, ReplaceRequest, IF_MATCH_HEADER,
    REVISION_HEADER,
};
use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Largest accepted request body. Item buckets carry the whole catalog.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// Authentication
// ============================================================================

/// API key entry in the server config file
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Authenticated client, added to request extensions after auth
#[derive(Debug, Clone)]
pub struct AuthClient {
    pub name: String,
}

/// API key store - maps key -> client
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthClient>,
}

impl ApiKeyStore {
    pub fn new(entries: Vec<ApiKeyEntry>) -> Self {
        let keys = entries
            .into_iter()
            .map(|entry| (entry.key, AuthClient { name: entry.name }))
            .collect();
        Self { keys }
    }

    /// Load API keys from a YAML config file. A missing or broken file
    /// yields an empty store.
    pub fn load(config_path: &FsPath) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<ConfigFile>(&contents) {
                Ok(config) => {
                    let store = Self::new(config.api_keys);
                    tracing::info!("Loaded {} API key(s)", store.len());
                    store
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn validate(&self, key: &str) -> Option<AuthClient> {
        self.keys.get(key).cloned()
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    api_keys: Arc<ApiKeyStore>,
    storage: Arc<Mutex<ServerStorage>>,
}

impl AppState {
    pub fn new(api_keys: ApiKeyStore, storage: ServerStorage) -> Self {
        Self {
            api_keys: Arc::new(api_keys),
            storage: Arc::new(Mutex::new(storage)),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        Some(_) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "invalid_auth",
                "Authorization header must use Bearer scheme",
            );
        }
        None => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header required",
            );
        }
    };

    match state.api_keys.validate(api_key) {
        Some(client) => {
            request.extensions_mut().insert(client);
            next.run(request).await
        }
        None => error_response(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key"),
    }
}

// ============================================================================
// Handlers
// ============================================================================

impl IntoResponse for ServerStorageError {
    fn into_response(self) -> Response {
        match self {
            ServerStorageError::InvalidName(_) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_name", self.to_string())
            }
            ServerStorageError::Conflict { found, .. } => {
                let mut response =
                    error_response(StatusCode::CONFLICT, "conflict", self.to_string());
                response
                    .headers_mut()
                    .insert(REVISION_HEADER, HeaderValue::from(found));
                response
            }
            ServerStorageError::IoError(..) | ServerStorageError::ParseError(..) => {
                tracing::error!("Storage failure: {}", self);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage",
                    "Storage failure",
                )
            }
        }
    }
}

/// Revision the writer based its change on, if it sent one.
fn if_match(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(IF_MATCH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_revision(Some(v.trim_matches('"'))))
}

fn with_revision(revision: u64, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(REVISION_HEADER, HeaderValue::from(revision));
    response
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ServerStorageError> {
    let collection = state.storage.lock().await.load_collection(&name)?;
    let revision = collection.revision;
    Ok(with_revision(
        revision,
        Json(CollectionBody {
            revision,
            documents: collection.documents,
        }),
    ))
}

async fn replace_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ReplaceRequest>,
) -> Result<Response, ServerStorageError> {
    let count = request.documents.len();
    let revision = state.storage.lock().await.replace_collection(
        &name,
        request.documents,
        if_match(&headers),
    )?;
    tracing::debug!("Replaced {} with {} document(s)", name, count);
    Ok(with_revision(revision, StatusCode::OK))
}

async fn clear_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerStorageError> {
    let revision =
        state
            .storage
            .lock()
            .await
            .replace_collection(&name, Vec::new(), if_match(&headers))?;
    Ok(with_revision(revision, StatusCode::OK))
}

async fn get_document(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> Result<Response, ServerStorageError> {
    let (body, revision) = state.storage.lock().await.get_document(&name, &id)?;
    Ok(match body {
        Some(body) => with_revision(revision, Json(body)),
        None => with_revision(revision, StatusCode::NOT_FOUND),
    })
}

async fn put_document(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, ServerStorageError> {
    let revision =
        state
            .storage
            .lock()
            .await
            .put_document(&name, &id, body, if_match(&headers))?;
    Ok(with_revision(revision, StatusCode::OK))
}

async fn delete_document(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ServerStorageError> {
    let revision =
        state
            .storage
            .lock()
            .await
            .delete_document(&name, &id, if_match(&headers))?;
    Ok(with_revision(revision, StatusCode::OK))
}

async fn get_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ServerStorageError> {
    match state.storage.lock().await.load_blob(&path)? {
        Some((bytes, revision)) => Ok(with_revision(
            revision,
            (
                [(header::CONTENT_TYPE, "application/octet-stream")],
                bytes,
            ),
        )),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn put_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ServerStorageError> {
    let revision = state
        .storage
        .lock()
        .await
        .save_blob(&path, &body, if_match(&headers))?;
    tracing::debug!("Stored blob {} ({} bytes, revision {})", path, body.len(), revision);
    Ok(with_revision(revision, StatusCode::OK))
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/collections/{name}",
            get(get_collection)
                .put(replace_collection)
                .delete(clear_collection),
        )
        .route(
            "/collections/{name}/{id}",
            get(get_document).put(put_document).delete(delete_document),
        )
        .route("/blobs/{*path}", get(get_blob).put(put_blob))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
