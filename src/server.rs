//! HTTP read endpoints for documents, plus health and configuration status.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::Instrument;

use crate::config::Config;
use crate::document::{Document, DocumentLoader, DocumentMeta};
use crate::error::{Error, JsonError, Result};
use crate::markdown;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Clone)]
pub struct AppState {
    pub loader: DocumentLoader,
    pub store_configured: bool,
    pub store_table: String,
}

impl AppState {
    pub fn new(loader: DocumentLoader, config: &Config) -> Self {
        Self {
            loader,
            store_configured: config.store.is_configured(),
            store_table: config.store.table.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub configured: bool,
    pub table: String,
    pub documents_root: PathBuf,
    pub documents_root_exists: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/documents", get(list_documents))
        .route("/api/documents/:category/:name", get(get_document))
        .route("/documents/:category/:name", get(document_page))
        .fallback(not_found)
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn(request_tracing))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid bind address '{bind}'")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, root = %state.loader.root().display(), "serving documents");
    eprintln!("pinboard listening on http://{local}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn request_tracing(request: Request<Body>, next: Next) -> Response {
    let request_id = incoming_request_id(request.headers())
        .unwrap_or_else(|| ulid::Ulid::new().to_string());
    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| tracing::debug!(status = response.status().as_u16(), "request finished"));
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    if raw.is_empty() || raw.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    Some(raw.to_string())
}

/// Handler error mapped onto a JSON body and status code.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::DocumentNotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Document not found" })),
            )
                .into_response(),
            err => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(JsonError::from(&err)),
                )
                    .into_response()
            }
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    let root = state.loader.root().to_path_buf();
    Json(StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        configured: state.store_configured,
        table: state.store_table.clone(),
        documents_root_exists: root.is_dir(),
        documents_root: root,
    })
}

async fn list_documents(
    State(state): State<AppState>,
) -> std::result::Result<Json<Vec<DocumentMeta>>, ApiError> {
    Ok(Json(state.loader.list_all()?))
}

fn load_document(state: &AppState, category: &str, name: &str) -> Result<Document> {
    let slug = format!("{category}/{name}");
    state
        .loader
        .get(&slug)?
        .ok_or(Error::DocumentNotFound(slug))
}

async fn get_document(
    State(state): State<AppState>,
    Path((category, name)): Path<(String, String)>,
) -> std::result::Result<Json<Document>, ApiError> {
    Ok(Json(load_document(&state, &category, &name)?))
}

async fn document_page(
    State(state): State<AppState>,
    Path((category, name)): Path<(String, String)>,
) -> Response {
    match load_document(&state, &category, &name) {
        Ok(document) => {
            let body = markdown::to_html(&document.content);
            Html(markdown::page(&document.title, &body)).into_response()
        }
        Err(Error::DocumentNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Html(markdown::page("Not found", "<p>Document not found</p>\n")),
        )
            .into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_status_codes() {
        let missing = ApiError::from(Error::DocumentNotFound("a/b".to_string())).into_response();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let broken = ApiError::from(Error::OperationFailed("disk".to_string())).into_response();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn incoming_request_id_is_bounded() {
        let mut headers = HeaderMap::new();
        assert_eq!(incoming_request_id(&headers), None);

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("  abc  "));
        assert_eq!(incoming_request_id(&headers).as_deref(), Some("abc"));

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_eq!(incoming_request_id(&headers), None);
    }
}
