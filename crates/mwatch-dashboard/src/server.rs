//! HTTP server implementation using axum.

use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use mwatch_core::Aspect;
use mwatch_telemetry::Metrics;
use serde_json::json;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::facade::QueryFacade;

/// Shared application state for axum handlers.
#[derive(Clone)]
struct AppState {
    facade: QueryFacade,
    config: DashboardConfig,
}

/// Create the axum router.
pub fn create_router(facade: QueryFacade, config: DashboardConfig) -> Router {
    Router::new()
        .route("/api/summary", get(get_summary))
        .route("/api/disabled/{aspect}", get(get_disabled))
        .route("/api/report", get(get_report))
        .route("/api/state", get(get_state))
        .route("/api/reset", post(post_reset))
        .route("/metrics", get(get_metrics))
        .with_state(AppState { facade, config })
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if state.config.auth_enabled() && !check_basic_auth(headers, &state.config) {
        return Err(unauthorized_response());
    }
    Ok(())
}

async fn get_summary(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(state.facade.summary()).into_response()
}

async fn get_disabled(
    State(state): State<AppState>,
    Path(aspect): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    match aspect.parse::<Aspect>() {
        Ok(aspect) => Json(state.facade.list_disabled(aspect)).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn get_report(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.facade.export_report(),
    )
        .into_response()
}

async fn get_state(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    Json(state.facade.export_raw_state()).into_response()
}

async fn post_reset(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    warn!("State reset via dashboard");
    state.facade.reset();
    Json(json!({ "reset": true })).into_response()
}

async fn get_metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }
    match Metrics::gather_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Check basic authentication.
fn check_basic_auth(headers: &HeaderMap, config: &DashboardConfig) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Basic "))
    else {
        return false;
    };

    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
        return false;
    };

    decoded == format!("{}:{}", config.username, config.password).as_bytes()
}

/// Create an unauthorized response.
fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"mwatch\"")],
        "Unauthorized",
    )
        .into_response()
}

/// Run the dashboard HTTP server until the process exits.
pub async fn run_server(facade: QueryFacade, config: DashboardConfig) -> DashboardResult<()> {
    let port = config.port;
    let app = create_router(facade, config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| DashboardError::Bind { port, source })?;
    axum::serve(listener, app).await?;

    Ok(())
}
