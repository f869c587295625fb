//! Axum HTTP server for the switching proxy.
//!
//! Routes:
//! - `POST /set_target` - switch the active target
//! - everything else - forwarded to the active target
//!
//! `serve()` runs the router on a pre-bound `TcpListener` until the
//! cancellation token fires.

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, Uri, uri::PathAndQuery},
    response::{IntoResponse, Response},
    routing::{any, post},
};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::HttpError;
use crate::forward::{forward, is_forwardable};
use crate::inspect;
use crate::target::TargetState;

/// Shared application state for the proxy server.
#[derive(Clone)]
pub struct AppState {
    /// Active target selection.
    targets: Arc<TargetState>,
    /// HTTP client for forwarding requests upstream.
    client: Client,
    /// Port local targets are forwarded to.
    local_port: u16,
    /// Log decoded bodies of every forwarded request.
    inspect: bool,
}

impl AppState {
    pub const fn new(
        targets: Arc<TargetState>,
        client: Client,
        local_port: u16,
        inspect: bool,
    ) -> Self {
        Self {
            targets,
            client,
            local_port,
            inspect,
        }
    }
}

/// Body of `POST /set_target`.
#[derive(Debug, Deserialize)]
struct SetTargetRequest {
    target: String,
}

#[derive(Debug, Serialize)]
struct SetTargetResponse {
    message: String,
}

/// Build the proxy router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Other methods on /set_target are ordinary upstream paths
        .route("/set_target", post(set_target).fallback(forward_request))
        .route("/", any(forward_request))
        .route("/*path", any(forward_request))
        .fallback(not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the proxy on a pre-bound listener until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(state);

    info!("Proxy listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Proxy server shut down");
    Ok(())
}

/// Switch the active target.
async fn set_target(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SetTargetResponse>, HttpError> {
    let request: SetTargetRequest = serde_json::from_slice(&body)
        .map_err(|e| HttpError::BadRequest(format!("Invalid request body: {e}")))?;

    let message = state.targets.set(&request.target).await?;
    Ok(Json(SetTargetResponse { message }))
}

/// Forward any request to the active target.
async fn forward_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpError> {
    if !is_forwardable(&method) {
        return Err(HttpError::MethodNotAllowed);
    }

    // Resolved once: a switch during the call does not redirect it
    let active = state.targets.current();
    let path_and_query = uri.path_and_query().map_or("/", PathAndQuery::as_str);
    let upstream_url = active
        .descriptor
        .upstream_url(state.local_port, path_and_query);
    debug!(name = %active.name, descriptor = %active.descriptor, "Current target");

    if state.inspect {
        inspect::log_request(&body);
    }

    let response = forward(&state.client, &upstream_url, method, &headers, body).await?;

    if state.inspect {
        inspect::log_response(response.status, &response.headers, &response.body);
    }

    Ok(response.into_response())
}

async fn not_found() -> HttpError {
    HttpError::NotFound
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    HttpError::Internal(format!("handler panicked: {detail}")).into_response()
}
