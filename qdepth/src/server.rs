//! HTTP surface: metric scrapes and the manual override
use std::net::SocketAddr;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{metrics::Metrics, Error, Result};
use qdepth_core::{OverrideRequest, OverrideStore};

#[derive(Clone)]
struct AppState {
    metrics: Metrics,
    overrides: OverrideStore,
}

/// Routes for `GET /metrics` and `GET /testQueue?q=<queue>&d=<depth>`
pub fn router(metrics: Metrics, overrides: OverrideStore) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .route("/testQueue", get(set_override))
        .with_state(AppState { metrics, overrides })
}

/// Serve `router` on `addr` until `shutdown` is cancelled
pub async fn serve(addr: SocketAddr, router: Router, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::Serve)?;
    info!(%addr, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(Error::Serve)
}

async fn scrape(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, state.metrics.content_type())], body).into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn set_override(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> (StatusCode, String) {
    match OverrideRequest::from_params(first(&params, "q"), first(&params, "d")) {
        Ok(req) => {
            let body = format!("queue is set as {} {}", req.queue_name, req.depth);
            info!(queue = %req.queue_name, depth = req.depth, "override set");
            req.apply(&state.overrides);
            (StatusCode::OK, body)
        }
        Err(err) => {
            warn!(error = %err, "rejected override request");
            (StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

// repeated parameters resolve to their first occurrence
fn first<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
