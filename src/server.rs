use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use ed25519_dalek::VerifyingKey;
use serde_json::json;
use tracing::info;

use crate::commands::{CommandRegistry, Env};
use crate::dispatch;
use crate::verify::{SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Shared, read-only state for every request.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CommandRegistry>,
    pub env: Env,
    pub public_key: VerifyingKey,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/interactions", post(interactions).fallback(not_found))
        .fallback(not_found)
        .with_state(state)
}

async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    match dispatch::dispatch(
        &state.registry,
        &state.env,
        &state.public_key,
        header(SIGNATURE_HEADER),
        header(TIMESTAMP_HEADER),
        &body,
    )
    .await
    {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": 404, "error": "Not Found" })),
    )
}

pub async fn serve(address: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!("Listening for interactions on http://{}/interactions", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
