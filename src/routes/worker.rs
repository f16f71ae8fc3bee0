use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::SharedState;
use crate::worker;

/// Trigger one worker invocation. Empty body; authorized by the shared
/// worker secret. A 200 covers the nothing-to-do case; only store
/// unavailability during claiming surfaces as a 5xx.
pub async fn run(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<worker::BatchOutcome>, AppError> {
    if let Err(err) = authorize(&state, &headers) {
        let _ = crate::db::audit::record(
            &state.pool,
            "SECURITY_EVENT",
            Some(json!({
                "event_type": "worker_trigger_unauthorized",
                "ip": addr.ip().to_string(),
            })),
        )
        .await;
        return Err(err);
    }

    state
        .trigger_limiter
        .check(
            addr.ip(),
            state.config.trigger_rate_limit,
            state.config.trigger_rate_window_secs,
        )
        .map_err(|retry_after| {
            AppError::RateLimited(format!("Try again in {retry_after}s"))
        })?;

    let outcome = worker::run_batch(&state).await?;
    Ok(Json(outcome))
}

/// Preflight for cross-origin tooling.
pub async fn run_options() -> StatusCode {
    StatusCode::OK
}

fn authorize(state: &SharedState, headers: &HeaderMap) -> Result<(), AppError> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if bool::from(
        token
            .as_bytes()
            .ct_eq(state.config.worker_secret.as_bytes()),
    ) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid worker secret".to_string()))
    }
}
