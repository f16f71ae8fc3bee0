pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod render;
pub mod routes;
pub mod state;
pub mod transport;
pub mod worker;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use sqlx::PgPool;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;
use crate::rate_limit::TriggerRateLimiter;
use crate::state::{AppState, SharedState};
use crate::transport::email::EmailTransport;
use crate::transport::webhook::WebhookTransport;
use crate::transport::TransportRegistry;

pub fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    // Transports are built once and reused across batches.
    let mut transports = TransportRegistry::new();
    transports.register(Arc::new(WebhookTransport::new()));

    if let Some(smtp) = config.smtp.as_ref() {
        match EmailTransport::new(smtp) {
            Ok(transport) => {
                tracing::info!("SMTP transport configured");
                transports.register(Arc::new(transport));
            }
            Err(e) => {
                tracing::warn!("SMTP transport not available: {e}");
            }
        }
    }

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        transports,
        trigger_limiter: TriggerRateLimiter::new(),
    });

    let app = Router::new()
        .merge(routes::worker_routes())
        .route("/health", axum::routing::get(health))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state.clone());

    (app, state)
}

async fn health() -> &'static str {
    "ok"
}
