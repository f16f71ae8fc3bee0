pub mod worker;

use axum::routing::{options, post};
use axum::Router;

use crate::state::SharedState;

pub fn worker_routes() -> Router<SharedState> {
    Router::new()
        .route("/v1/worker/run", post(worker::run))
        .route("/v1/worker/run", options(worker::run_options))
}
