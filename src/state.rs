use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::rate_limit::TriggerRateLimiter;
use crate::transport::TransportRegistry;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub transports: TransportRegistry,
    pub trigger_limiter: TriggerRateLimiter,
}
