use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub worker_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub batch_size: i64,
    pub max_retries: i32,
    pub stuck_after_secs: u64,
    pub sweep_interval_secs: u64,
    pub trigger_rate_limit: u32,
    pub trigger_rate_window_secs: u64,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let worker_secret = env_required("COURIER_WORKER_SECRET")?;

        let host: IpAddr = env_or("COURIER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid COURIER_HOST: {e}"))?;

        let port: u16 = env_or("COURIER_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid COURIER_PORT: {e}"))?;

        let batch_size: i64 = env_or("COURIER_BATCH_SIZE", "10")
            .parse()
            .map_err(|e| format!("Invalid COURIER_BATCH_SIZE: {e}"))?;

        let max_retries: i32 = env_or("COURIER_MAX_RETRIES", "3")
            .parse()
            .map_err(|e| format!("Invalid COURIER_MAX_RETRIES: {e}"))?;

        let stuck_after_secs: u64 = env_or("COURIER_STUCK_AFTER_SECS", "600")
            .parse()
            .map_err(|e| format!("Invalid COURIER_STUCK_AFTER_SECS: {e}"))?;

        let sweep_interval_secs: u64 = env_or("COURIER_SWEEP_INTERVAL_SECS", "300")
            .parse()
            .map_err(|e| format!("Invalid COURIER_SWEEP_INTERVAL_SECS: {e}"))?;

        let trigger_rate_limit: u32 = env_or("COURIER_TRIGGER_RATE_LIMIT", "60")
            .parse()
            .map_err(|e| format!("Invalid COURIER_TRIGGER_RATE_LIMIT: {e}"))?;

        let trigger_rate_window_secs: u64 = env_or("COURIER_TRIGGER_RATE_WINDOW_SECS", "60")
            .parse()
            .map_err(|e| format!("Invalid COURIER_TRIGGER_RATE_WINDOW_SECS: {e}"))?;

        let log_level = env_or("COURIER_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("COURIER_SMTP_HOST").ok(),
            std::env::var("COURIER_SMTP_PORT").ok(),
            std::env::var("COURIER_SMTP_USER").ok(),
            std::env::var("COURIER_SMTP_PASS").ok(),
            std::env::var("COURIER_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid COURIER_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            worker_secret,
            host,
            port,
            batch_size,
            max_retries,
            stuck_after_secs,
            sweep_interval_secs,
            trigger_rate_limit,
            trigger_rate_window_secs,
            log_level,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
