use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job kinds understood by the transport registry.
pub const KIND_EMAIL: &str = "email";
pub const KIND_WEBHOOK: &str = "webhook";

/// One queued unit of outbound work, tracked through
/// pending -> processing -> sent | failed.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DeliveryJob {
    pub id: Uuid,
    pub kind: String,
    pub destination: String,
    pub template_id: Option<Uuid>,
    pub variables: serde_json::Value,
    pub payload: Option<serde_json::Value>,
    pub status: String,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Fields a producer supplies when enqueuing a job.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDeliveryJob {
    pub kind: String,
    pub destination: String,
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub variables: Option<serde_json::Value>,
    pub payload: Option<serde_json::Value>,
}

impl NewDeliveryJob {
    pub fn email(destination: &str, template_id: Uuid, variables: serde_json::Value) -> Self {
        Self {
            kind: KIND_EMAIL.to_string(),
            destination: destination.to_string(),
            template_id: Some(template_id),
            variables: Some(variables),
            payload: None,
        }
    }

    pub fn webhook(destination: &str, payload: serde_json::Value) -> Self {
        Self {
            kind: KIND_WEBHOOK.to_string(),
            destination: destination.to_string(),
            template_id: None,
            variables: None,
            payload: Some(payload),
        }
    }
}
