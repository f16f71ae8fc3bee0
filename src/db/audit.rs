use sqlx::PgPool;

use crate::models::AuditEvent;

/// Record a structured audit event. Callers on the delivery path invoke
/// this best-effort: an audit failure must never fail the batch.
pub async fn record(
    pool: &PgPool,
    action: &str,
    metadata: Option<serde_json::Value>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO audit_events (action, metadata) VALUES ($1, $2)")
        .bind(action)
        .bind(metadata)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    sqlx::query_as::<_, AuditEvent>(
        "SELECT * FROM audit_events ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
