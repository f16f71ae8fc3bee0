use sqlx::PgPool;
use uuid::Uuid;

use crate::models::MessageTemplate;

pub async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<MessageTemplate>, sqlx::Error> {
    sqlx::query_as::<_, MessageTemplate>("SELECT * FROM message_templates WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    name: &str,
    subject: &str,
    body_html: &str,
    body_text: &str,
) -> Result<MessageTemplate, sqlx::Error> {
    sqlx::query_as::<_, MessageTemplate>(
        "INSERT INTO message_templates (name, subject, body_html, body_text)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(name)
    .bind(subject)
    .bind(body_html)
    .bind(body_text)
    .fetch_one(pool)
    .await
}
