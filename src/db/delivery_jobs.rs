use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{DeliveryJob, NewDeliveryJob};

pub async fn enqueue(pool: &PgPool, job: &NewDeliveryJob) -> Result<DeliveryJob, sqlx::Error> {
    sqlx::query_as::<_, DeliveryJob>(
        "INSERT INTO delivery_jobs (kind, destination, template_id, variables, payload)
         VALUES ($1, $2, $3, COALESCE($4, '{}'::jsonb), $5) RETURNING *",
    )
    .bind(&job.kind)
    .bind(&job.destination)
    .bind(job.template_id)
    .bind(&job.variables)
    .bind(&job.payload)
    .fetch_one(pool)
    .await
}

/// Atomically claim a batch of eligible jobs using FOR UPDATE SKIP LOCKED.
/// Claimed rows move to 'processing' in the same statement, so two
/// concurrent callers can never receive the same job.
pub async fn claim_batch(
    pool: &PgPool,
    limit: i64,
    max_retries: i32,
) -> Result<Vec<DeliveryJob>, sqlx::Error> {
    sqlx::query_as::<_, DeliveryJob>(
        "UPDATE delivery_jobs SET status = 'processing', claimed_at = now()
         WHERE id IN (
             SELECT id FROM delivery_jobs
             WHERE status = 'pending'
               AND (next_retry_at IS NULL OR next_retry_at <= now())
               AND retry_count < $2
             ORDER BY created_at ASC
             LIMIT $1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(limit)
    .bind(max_retries)
    .fetch_all(pool)
    .await
}

/// Idempotent: only a 'processing' row transitions, so a repeated call
/// against an already-sent job is a no-op.
pub async fn mark_sent(
    pool: &PgPool,
    id: Uuid,
    sent_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE delivery_jobs SET status = 'sent', sent_at = $2, error_message = NULL
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(sent_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Return the job to 'pending' with updated retry metadata.
pub async fn mark_retry(
    pool: &PgPool,
    id: Uuid,
    retry_count: i32,
    next_retry_at: DateTime<Utc>,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE delivery_jobs
         SET status = 'pending', retry_count = $2, next_retry_at = $3, error_message = $4
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(retry_count)
    .bind(next_retry_at)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Terminal failure. The row is kept for audit, never deleted.
pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE delivery_jobs
         SET status = 'failed', error_message = $2, next_retry_at = NULL
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(())
}

/// Recover rows stuck in 'processing' after a worker crash. Rows with
/// retries remaining go back to 'pending' with retry_count + 1 and are
/// immediately eligible; exhausted rows become 'failed'. Returns the
/// number of rows touched.
pub async fn requeue_stuck(
    pool: &PgPool,
    older_than_secs: u64,
    max_retries: i32,
) -> Result<u64, sqlx::Error> {
    let failed = sqlx::query(
        "UPDATE delivery_jobs
         SET status = 'failed',
             retry_count = retry_count + 1,
             next_retry_at = NULL,
             error_message = 'Worker crashed while processing'
         WHERE id IN (
             SELECT id FROM delivery_jobs
             WHERE status = 'processing'
               AND claimed_at < now() - make_interval(secs => $1::double precision)
               AND retry_count + 1 >= $2
             FOR UPDATE SKIP LOCKED
         )",
    )
    .bind(older_than_secs as f64)
    .bind(max_retries)
    .execute(pool)
    .await?
    .rows_affected();

    let requeued = sqlx::query(
        "UPDATE delivery_jobs
         SET status = 'pending',
             retry_count = retry_count + 1,
             next_retry_at = now(),
             error_message = 'Requeued after stuck processing'
         WHERE id IN (
             SELECT id FROM delivery_jobs
             WHERE status = 'processing'
               AND claimed_at < now() - make_interval(secs => $1::double precision)
               AND retry_count + 1 < $2
             FOR UPDATE SKIP LOCKED
         )",
    )
    .bind(older_than_secs as f64)
    .bind(max_retries)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(failed + requeued)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<DeliveryJob>, sqlx::Error> {
    sqlx::query_as::<_, DeliveryJob>("SELECT * FROM delivery_jobs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
