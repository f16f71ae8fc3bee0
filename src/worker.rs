use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;

use crate::db;
use crate::error::AppError;
use crate::models::delivery_job::{KIND_EMAIL, KIND_WEBHOOK};
use crate::models::DeliveryJob;
use crate::render;
use crate::state::SharedState;
use crate::transport::{OutboundMessage, TransportError};

/// Delay before a failed job becomes eligible again, per attempt.
/// Linear: attempt N waits N * 15 minutes.
const RETRY_BACKOFF_MINUTES: i64 = 15;

/// Upper bound on a single transport send.
const SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
}

enum JobOutcome {
    Sent,
    Retried,
    Failed,
}

/// Drain one batch of eligible jobs. Invoked by the HTTP trigger; holds no
/// state between invocations, so overlapping calls coordinate purely
/// through the claim in the store.
///
/// Only a failure of the claim itself is an invocation-level error. Every
/// per-job failure becomes a state transition plus an audit event, and one
/// job's failure never aborts the rest of the batch.
pub async fn run_batch(state: &SharedState) -> Result<BatchOutcome, AppError> {
    let jobs = db::delivery_jobs::claim_batch(
        &state.pool,
        state.config.batch_size,
        state.config.max_retries,
    )
    .await?;

    let mut outcome = BatchOutcome {
        claimed: jobs.len(),
        ..Default::default()
    };

    if jobs.is_empty() {
        return Ok(outcome);
    }

    tracing::debug!("Claimed {} delivery jobs", jobs.len());

    for job in &jobs {
        match process_job(state, job).await {
            JobOutcome::Sent => outcome.sent += 1,
            JobOutcome::Retried => outcome.retried += 1,
            JobOutcome::Failed => outcome.failed += 1,
        }
    }

    tracing::info!(
        "Batch done: {} sent, {} retried, {} failed",
        outcome.sent,
        outcome.retried,
        outcome.failed
    );

    Ok(outcome)
}

async fn process_job(state: &SharedState, job: &DeliveryJob) -> JobOutcome {
    tracing::debug!(
        "Processing job {} (kind={}, destination={}, retry_count={})",
        job.id,
        job.kind,
        job.destination,
        job.retry_count
    );

    // A render failure is a send failure for this job, not a worker crash.
    let message = match build_message(state, job).await {
        Ok(message) => message,
        Err(e) => return record_failure(state, job, &e.message).await,
    };

    let transport = match state.transports.get(&job.kind) {
        Some(transport) => transport,
        None => {
            let error = format!("No transport registered for kind '{}'", job.kind);
            return record_failure(state, job, &error).await;
        }
    };

    match tokio::time::timeout(SEND_TIMEOUT, transport.send(&job.destination, &message)).await {
        Ok(Ok(())) => record_sent(state, job).await,
        Ok(Err(e)) => record_failure(state, job, &e.message).await,
        Err(_) => {
            let error = format!("Send timed out after {}s", SEND_TIMEOUT.as_secs());
            record_failure(state, job, &error).await
        }
    }
}

/// Build the outbound message for a job: email jobs load and render their
/// template, webhook jobs carry their raw payload.
async fn build_message(
    state: &SharedState,
    job: &DeliveryJob,
) -> Result<OutboundMessage, TransportError> {
    match job.kind.as_str() {
        KIND_EMAIL => {
            let template_id = job
                .template_id
                .ok_or_else(|| TransportError::from("Email job has no template_id"))?;

            let template = db::templates::find_by_id(&state.pool, template_id)
                .await
                .map_err(|e| TransportError::from(format!("Failed to load template: {e}")))?
                .ok_or_else(|| {
                    TransportError::from(format!("Template {template_id} not found"))
                })?;

            Ok(OutboundMessage::Email(render::render(
                &template,
                &job.variables,
            )))
        }
        KIND_WEBHOOK => {
            let payload = job
                .payload
                .clone()
                .ok_or_else(|| TransportError::from("Webhook job has no payload"))?;
            Ok(OutboundMessage::Webhook(payload))
        }
        other => Err(TransportError::from(format!("Unknown job kind '{other}'"))),
    }
}

async fn record_sent(state: &SharedState, job: &DeliveryJob) -> JobOutcome {
    if let Err(e) = db::delivery_jobs::mark_sent(&state.pool, job.id, Utc::now()).await {
        // The row stays 'processing'; the sweep will recover it.
        tracing::warn!("Failed to mark job {} sent: {e}", job.id);
    }

    let _ = db::audit::record(
        &state.pool,
        "DELIVERY_EVENT",
        Some(json!({
            "event_type": "sent",
            "job_id": job.id,
            "destination": job.destination,
        })),
    )
    .await;

    JobOutcome::Sent
}

/// All transport and render failures are treated uniformly as retryable:
/// the job goes back to 'pending' with a backoff until the retry budget is
/// spent, then becomes 'failed' permanently.
async fn record_failure(state: &SharedState, job: &DeliveryJob, error: &str) -> JobOutcome {
    let new_retry_count = job.retry_count + 1;

    if new_retry_count < state.config.max_retries {
        let next_retry_at = Utc::now() + backoff_delay(new_retry_count);
        if let Err(e) = db::delivery_jobs::mark_retry(
            &state.pool,
            job.id,
            new_retry_count,
            next_retry_at,
            error,
        )
        .await
        {
            tracing::warn!("Failed to mark job {} for retry: {e}", job.id);
        }

        let _ = db::audit::record(
            &state.pool,
            "DELIVERY_EVENT",
            Some(json!({
                "event_type": "failed",
                "job_id": job.id,
                "destination": job.destination,
                "error": error,
                "retry_count": new_retry_count,
            })),
        )
        .await;

        JobOutcome::Retried
    } else {
        if let Err(e) = db::delivery_jobs::mark_failed(&state.pool, job.id, error).await {
            tracing::warn!("Failed to mark job {} failed: {e}", job.id);
        }

        let _ = db::audit::record(
            &state.pool,
            "DELIVERY_EVENT",
            Some(json!({
                "event_type": "failed",
                "job_id": job.id,
                "destination": job.destination,
                "error": error,
                "retry_count": new_retry_count,
                "exhausted": true,
            })),
        )
        .await;

        tracing::warn!("Job {} failed permanently: {error}", job.id);
        JobOutcome::Failed
    }
}

fn backoff_delay(retry_count: i32) -> Duration {
    Duration::minutes(retry_count as i64 * RETRY_BACKOFF_MINUTES)
}

/// Recover jobs stuck in 'processing' past the configured timeout.
/// Scheduled independently of the trigger; uses the same locked-claim
/// primitive as the worker, so it is safe next to live invocations.
pub async fn sweep(state: &SharedState) {
    match db::delivery_jobs::requeue_stuck(
        &state.pool,
        state.config.stuck_after_secs,
        state.config.max_retries,
    )
    .await
    {
        Ok(0) => {}
        Ok(touched) => {
            tracing::info!("Requeued {touched} stuck delivery jobs");
            let _ = db::audit::record(
                &state.pool,
                "WORKER_SWEEP",
                Some(json!({
                    "event_type": "requeued_stuck",
                    "count": touched,
                })),
            )
            .await;
        }
        Err(e) => {
            tracing::error!("Stuck-job sweep failed: {e}");
        }
    }

    state
        .trigger_limiter
        .cleanup(std::time::Duration::from_secs(
            state.config.trigger_rate_window_secs * 2,
        ));
}
