use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use toolgate_types::{ConfigError, ErrorCategory, RetryConfig};

use super::backoff;
use super::category::{classify_error, classify_status, OperationError, RetryableResponse};
use super::result::{RetryAttempt, RetryEvent, RetryResult};
use crate::metrics;

/// Classified outcome of a single attempt.
struct Evaluation<R> {
    category: Option<ErrorCategory>,
    status_code: Option<u16>,
    message: Option<String>,
    retry_after: Option<String>,
    response: Option<R>,
}

impl<R: RetryableResponse> Evaluation<R> {
    fn from_outcome(outcome: Result<R, OperationError>) -> Self {
        match outcome {
            Ok(response) => {
                let status = response.status_code();
                let category = classify_status(status);
                Self {
                    category,
                    status_code: Some(status),
                    message: category.map(|_| format!("HTTP {}", status)),
                    retry_after: response.retry_after().map(str::to_string),
                    response: Some(response),
                }
            },
            Err(e) => Self {
                category: Some(classify_error(&e)),
                status_code: None,
                message: Some(e.message),
                retry_after: None,
                response: None,
            },
        }
    }
}

fn finished(attempt_started: Instant) -> (DateTime<Utc>, u64) {
    (Utc::now(), attempt_started.elapsed().as_millis() as u64)
}

/// Runs an async operation with classification, backoff and an attempt trail.
///
/// The engine never returns an error for a failed operation: exhaustion and
/// non-retryable failures come back as `RetryResult { success: false, .. }`.
#[derive(Debug, Clone)]
pub struct RetryEngine {
    config: RetryConfig,
}

impl RetryEngine {
    pub fn new(config: RetryConfig) -> Result<Self, ConfigError> {
        config.validate_config()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` up to `max_retries + 1` times.
    ///
    /// `on_retry` fires once per failed attempt, before any sleep.
    pub async fn retry_async<R, F, Fut, C>(&self, operation: F, on_retry: C) -> RetryResult<R>
    where
        R: RetryableResponse,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, OperationError>>,
        C: FnMut(&RetryEvent<'_>),
    {
        self.run(operation, on_retry, None).await
    }

    /// Like [`retry_async`](Self::retry_async) with an overall deadline.
    ///
    /// When the deadline passes mid-attempt, that attempt is recorded as
    /// `Timeout` and the trail is returned with `timed_out = true`. A retry
    /// whose delay would end past the deadline is not started.
    pub async fn retry_with_deadline<R, F, Fut, C>(
        &self,
        operation: F,
        deadline: Duration,
        on_retry: C,
    ) -> RetryResult<R>
    where
        R: RetryableResponse,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, OperationError>>,
        C: FnMut(&RetryEvent<'_>),
    {
        let deadline_at = tokio::time::Instant::now() + deadline;
        self.run(operation, on_retry, Some(deadline_at)).await
    }

    async fn run<R, F, Fut, C>(
        &self,
        mut operation: F,
        mut on_retry: C,
        deadline: Option<tokio::time::Instant>,
    ) -> RetryResult<R>
    where
        R: RetryableResponse,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, OperationError>>,
        C: FnMut(&RetryEvent<'_>),
    {
        let started = Instant::now();
        let mut attempts: Vec<RetryAttempt> = Vec::new();
        let mut response: Option<R> = None;
        let mut error: Option<String> = None;
        let mut success = false;
        let mut timed_out = false;
        let mut delay_before = Duration::ZERO;

        for attempt in 0..=self.config.max_retries {
            let started_at = Utc::now();
            let attempt_started = Instant::now();

            let outcome = match deadline {
                Some(at) => tokio::time::timeout_at(at, operation()).await.ok(),
                None => Some(operation().await),
            };
            let Some(outcome) = outcome else {
                let (ended_at, duration_ms) = finished(attempt_started);
                let message = "overall deadline exceeded".to_string();
                attempts.push(RetryAttempt {
                    attempt_number: attempt + 1,
                    started_at,
                    ended_at,
                    duration_ms,
                    success: false,
                    category: Some(ErrorCategory::Timeout),
                    message: Some(message.clone()),
                    status_code: None,
                    delay_before_ms: delay_before.as_millis() as u64,
                });
                metrics::record_retry_attempt(Some(ErrorCategory::Timeout), false);
                tracing::warn!(attempt = attempt + 1, "Deadline exceeded during attempt");
                error = Some(message);
                timed_out = true;
                break;
            };

            let evaluation = Evaluation::from_outcome(outcome);
            let (ended_at, duration_ms) = finished(attempt_started);
            attempts.push(RetryAttempt {
                attempt_number: attempt + 1,
                started_at,
                ended_at,
                duration_ms,
                success: evaluation.category.is_none(),
                category: evaluation.category,
                message: evaluation.message.clone(),
                status_code: evaluation.status_code,
                delay_before_ms: delay_before.as_millis() as u64,
            });
            metrics::record_retry_attempt(evaluation.category, evaluation.category.is_none());
            if evaluation.response.is_some() {
                response = evaluation.response;
            }

            let Some(category) = evaluation.category else {
                success = true;
                error = None;
                break;
            };
            error = evaluation.message;

            let retryable = attempt < self.config.max_retries
                && self.config.is_retryable(category, evaluation.status_code);
            let next_delay = retryable.then(|| {
                backoff::next_delay(&self.config, attempt, evaluation.retry_after.as_deref())
            });

            if let Some(last) = attempts.last() {
                on_retry(&RetryEvent { attempt: last, next_delay });
            }

            let Some(delay) = next_delay else {
                tracing::debug!(
                    attempt = attempt + 1,
                    category = %category,
                    status = ?evaluation.status_code,
                    "Attempt failed, not retrying"
                );
                break;
            };

            if deadline.is_some_and(|at| tokio::time::Instant::now() + delay >= at) {
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Next retry would pass the deadline, giving up"
                );
                timed_out = true;
                break;
            }

            tracing::debug!(
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                category = %category,
                status = ?evaluation.status_code,
                delay_ms = delay.as_millis() as u64,
                "Attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            delay_before = delay;
        }

        let result = RetryResult {
            attempts,
            success,
            response,
            error,
            total_duration_ms: started.elapsed().as_millis() as u64,
            timed_out,
        };
        if !result.success {
            tracing::info!(
                attempts = result.total_attempts(),
                final_status = ?result.final_status_code(),
                error = result.final_error().unwrap_or("unknown"),
                timed_out = result.timed_out,
                "Operation failed after retries"
            );
        }
        result
    }
}

/// One-shot helper: validate `config` and run `operation` under it.
pub async fn retry_async<R, F, Fut, C>(
    operation: F,
    config: &RetryConfig,
    on_retry: C,
) -> Result<RetryResult<R>, ConfigError>
where
    R: RetryableResponse,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, OperationError>>,
    C: FnMut(&RetryEvent<'_>),
{
    let engine = RetryEngine::new(config.clone())?;
    Ok(engine.retry_async(operation, on_retry).await)
}
