//! Retry with exponential backoff
//!
//! This module provides:
//! - A retry policy (max retries, initial delay, multiplier; no jitter)
//! - A bounded retry loop with cancellation between attempts
//! - A controller exposing retry state for the UI
//! - An upload variant tracking status and progress
//! - Classification of errors into user-facing messages

mod classifier;
mod controller;
mod upload;

pub use classifier::{
    classify, is_connection_error, user_friendly_error, ErrorInfo, Matcher, DEFAULT_MESSAGE,
};
pub use controller::{RetryController, RetryState};
pub use upload::{ProgressReporter, UploadController, UploadState, UploadStatus};

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry
    pub retry_delay: Duration,
    /// Growth factor of the wait between consecutive retries
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt` (1-indexed):
    /// `retry_delay * backoff_multiplier^(attempt - 1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(self.retry_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }
}

/// Retry error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetryError {
    /// Every attempt failed; holds the error of the last one
    #[error("Operation failed after {attempts} attempts: {last_error:#}")]
    Exhausted {
        attempts: u32,
        last_error: Arc<anyhow::Error>,
    },

    /// Cancellation was requested before the operation succeeded
    #[error("Operation cancelled")]
    Cancelled,
}

impl RetryError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            RetryError::Exhausted { last_error, .. } => user_friendly_error(last_error),
            RetryError::Cancelled => "Permintaan dibatalkan.".to_string(),
        }
    }

    pub fn is_connection_error(&self) -> bool {
        match self {
            RetryError::Exhausted { last_error, .. } => is_connection_error(last_error),
            RetryError::Cancelled => false,
        }
    }
}

/// Run `operation` until it succeeds, retrying up to `policy.max_retries`
/// times with exponential backoff.
///
/// `operation` receives the number of failures so far. `on_retry` is called
/// with the retry number, the error that triggered it and the wait before
/// the retry. The token is checked before every attempt and interrupts the
/// backoff wait.
pub async fn run_with_backoff<T, F, Fut, R>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    R: FnMut(u32, &anyhow::Error, Duration),
{
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let err = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt = attempt.saturating_add(1);
        if attempt > policy.max_retries {
            tracing::warn!("Giving up after {attempt} attempts: {err:#}");
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last_error: Arc::new(err),
            });
        }

        let delay = policy.delay_for(attempt);
        tracing::debug!("Attempt {attempt} failed, retrying in {delay:?}: {err:#}");
        on_retry(attempt, &err, delay);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
        }
    }
}
