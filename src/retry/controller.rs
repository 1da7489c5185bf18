//! Retry controller wrapping a single async operation

use super::{run_with_backoff, RetryError, RetryPolicy};
use std::future::Future;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Observable state of a [`RetryController`]
#[derive(Debug, Clone)]
pub struct RetryState<T> {
    pub data: Option<T>,
    pub error: Option<RetryError>,
    pub is_loading: bool,
    /// Retries performed in the current or last execution
    pub attempt: u32,
    /// True once an execution has ended in error
    pub can_retry: bool,
}

impl<T> Default for RetryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            attempt: 0,
            can_retry: false,
        }
    }
}

type RetryObserver = Box<dyn FnMut(u32, &anyhow::Error) + Send>;

/// Runs an operation with retries and publishes its state.
///
/// Cancellation applies to the execution in progress: a token cancelled
/// while nothing runs is replaced at the next [`execute`](Self::execute).
pub struct RetryController<T, F> {
    operation: F,
    policy: RetryPolicy,
    state: watch::Sender<RetryState<T>>,
    cancel: CancellationToken,
    on_retry: Option<RetryObserver>,
}

impl<T, F, Fut> RetryController<T, F>
where
    T: Clone,
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    pub fn new(operation: F, policy: RetryPolicy) -> Self {
        let (state, _) = watch::channel(RetryState::default());
        Self {
            operation,
            policy,
            state,
            cancel: CancellationToken::new(),
            on_retry: None,
        }
    }

    /// Called before each retry with the retry number and the triggering error
    pub fn on_retry(mut self, observer: impl FnMut(u32, &anyhow::Error) + Send + 'static) -> Self {
        self.on_retry = Some(Box::new(observer));
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RetryState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<RetryState<T>> {
        self.state.subscribe()
    }

    /// Token that stops the current execution when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the operation, retrying on failure. Returns the value on success;
    /// on failure the error is kept in the state and `None` is returned.
    pub async fn execute(&mut self) -> Option<T> {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        self.state.send_replace(RetryState {
            is_loading: true,
            ..Default::default()
        });

        let operation = &mut self.operation;
        let state = &self.state;
        let on_retry = &mut self.on_retry;
        let result = run_with_backoff(
            &self.policy,
            &self.cancel,
            |_| operation(),
            |attempt, err, _| {
                state.send_modify(|s| s.attempt = attempt);
                if let Some(observer) = on_retry.as_mut() {
                    observer(attempt, err);
                }
            },
        )
        .await;

        match result {
            Ok(value) => {
                self.state.send_modify(|s| {
                    s.data = Some(value.clone());
                    s.error = None;
                    s.is_loading = false;
                    s.can_retry = false;
                });
                Some(value)
            }
            Err(err) => {
                self.state.send_modify(|s| {
                    if let RetryError::Exhausted { attempts, .. } = &err {
                        s.attempt = s.attempt.max(*attempts);
                    }
                    s.error = Some(err);
                    s.is_loading = false;
                    s.can_retry = true;
                });
                None
            }
        }
    }

    /// Start a fresh execution after a failure, from a reset state
    pub async fn retry(&mut self) -> Option<T> {
        self.reset();
        self.execute().await
    }

    /// Back to the initial state. A token handed out earlier keeps working
    /// unless it was already cancelled.
    pub fn reset(&mut self) {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.state.send_replace(RetryState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_operation_runs_four_times() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = calls.clone();
        let mut controller = RetryController::new(
            move || {
                recorder.lock().unwrap().push(Instant::now());
                async { Err::<(), _>(anyhow!("Failed to fetch")) }
            },
            RetryPolicy::default(),
        );

        let result = controller.execute().await;
        assert_eq!(result, None);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );

        let state = controller.state();
        assert!(!state.is_loading);
        assert!(state.can_retry);
        assert!(state.data.is_none());
        assert_eq!(state.attempt, 4);
        assert_eq!(
            state.error.map(|e| e.user_message()),
            Some("Tidak dapat terhubung ke server. Periksa koneksi internet Anda.".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_error_and_stores_data() {
        let mut failures_left = 1;
        let mut controller = RetryController::new(
            move || {
                let fail = failures_left > 0;
                failures_left -= 1;
                async move {
                    if fail {
                        Err(anyhow!("timeout"))
                    } else {
                        Ok(vec!["7A".to_string(), "7B".to_string()])
                    }
                }
            },
            RetryPolicy::default(),
        );

        let result = controller.execute().await;
        assert_eq!(result, Some(vec!["7A".to_string(), "7B".to_string()]));

        let state = controller.state();
        assert!(state.error.is_none());
        assert!(!state.can_retry);
        assert_eq!(state.attempt, 1);
        assert_eq!(state.data.map(|d| d.len()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_retry_sees_increasing_attempts() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut controller = RetryController::new(
            || async { Err::<(), _>(anyhow!("boom")) },
            RetryPolicy {
                max_retries: 2,
                ..Default::default()
            },
        )
        .on_retry(move |attempt, err| sink.lock().unwrap().push((attempt, err.to_string())));

        controller.execute().await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, "boom".to_string()), (2, "boom".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_observes_loading() {
        let mut controller = RetryController::new(
            || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(1)
            },
            RetryPolicy::default(),
        );
        let mut rx = controller.subscribe();
        assert!(!rx.borrow_and_update().is_loading);

        let watcher = tokio::spawn(async move {
            rx.changed().await.unwrap();
            rx.borrow_and_update().is_loading
        });

        assert_eq!(controller.execute().await, Some(1));
        assert!(watcher.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let mut controller = RetryController::new(
            || async { Err::<(), _>(anyhow!("Failed to fetch")) },
            RetryPolicy::default(),
        );
        let token = controller.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            token.cancel();
        });

        assert_eq!(controller.execute().await, None);
        let state = controller.state();
        assert!(matches!(state.error, Some(RetryError::Cancelled)));
        assert_eq!(state.attempt, 2);
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_cancel_runs_again() {
        let mut calls = 0;
        let mut controller = RetryController::new(
            move || {
                calls += 1;
                let n = calls;
                async move { Ok(n) }
            },
            RetryPolicy::default(),
        );
        controller.cancellation_token().cancel();
        assert_eq!(controller.retry().await, Some(1));
        assert_eq!(controller.retry().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_starts_from_zero_attempts() {
        let mut failures_left = 2;
        let mut controller = RetryController::new(
            move || {
                let fail = failures_left > 0;
                failures_left -= 1;
                async move {
                    if fail {
                        Err(anyhow!("Failed to fetch"))
                    } else {
                        Ok("siswa")
                    }
                }
            },
            RetryPolicy {
                max_retries: 1,
                ..Default::default()
            },
        );
        assert_eq!(controller.execute().await, None);
        assert_eq!(controller.state().attempt, 2);

        let mut rx = controller.subscribe();
        assert_eq!(controller.retry().await, Some("siswa"));
        assert!(rx.has_changed().unwrap());
        let state = controller.state();
        assert_eq!(state.attempt, 0);
        assert!(state.error.is_none());
        assert!(!state.can_retry);
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let mut controller = RetryController::new(
            || async { Err::<(), _>(anyhow!("boom")) },
            RetryPolicy {
                max_retries: 0,
                ..Default::default()
            },
        );
        controller.execute().await;
        assert!(controller.state().can_retry);

        let token = controller.cancellation_token();
        controller.reset();
        let state = controller.state();
        assert!(state.error.is_none());
        assert!(!state.can_retry);
        assert_eq!(state.attempt, 0);
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_taken_before_retry_cancels_it() {
        let mut controller = RetryController::new(
            || async { Err::<(), _>(anyhow!("Failed to fetch")) },
            RetryPolicy::default(),
        );
        let token = controller.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            token.cancel();
        });

        assert_eq!(controller.retry().await, None);
        assert!(matches!(
            controller.state().error,
            Some(RetryError::Cancelled)
        ));
    }
}
