//! File upload with retries and progress

use super::{run_with_backoff, RetryError, RetryPolicy};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Upload lifecycle: idle → uploading → (retrying ⇄ uploading)* → success | error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Retrying {
        attempt: u32,
    },
    Success,
    Error,
}

impl UploadStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, UploadStatus::Uploading | UploadStatus::Retrying { .. })
    }

    pub fn label(&self) -> String {
        match self {
            UploadStatus::Idle => "Siap".to_string(),
            UploadStatus::Uploading => "Mengunggah...".to_string(),
            UploadStatus::Retrying { attempt } => format!("Mencoba ulang ({attempt})..."),
            UploadStatus::Success => "Berhasil diunggah".to_string(),
            UploadStatus::Error => "Gagal mengunggah".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub status: UploadStatus,
    /// Percentage, 0–100
    pub progress: u8,
    pub error: Option<RetryError>,
}

/// Handle passed to each upload attempt for reporting progress
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    state: Arc<watch::Sender<UploadState>>,
}

impl ProgressReporter {
    /// Report progress; values above 100 are clamped
    pub fn report(&self, percent: u8) {
        self.state.send_modify(|s| s.progress = percent.min(100));
    }
}

/// Uploads with retries, tracking status and progress
#[derive(Debug)]
pub struct UploadController {
    policy: RetryPolicy,
    state: Arc<watch::Sender<UploadState>>,
    cancel: CancellationToken,
}

impl UploadController {
    pub fn new(policy: RetryPolicy) -> Self {
        let (state, _) = watch::channel(UploadState::default());
        Self {
            policy,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run `upload`, retrying on failure. Each attempt starts from zero
    /// progress and gets a reporter for its own progress.
    pub async fn upload<T, F, Fut>(&mut self, mut upload: F) -> Option<T>
    where
        F: FnMut(ProgressReporter) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        let state = self.state.clone();
        let reporter = ProgressReporter {
            state: self.state.clone(),
        };
        let result = run_with_backoff(
            &self.policy,
            &self.cancel,
            |_| {
                state.send_modify(|s| {
                    s.status = UploadStatus::Uploading;
                    s.progress = 0;
                    s.error = None;
                });
                upload(reporter.clone())
            },
            |attempt, _, _| {
                state.send_modify(|s| s.status = UploadStatus::Retrying { attempt });
            },
        )
        .await;

        match result {
            Ok(value) => {
                self.state.send_modify(|s| {
                    s.status = UploadStatus::Success;
                    s.progress = 100;
                });
                Some(value)
            }
            Err(err) => {
                tracing::error!("Upload failed: {err}");
                self.state.send_modify(|s| {
                    s.status = UploadStatus::Error;
                    s.error = Some(err);
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[test]
    fn test_progress_is_clamped() {
        let controller = UploadController::new(RetryPolicy::default());
        let reporter = ProgressReporter {
            state: controller.state.clone(),
        };
        reporter.report(250);
        assert_eq!(controller.state().progress, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_sequence_through_retry() {
        let mut controller = UploadController::new(RetryPolicy::default());
        let mut rx = controller.subscribe();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = statuses.clone();
        let watcher = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let status = rx.borrow_and_update().status;
                let mut seen = sink.lock().unwrap();
                if seen.last() != Some(&status) {
                    seen.push(status);
                }
            }
        });

        let mut attempts = 0;
        let url = controller
            .upload(|progress| {
                attempts += 1;
                let fail = attempts == 1;
                async move {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    progress.report(50);
                    if fail {
                        Err(anyhow!("Failed to fetch"))
                    } else {
                        Ok("https://cdn.example/lampiran.pdf".to_string())
                    }
                }
            })
            .await;

        assert_eq!(url.as_deref(), Some("https://cdn.example/lampiran.pdf"));
        let state = controller.state();
        assert_eq!(state.status, UploadStatus::Success);
        assert_eq!(state.progress, 100);

        drop(controller);
        watcher.await.unwrap();
        assert_eq!(
            *statuses.lock().unwrap(),
            vec![
                UploadStatus::Uploading,
                UploadStatus::Retrying { attempt: 1 },
                UploadStatus::Uploading,
                UploadStatus::Success,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_upload_ends_in_error() {
        let mut controller = UploadController::new(RetryPolicy {
            max_retries: 1,
            ..Default::default()
        });
        let result: Option<()> = controller
            .upload(|_| async { Err(anyhow!("Payload too large")) })
            .await;

        assert_eq!(result, None);
        let state = controller.state();
        assert_eq!(state.status, UploadStatus::Error);
        assert_eq!(
            state.error.map(|e| e.user_message()),
            Some("Ukuran file melebihi batas yang diizinkan.".to_string())
        );
    }

    #[test]
    fn test_active_statuses() {
        assert!(UploadStatus::Uploading.is_active());
        assert!(UploadStatus::Retrying { attempt: 2 }.is_active());
        assert!(!UploadStatus::Success.is_active());
        assert!(!UploadStatus::Idle.is_active());
    }
}
