//! OCR job monitor: submit a stored document for text detection and drive
//! the job to a terminal state.
//!
//! ## Two modes, one result
//!
//! The mode is picked once from the file extension ([`OcrMode::for_extension`]):
//!
//! * **Sync** (images): one `detect_sync` call; the returned [`OcrJob`] is
//!   born `Succeeded` and never passes through `Submitted`/`InProgress`.
//! * **Async** (pdf): `start_async_job` returns a job id, then the job is
//!   polled every `poll_interval` until it succeeds or fails.
//!
//! Either way the caller gets a succeeded `OcrJob` whose blocks are ready,
//! so downstream stages never branch on the mode.
//!
//! ## Polling
//!
//! The loop sleeps between polls rather than spinning, and the whole loop
//! runs under `tokio::time::timeout`. Expiry drops the in-flight poll and
//! reports `OcrJobTimeout`; the remote job is not cancelled. A `FAILED`
//! status ends the loop at once with no further polls. Each individual poll
//! is wrapped in [`with_retry`] so a dropped connection does not end the job.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::model::{DocumentLocation, JobState, OcrJob, OcrMode};
use crate::pipeline::retry::{with_retry, RetryPolicy};
use crate::progress::ProgressCallback;
use crate::services::OcrService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Submits documents to an [`OcrService`] and waits for their results.
#[derive(Clone)]
pub struct OcrJobMonitor {
    ocr: Arc<dyn OcrService>,
    poll_interval: Duration,
    timeout: Duration,
    retry: RetryPolicy,
    progress: Option<ProgressCallback>,
}

impl OcrJobMonitor {
    pub fn new(ocr: Arc<dyn OcrService>, config: &PipelineConfig) -> Self {
        Self {
            ocr,
            poll_interval: config.poll_interval,
            timeout: config.ocr_timeout,
            retry: RetryPolicy::from_config(config),
            progress: config.progress_callback.clone(),
        }
    }

    /// Submit and wait: the single-call form of [`submit`](Self::submit)
    /// followed by [`await_terminal`](Self::await_terminal).
    pub async fn run(
        &self,
        location: &DocumentLocation,
        mode: OcrMode,
    ) -> Result<OcrJob, PipelineError> {
        let job = self.submit(location, mode).await?;
        self.await_terminal(job).await
    }

    /// Start text detection for `location`.
    ///
    /// Sync mode returns an already-succeeded job; async mode returns a job
    /// in `Submitted` state carrying the service's job id.
    pub async fn submit(
        &self,
        location: &DocumentLocation,
        mode: OcrMode,
    ) -> Result<OcrJob, PipelineError> {
        let ocr = self.ocr.as_ref();
        match mode {
            OcrMode::Sync => {
                let blocks = with_retry(self.retry, "detect_sync", move || {
                    ocr.detect_sync(location)
                })
                .await
                .map_err(|e| PipelineError::OcrUnavailable {
                    detail: e.to_string(),
                })?;
                debug!("Sync detection of {} returned {} blocks", location.key, blocks.len());
                Ok(OcrJob::completed_sync(blocks))
            }
            OcrMode::Async => {
                let job_id = with_retry(self.retry, "start_async_job", move || {
                    ocr.start_async_job(location)
                })
                .await
                .map_err(|e| PipelineError::OcrUnavailable {
                    detail: e.to_string(),
                })?;
                info!("Started OCR job {} for {}", job_id, location.key);
                if let Some(ref cb) = self.progress {
                    cb.on_job_submitted(&job_id);
                }
                Ok(OcrJob::submitted(job_id))
            }
        }
    }

    /// Drive `job` to a terminal state.
    ///
    /// Returns the succeeded job, `OcrJobFailed` if the service reports
    /// failure, or `OcrJobTimeout` once the configured timeout elapses.
    pub async fn await_terminal(&self, job: OcrJob) -> Result<OcrJob, PipelineError> {
        let job_id = job.id().unwrap_or_default().to_string();
        match job.state() {
            JobState::Succeeded => return Ok(job),
            JobState::Failed => return Err(PipelineError::OcrJobFailed { job_id }),
            JobState::Submitted | JobState::InProgress => {}
        }
        if job_id.is_empty() {
            return Err(PipelineError::Internal(
                "non-terminal OCR job has no id".into(),
            ));
        }

        match timeout(self.timeout, self.poll_until_terminal(job, &job_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "OCR job {} still running after {:?}; giving up without cancelling",
                    job_id, self.timeout
                );
                Err(PipelineError::OcrJobTimeout {
                    job_id,
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }

    async fn poll_until_terminal(
        &self,
        mut job: OcrJob,
        job_id: &str,
    ) -> Result<OcrJob, PipelineError> {
        let ocr = self.ocr.as_ref();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let response = with_retry(self.retry, "poll_async_job", move || {
                ocr.poll_async_job(job_id)
            })
            .await
            .map_err(|e| PipelineError::OcrUnavailable {
                detail: format!("job {job_id}: {e}"),
            })?;

            debug!("OCR job {} poll {}: {}", job_id, attempt, response.status);
            if let Some(ref cb) = self.progress {
                cb.on_poll(job_id, attempt, response.status);
            }

            let reported = response.status;
            if !job.advance(reported, response.blocks) {
                warn!(
                    "OCR job {}: ignoring {} reported after {}",
                    job_id,
                    reported,
                    job.state()
                );
            }

            match job.state() {
                JobState::Succeeded => {
                    info!("OCR job {} succeeded after {} polls", job_id, attempt);
                    return Ok(job);
                }
                JobState::Failed => {
                    warn!("OCR job {} failed after {} polls", job_id, attempt);
                    return Err(PipelineError::OcrJobFailed {
                        job_id: job_id.to_string(),
                    });
                }
                JobState::Submitted | JobState::InProgress => sleep(self.poll_interval).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::model::TextBlock;
    use crate::services::PollResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed script of poll results; once exhausted, reports IN_PROGRESS.
    struct ScriptedOcr {
        polls: Mutex<VecDeque<Result<PollResponse, ServiceError>>>,
        poll_calls: AtomicU32,
        detect_calls: AtomicU32,
    }

    impl ScriptedOcr {
        fn new(script: Vec<Result<PollResponse, ServiceError>>) -> Arc<Self> {
            Arc::new(Self {
                polls: Mutex::new(script.into()),
                poll_calls: AtomicU32::new(0),
                detect_calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl OcrService for ScriptedOcr {
        async fn start_async_job(&self, _: &DocumentLocation) -> Result<String, ServiceError> {
            Ok("job-1".into())
        }

        async fn poll_async_job(&self, _: &str) -> Result<PollResponse, ServiceError> {
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PollResponse::status(JobState::InProgress)))
        }

        async fn detect_sync(&self, _: &DocumentLocation) -> Result<Vec<TextBlock>, ServiceError> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![TextBlock::line("Invoice #123")])
        }
    }

    fn location() -> DocumentLocation {
        DocumentLocation {
            bucket: "b".into(),
            key: "uploads/doc.pdf".into(),
        }
    }

    fn monitor(ocr: Arc<ScriptedOcr>, timeout_secs: u64) -> OcrJobMonitor {
        let config = PipelineConfig::builder()
            .ocr_timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap();
        OcrJobMonitor::new(ocr, &config)
    }

    #[tokio::test(start_paused = true)]
    async fn async_job_polls_until_succeeded() {
        let ocr = ScriptedOcr::new(vec![
            Ok(PollResponse::status(JobState::Submitted)),
            Ok(PollResponse::status(JobState::InProgress)),
            Ok(PollResponse::status(JobState::InProgress)),
            Ok(PollResponse::succeeded(vec![TextBlock::line("from poll 4")])),
        ]);
        let job = monitor(ocr.clone(), 60)
            .run(&location(), OcrMode::Async)
            .await
            .unwrap();

        assert_eq!(ocr.poll_calls.load(Ordering::SeqCst), 4);
        assert_eq!(job.id(), Some("job-1"));
        assert_eq!(job.blocks().unwrap(), &[TextBlock::line("from poll 4")]);
        assert_eq!(
            job.history(),
            &[JobState::Submitted, JobState::InProgress, JobState::Succeeded]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_stops_polling() {
        let ocr = ScriptedOcr::new(vec![
            Ok(PollResponse::status(JobState::InProgress)),
            Ok(PollResponse::status(JobState::Failed)),
            Ok(PollResponse::succeeded(vec![])),
        ]);
        let err = monitor(ocr.clone(), 60)
            .run(&location(), OcrMode::Async)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::OcrJobFailed { ref job_id } if job_id == "job-1"));
        assert_eq!(ocr.poll_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_job_times_out() {
        let ocr = ScriptedOcr::new(vec![]);
        let err = monitor(ocr.clone(), 5)
            .run(&location(), OcrMode::Async)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::OcrJobTimeout { secs: 5, .. }));
        let polls = ocr.poll_calls.load(Ordering::SeqCst);
        assert!((5..=6).contains(&polls), "polled {polls} times");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_error_is_retried() {
        let ocr = ScriptedOcr::new(vec![
            Err(ServiceError::Transient("connection reset".into())),
            Ok(PollResponse::succeeded(vec![TextBlock::line("ok")])),
        ]);
        let job = monitor(ocr.clone(), 60)
            .run(&location(), OcrMode::Async)
            .await
            .unwrap();
        assert_eq!(ocr.poll_calls.load(Ordering::SeqCst), 2);
        assert_eq!(job.state(), JobState::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_poll_error_aborts() {
        let ocr = ScriptedOcr::new(vec![Err(ServiceError::Permanent("no such job".into()))]);
        let err = monitor(ocr, 60)
            .run(&location(), OcrMode::Async)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::OcrUnavailable { .. }));
    }

    #[tokio::test]
    async fn sync_mode_never_polls() {
        let ocr = ScriptedOcr::new(vec![]);
        let job = monitor(ocr.clone(), 60)
            .run(&location(), OcrMode::Sync)
            .await
            .unwrap();

        assert_eq!(ocr.detect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ocr.poll_calls.load(Ordering::SeqCst), 0);
        assert_eq!(job.history(), &[JobState::Succeeded]);
        assert_eq!(job.id(), None);
    }
}
