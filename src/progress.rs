//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as a run moves through its stages and as the OCR job is polled.
//!
//! Callbacks keep the library ignorant of how the host reports progress: a
//! terminal spinner, a log line, a websocket. All methods default to no-ops.
//!
//! # Example
//!
//! ```rust
//! use doc_compliance::{JobState, PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PollCounter {
//!     polls: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for PollCounter {
//!     fn on_poll(&self, job_id: &str, attempt: u32, state: JobState) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("job {job_id}: poll {attempt} -> {state}");
//!     }
//! }
//!
//! let counter = Arc::new(PollCounter { polls: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::model::JobState;
use crate::output::{ComplianceVerdict, PipelineOutcome, PipelineStage};
use std::sync::Arc;

/// Called by the orchestrator and the OCR job monitor as a run progresses.
///
/// Implementations must be `Send + Sync`; concurrent runs may share one
/// callback.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called on entry to each pipeline stage.
    ///
    /// `Received` fires only after the upload passes validation; a rejected
    /// upload produces no events at all.
    fn on_stage(&self, stage: PipelineStage) {
        let _ = stage;
    }

    /// Called once an asynchronous OCR job has been accepted.
    fn on_job_submitted(&self, job_id: &str) {
        let _ = job_id;
    }

    /// Called after every poll of an asynchronous OCR job.
    ///
    /// * `attempt`: 1-indexed poll number
    /// * `state`: state reported by that poll
    fn on_poll(&self, job_id: &str, attempt: u32, state: JobState) {
        let _ = (job_id, attempt, state);
    }

    /// Called for each verdict, in request order, once every request has
    /// been evaluated. A run that fails during evaluation emits none.
    fn on_verdict(&self, verdict: &ComplianceVerdict) {
        let _ = verdict;
    }

    /// Called once when a run finishes successfully. A run that fails after
    /// its verdicts were emitted (for example while drafting the corrective
    /// message) never reaches this.
    fn on_complete(&self, outcome: &PipelineOutcome) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
