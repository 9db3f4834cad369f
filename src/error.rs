//! Error types for the doc-compliance library.
//!
//! Two distinct error types reflect two distinct layers:
//!
//! * [`PipelineError`] is **fatal**: the current pipeline run cannot proceed
//!   (rejected upload, OCR job failed or timed out, generative service
//!   returned nothing usable). Returned as `Err(PipelineError)` from the
//!   orchestrator entry points. No partial verdict set is ever returned
//!   alongside it.
//!
//! * [`ServiceError`] is **collaborator-level**: a single call to storage,
//!   OCR, or the generative service failed. `Transient` failures are retried
//!   with exponential backoff by [`crate::pipeline::retry`]; `Permanent` ones
//!   surface immediately. Once retries are exhausted the stage maps the last
//!   `ServiceError` into the matching `PipelineError` variant.
//!
//! A storage `NotFound` is not an error at all: `StorageService::get`
//! returns `Ok(None)`.

use thiserror::Error;

/// All fatal errors returned by the doc-compliance library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// The upload was rejected before any external call was made.
    #[error("Upload '{filename}' rejected: {reason}")]
    InvalidUpload { filename: String, reason: String },

    /// A request could not be published: name or description is blank.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The asynchronous OCR job reached the FAILED state.
    #[error("OCR job {job_id} failed")]
    OcrJobFailed { job_id: String },

    /// The asynchronous OCR job did not reach a terminal state in time.
    ///
    /// The remote job is left running; cancellation is not assumed to be
    /// supported by the OCR service.
    #[error("OCR job {job_id} did not finish within {secs}s")]
    OcrJobTimeout { job_id: String, secs: u64 },

    /// The OCR service could not be reached after all retries.
    #[error("OCR service unavailable: {detail}")]
    OcrUnavailable { detail: String },

    // ── Generative errors ─────────────────────────────────────────────────
    /// The generative response was empty or malformed after decoding.
    #[error("Text generation failed: {detail}")]
    GenerationFailed { detail: String },

    /// The generative service could not be reached after all retries.
    #[error("Generative text service unavailable: {detail}")]
    GenerationUnavailable { detail: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Transport-level storage failure (distinct from a missing key).
    #[error("Storage unavailable for key '{key}': {detail}")]
    StorageUnavailable { key: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Shorthand for an [`PipelineError::InvalidUpload`].
    pub fn invalid_upload(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidUpload {
            filename: filename.into(),
            reason: reason.into(),
        }
    }
}

/// A failure reported by one call to an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Worth retrying: timeouts, connection resets, HTTP 429 / 5xx.
    #[error("transient service error: {0}")]
    Transient(String),

    /// Retrying will not help: bad request, auth failure, malformed reply.
    #[error("permanent service error: {0}")]
    Permanent(String),
}

impl ServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }
}
