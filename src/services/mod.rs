//! External collaborators consumed by the pipeline.
//!
//! The pipeline never talks to a vendor SDK directly. It depends on three
//! object-safe async traits so runs can be wired to HTTP services in
//! production and to scripted fakes in tests:
//!
//! | Trait | Used for |
//! |-------|----------|
//! | [`StorageService`] | raw uploads and the JSON requests record |
//! | [`OcrService`] | synchronous detection and polled asynchronous jobs |
//! | [`GenerativeTextService`] | summaries, semantic checks, corrective messages |
//!
//! Every method reports failures as [`ServiceError`]; the pipeline decides
//! whether to retry.

pub mod fs;
pub mod http;
pub mod memory;

use crate::error::ServiceError;
use crate::model::{DocumentLocation, JobState, TextBlock};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use fs::FsStorage;
pub use http::{HttpGenerativeService, HttpOcrService};
pub use memory::InMemoryStorage;

/// Key/value byte storage with last-write-wins semantics.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ServiceError>;

    /// Fetch the value under `key`; `Ok(None)` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError>;
}

/// One poll of an asynchronous OCR job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(rename = "JobStatus")]
    pub status: JobState,
    /// Present once the job has succeeded.
    #[serde(rename = "Blocks", default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<TextBlock>>,
}

impl PollResponse {
    pub fn status(status: JobState) -> Self {
        Self {
            status,
            blocks: None,
        }
    }

    pub fn succeeded(blocks: Vec<TextBlock>) -> Self {
        Self {
            status: JobState::Succeeded,
            blocks: Some(blocks),
        }
    }
}

/// Text detection over a stored document.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Start an asynchronous detection job and return its identifier.
    async fn start_async_job(&self, location: &DocumentLocation) -> Result<String, ServiceError>;

    /// Report the current status of a job, with blocks once it succeeded.
    async fn poll_async_job(&self, job_id: &str) -> Result<PollResponse, ServiceError>;

    /// Detect text in a single-page document and return its blocks directly.
    async fn detect_sync(&self, location: &DocumentLocation)
        -> Result<Vec<TextBlock>, ServiceError>;
}

/// A text-completion endpoint whose response body shape varies by model family.
#[async_trait]
pub trait GenerativeTextService: Send + Sync {
    /// Run one completion and return the raw response body.
    async fn invoke(
        &self,
        model_id: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Vec<u8>, ServiceError>;
}
