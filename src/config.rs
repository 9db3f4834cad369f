//! Configuration types for the compliance pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. One struct holds every knob so a config can
//! be shared across concurrent runs and logged as a unit.

use crate::error::PipelineError;
use crate::model::EvaluationStrategy;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;

/// Default generative model, a small text-only completion model.
pub const DEFAULT_MODEL_ID: &str = "amazon.titan-text-lite-v1";

/// Well-known storage key of the outstanding requests record.
pub const DEFAULT_REQUESTS_KEY: &str = "audit_requests.json";

/// Configuration for compliance pipeline runs.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use doc_compliance::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig::builder()
///     .poll_interval(Duration::from_millis(500))
///     .ocr_timeout(Duration::from_secs(120))
///     .model_id("amazon.titan-text-express-v1")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Delay between polls of an asynchronous OCR job. Default: 1 s.
    pub poll_interval: Duration,

    /// Upper bound on the whole poll loop of one OCR job. Default: 300 s.
    ///
    /// Expiry aborts the wait with `OcrJobTimeout`; the remote job keeps
    /// running.
    pub ocr_timeout: Duration,

    /// Maximum retry attempts per external call on a transient failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    ///
    /// With the defaults the waits are 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Generative model identifier passed to the text service.
    pub model_id: String,

    /// Maximum tokens requested per generation. Default: 512.
    pub max_tokens: u32,

    /// Number of leading OCR lines embedded in prompts. Default: 5.
    pub preview_lines: usize,

    /// Character cap on the embedded line preview. Default: 1000.
    pub preview_chars: usize,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: u64,

    /// Lower-case extensions accepted at intake. Default: pdf, png, jpg, jpeg.
    pub allowed_extensions: Vec<String>,

    /// Reject uploads whose leading bytes contradict their extension. Default: true.
    pub verify_magic_bytes: bool,

    /// Bucket name handed to the OCR service alongside each document key.
    pub bucket: String,

    /// Key prefix for persisted uploads. Default: `uploads/`.
    pub upload_prefix: String,

    /// Storage key of the requests record. Default: `audit_requests.json`.
    pub requests_key: String,

    /// Strategy for requests that do not pick one. Default: keyword.
    pub default_strategy: EvaluationStrategy,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            ocr_timeout: Duration::from_secs(300),
            max_retries: 3,
            retry_backoff_ms: 500,
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_tokens: 512,
            preview_lines: 5,
            preview_chars: 1000,
            max_upload_bytes: 50 * 1024 * 1024,
            allowed_extensions: ["pdf", "png", "jpg", "jpeg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            verify_magic_bytes: true,
            bucket: "audit-documents".to_string(),
            upload_prefix: "uploads/".to_string(),
            requests_key: DEFAULT_REQUESTS_KEY.to_string(),
            default_strategy: EvaluationStrategy::Keyword,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("poll_interval", &self.poll_interval)
            .field("ocr_timeout", &self.ocr_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("model_id", &self.model_id)
            .field("max_tokens", &self.max_tokens)
            .field("preview_lines", &self.preview_lines)
            .field("preview_chars", &self.preview_chars)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("bucket", &self.bucket)
            .field("requests_key", &self.requests_key)
            .field("default_strategy", &self.default_strategy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn ocr_timeout(mut self, timeout: Duration) -> Self {
        self.config.ocr_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn model_id(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn preview_lines(mut self, n: usize) -> Self {
        self.config.preview_lines = n;
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn max_upload_bytes(mut self, n: u64) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn allowed_extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_extensions = exts
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn verify_magic_bytes(mut self, v: bool) -> Self {
        self.config.verify_magic_bytes = v;
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.bucket = bucket.into();
        self
    }

    pub fn upload_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.upload_prefix = prefix.into();
        self
    }

    pub fn requests_key(mut self, key: impl Into<String>) -> Self {
        self.config.requests_key = key.into();
        self
    }

    pub fn default_strategy(mut self, strategy: EvaluationStrategy) -> Self {
        self.config.default_strategy = strategy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.poll_interval.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "Poll interval must be greater than zero".into(),
            ));
        }
        if c.ocr_timeout < c.poll_interval {
            return Err(PipelineError::InvalidConfig(format!(
                "OCR timeout ({:?}) must be at least the poll interval ({:?})",
                c.ocr_timeout, c.poll_interval
            )));
        }
        if c.model_id.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("Model id must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(PipelineError::InvalidConfig("Max tokens must be ≥ 1".into()));
        }
        if c.preview_lines == 0 || c.preview_chars == 0 {
            return Err(PipelineError::InvalidConfig(
                "Preview limits must be ≥ 1".into(),
            ));
        }
        if c.allowed_extensions.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "At least one upload extension must be allowed".into(),
            ));
        }
        if c.requests_key.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Requests key must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
