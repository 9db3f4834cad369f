//! Input types: document requests, uploaded documents, and OCR jobs.
//!
//! [`OcrJob`] owns the only state machine below the orchestrator. Its state
//! only ever moves forward (`Submitted → InProgress* → Succeeded | Failed`)
//! and its blocks are readable only once it has succeeded, so a caller can
//! never act on text from an unfinished job.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Requests ─────────────────────────────────────────────────────────────

/// How a request is checked against extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStrategy {
    /// Single-keyword substring match, no external call. (default)
    #[default]
    Keyword,
    /// Lenient judgment delegated to the generative text service.
    Semantic,
}

impl fmt::Display for EvaluationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationStrategy::Keyword => write!(f, "keyword"),
            EvaluationStrategy::Semantic => write!(f, "semantic"),
        }
    }
}

/// A named document the requester expects the submitter to provide.
///
/// Serialises with the short field names used by the stored requests record
/// (`doc`, `desc`, optional `summary` and `strategy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRequest {
    #[serde(rename = "doc", alias = "requestedDocumentName")]
    pub requested_document_name: String,

    #[serde(rename = "desc", alias = "description")]
    pub description: String,

    /// Plain-English summary generated when the request was published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Per-request strategy override. `None` means the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<EvaluationStrategy>,
}

impl ComplianceRequest {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            requested_document_name: name.into(),
            description: description.into(),
            summary: None,
            strategy: None,
        }
    }

    pub fn with_strategy(mut self, strategy: EvaluationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// The evaluation keyword: first whitespace-delimited token of the
    /// name, lower-cased. Always recomputed, never stored.
    ///
    /// Returns `None` for a blank name.
    pub fn keyword(&self) -> Option<String> {
        self.requested_document_name
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
    }
}

// ── Uploads ──────────────────────────────────────────────────────────────

/// A document as received from the submitter. Read-only once created.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub filename: String,
    /// Lower-cased suffix after the last `.`; empty when there is none.
    pub extension: String,
    pub raw_bytes: Vec<u8>,
    pub size_bytes: u64,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, raw_bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let extension = extension_of(&filename);
        let size_bytes = raw_bytes.len() as u64;
        Self {
            filename,
            extension,
            raw_bytes,
            size_bytes,
        }
    }
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("filename", &self.filename)
            .field("extension", &self.extension)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}

/// Where the OCR service can find a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLocation {
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "Name")]
    pub key: String,
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// A text block as returned by the OCR service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "BlockType", alias = "type")]
    pub block_type: String,
    /// Some block kinds (pages, words without a line) carry no text.
    #[serde(rename = "Text", alias = "text", default)]
    pub text: String,
}

impl TextBlock {
    pub fn new(block_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            text: text.into(),
        }
    }

    pub fn line(text: impl Into<String>) -> Self {
        Self::new("LINE", text)
    }
}

/// Synchronous single-call detection or an asynchronous polled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OcrMode {
    Sync,
    Async,
}

impl OcrMode {
    /// `pdf` runs as a polled job; every other supported type is detected
    /// in a single call.
    pub fn for_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case("pdf") {
            OcrMode::Async
        } else {
            OcrMode::Sync
        }
    }
}

impl fmt::Display for OcrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrMode::Sync => write!(f, "sync"),
            OcrMode::Async => write!(f, "async"),
        }
    }
}

/// Lifecycle state of an OCR job, as reported by the OCR service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Submitted,
    InProgress,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobState::Submitted => 0,
            JobState::InProgress => 1,
            JobState::Succeeded | JobState::Failed => 2,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Submitted => "SUBMITTED",
            JobState::InProgress => "IN_PROGRESS",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// One OCR request and everything observed about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrJob {
    id: Option<String>,
    mode: OcrMode,
    state: JobState,
    history: Vec<JobState>,
    blocks: Option<Vec<TextBlock>>,
}

impl OcrJob {
    /// A freshly started asynchronous job.
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            mode: OcrMode::Async,
            state: JobState::Submitted,
            history: vec![JobState::Submitted],
            blocks: None,
        }
    }

    /// A synchronous detection result: born terminal, never submitted.
    pub fn completed_sync(blocks: Vec<TextBlock>) -> Self {
        Self {
            id: None,
            mode: OcrMode::Sync,
            state: JobState::Succeeded,
            history: vec![JobState::Succeeded],
            blocks: Some(blocks),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn mode(&self) -> OcrMode {
        self.mode
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Every state this job has been observed in, oldest first.
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// Blocks are only readable once the job has succeeded.
    pub fn blocks(&self) -> Option<&[TextBlock]> {
        match self.state {
            JobState::Succeeded => self.blocks.as_deref(),
            _ => None,
        }
    }

    /// Apply a state reported by the OCR service.
    ///
    /// Returns `false` and leaves the job untouched when the report would
    /// move the job backwards or out of a terminal state. Repeating the
    /// current non-terminal state is accepted but not recorded twice.
    pub fn advance(&mut self, next: JobState, blocks: Option<Vec<TextBlock>>) -> bool {
        if self.state.is_terminal() || next.rank() < self.state.rank() {
            return false;
        }
        if next != self.state {
            self.history.push(next);
            self.state = next;
        }
        if next == JobState::Succeeded {
            self.blocks = Some(blocks.unwrap_or_default());
        }
        true
    }
}
