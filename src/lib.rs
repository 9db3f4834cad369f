//! # doc-compliance
//!
//! Check uploaded documents against the documents an auditor asked for.
//!
//! A requester publishes what they need ("Tax Form W2: employee wage
//! statement"). A submitter uploads a PDF or image. The crate stores the
//! upload, runs it through an OCR service, decides per request whether the
//! text satisfies it, and when something is missing asks a generative text
//! service to explain the mismatch in plain language.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Intake    validate name/type/size/signature, store raw bytes
//!  ├─ 2. OCR       image: one sync call │ pdf: async job, polled to a terminal state
//!  ├─ 3. Extract   LINE blocks → ordered lines
//!  ├─ 4. Evaluate  keyword (default) or semantic verdict per request
//!  └─ 5. Correct   one generated message naming what is missing
//! ```
//!
//! The three external systems sit behind traits in [`services`]
//! ([`StorageService`], [`OcrService`], [`GenerativeTextService`]) with HTTP,
//! filesystem, and in-memory adapters provided.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc_compliance::{
//!     ComplianceOrchestrator, ComplianceRequest, FsStorage, HttpGenerativeService,
//!     HttpOcrService, PipelineConfig, UploadedDocument,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = ComplianceOrchestrator::new(
//!         Arc::new(FsStorage::new("./store")),
//!         Arc::new(HttpOcrService::new("http://localhost:9000", 60)?),
//!         Arc::new(HttpGenerativeService::new("http://localhost:9001", None, 60)?),
//!         PipelineConfig::default(),
//!     );
//!
//!     let requests = vec![ComplianceRequest::new("Tax Form W2", "2023 wage statement")];
//!     let upload = UploadedDocument::new("w2.pdf", std::fs::read("w2.pdf")?);
//!     let outcome = orchestrator.run_compliance_pipeline(&upload, &requests).await?;
//!
//!     for v in &outcome.verdicts {
//!         println!("{}: {}", v.requested_document_name, v.is_compliant);
//!     }
//!     if let Some(msg) = outcome.corrective_message {
//!         println!("{}", msg.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doccheck` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc-compliance = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod services;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, DEFAULT_MODEL_ID, DEFAULT_REQUESTS_KEY};
pub use error::{PipelineError, ServiceError};
pub use model::{
    ComplianceRequest, DocumentLocation, EvaluationStrategy, JobState, OcrJob, OcrMode, TextBlock,
    UploadedDocument,
};
pub use orchestrator::ComplianceOrchestrator;
pub use output::{ComplianceVerdict, CorrectiveMessage, PipelineOutcome, PipelineStage};
pub use pipeline::decode::{decode_response, DecodedResponse};
pub use pipeline::evaluate::{evaluate_keyword, parse_semantic_answer};
pub use pipeline::extract::extract_lines;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use services::{
    FsStorage, GenerativeTextService, HttpGenerativeService, HttpOcrService, InMemoryStorage,
    OcrService, PollResponse, StorageService,
};
