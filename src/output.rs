//! Result types produced by a pipeline run.

use crate::model::{EvaluationStrategy, OcrMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Pass/fail outcome of checking one request against one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub requested_document_name: String,
    pub is_compliant: bool,
    pub strategy: EvaluationStrategy,
}

/// Generated explanation of why a document did not satisfy its requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectiveMessage {
    pub missing_document_names: Vec<String>,
    pub text: String,
}

/// States a pipeline run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Received,
    Extracting,
    Evaluating,
    Correcting,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Received => "received",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Evaluating => "evaluating",
            PipelineStage::Correcting => "correcting",
            PipelineStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Everything a caller learns from one end-to-end run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    /// Storage key the raw upload was persisted under.
    pub document_key: String,
    /// OCR job identifier; absent for synchronous detection.
    pub job_id: Option<String>,
    pub mode: OcrMode,
    /// Extracted `LINE` texts in OCR order.
    pub lines: Vec<String>,
    /// One verdict per request, in request order.
    pub verdicts: Vec<ComplianceVerdict>,
    /// Present iff at least one verdict is non-compliant.
    pub corrective_message: Option<CorrectiveMessage>,
    /// Every stage visited, in order.
    pub stages: Vec<PipelineStage>,
}

impl PipelineOutcome {
    pub fn all_compliant(&self) -> bool {
        self.verdicts.iter().all(|v| v.is_compliant)
    }

    /// Names of the requests the document did not satisfy, in request order.
    pub fn missing_documents(&self) -> Vec<&str> {
        self.verdicts
            .iter()
            .filter(|v| !v.is_compliant)
            .map(|v| v.requested_document_name.as_str())
            .collect()
    }
}
