//! End-to-end entry points.
//!
//! [`ComplianceOrchestrator`] owns the three collaborators and the stage
//! components built from one [`PipelineConfig`]. It holds no per-run state:
//! every call to [`run_compliance_pipeline`](ComplianceOrchestrator::run_compliance_pipeline)
//! creates its own run context (id + visited stages) and drops it when the
//! run ends, so one orchestrator can serve concurrent runs.
//!
//! ## Run states
//!
//! ```text
//! RECEIVED ─▶ EXTRACTING ─▶ EVALUATING ─┬─────────────────▶ DONE
//!                                       └─▶ CORRECTING ─▶ DONE
//! ```
//!
//! No state is skipped; a run that fails stops where it failed and returns
//! the error without any verdicts. An upload that fails validation is
//! rejected before RECEIVED.
//!
//! The requests record (what the requester asked for) lives in storage under
//! `requests_key` as a JSON array; see [`load_requests`](ComplianceOrchestrator::load_requests).

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::model::{ComplianceRequest, EvaluationStrategy, OcrMode, UploadedDocument};
use crate::output::{PipelineOutcome, PipelineStage};
use crate::pipeline::correct::CorrectiveMessageGenerator;
use crate::pipeline::evaluate::ComplianceEvaluator;
use crate::pipeline::extract::extract_lines;
use crate::pipeline::generate::TextGenerator;
use crate::pipeline::intake::{store_upload, validate_upload};
use crate::pipeline::ocr::OcrJobMonitor;
use crate::pipeline::postprocess::clean_generated_text;
use crate::prompts::{request_summary_prompt, requests_summary_prompt};
use crate::services::{GenerativeTextService, OcrService, StorageService};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// State of a single pipeline run. Created at RECEIVED, consumed at DONE.
struct RunContext<'a> {
    run_id: Uuid,
    stages: Vec<PipelineStage>,
    config: &'a PipelineConfig,
}

impl<'a> RunContext<'a> {
    fn new(config: &'a PipelineConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stages: Vec::with_capacity(5),
            config,
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!("Run {}: {}", self.run_id, stage);
        self.stages.push(stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage(stage);
        }
    }
}

/// Wires storage, OCR, and text generation into the compliance workflow.
pub struct ComplianceOrchestrator {
    storage: Arc<dyn StorageService>,
    config: PipelineConfig,
    monitor: OcrJobMonitor,
    generator: TextGenerator,
    evaluator: ComplianceEvaluator,
    corrector: CorrectiveMessageGenerator,
}

impl ComplianceOrchestrator {
    pub fn new(
        storage: Arc<dyn StorageService>,
        ocr: Arc<dyn OcrService>,
        generative: Arc<dyn GenerativeTextService>,
        config: PipelineConfig,
    ) -> Self {
        let generator = TextGenerator::new(generative, &config);
        Self {
            storage,
            monitor: OcrJobMonitor::new(ocr, &config),
            evaluator: ComplianceEvaluator::new(generator.clone(), &config),
            corrector: CorrectiveMessageGenerator::new(generator.clone(), &config),
            generator,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check one uploaded document against `requests`.
    ///
    /// Returns one verdict per request, in request order, and a corrective
    /// message iff at least one verdict is non-compliant. An empty request
    /// list is vacuously compliant.
    ///
    /// # Errors
    /// `InvalidUpload` before any external call; `StorageUnavailable` if the
    /// bytes cannot be stored; `OcrJobFailed` / `OcrJobTimeout` /
    /// `OcrUnavailable` from text detection; `GenerationFailed` /
    /// `GenerationUnavailable` from semantic checks or the corrective message.
    pub async fn run_compliance_pipeline(
        &self,
        document: &UploadedDocument,
        requests: &[ComplianceRequest],
    ) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        let mut run = RunContext::new(&self.config);
        info!(
            "Run {}: checking {} against {} request(s)",
            run.run_id,
            document.filename,
            requests.len()
        );

        // ── RECEIVED: validate and persist ───────────────────────────────
        // A rejected upload never starts a run, so no callback fires for it.
        validate_upload(document, &self.config)?;
        run.enter(PipelineStage::Received);
        let location = store_upload(self.storage.as_ref(), document, &self.config).await?;

        // ── EXTRACTING: OCR to a terminal state, then LINE blocks ────────
        run.enter(PipelineStage::Extracting);
        let mode = OcrMode::for_extension(&document.extension);
        let job = self.monitor.run(&location, mode).await?;
        let lines = match job.blocks() {
            Some(blocks) => extract_lines(blocks),
            None => {
                return Err(PipelineError::Internal(format!(
                    "OCR job ended in {} without blocks",
                    job.state()
                )))
            }
        };
        info!("Run {}: {} lines extracted ({} mode)", run.run_id, lines.len(), mode);

        // ── EVALUATING: one verdict per request, in order ────────────────
        run.enter(PipelineStage::Evaluating);
        let verdicts = self.evaluator.evaluate_all(requests, &lines).await?;
        if let Some(ref cb) = self.config.progress_callback {
            for verdict in &verdicts {
                cb.on_verdict(verdict);
            }
        }

        // ── CORRECTING: only when something is missing ───────────────────
        let missing: Vec<String> = verdicts
            .iter()
            .filter(|v| !v.is_compliant)
            .map(|v| v.requested_document_name.clone())
            .collect();
        let corrective_message = if missing.is_empty() {
            None
        } else {
            run.enter(PipelineStage::Correcting);
            Some(self.corrector.generate(missing, &lines).await?)
        };

        run.enter(PipelineStage::Done);
        let outcome = PipelineOutcome {
            run_id: run.run_id,
            document_key: location.key,
            job_id: job.id().map(str::to_string),
            mode,
            lines,
            verdicts,
            corrective_message,
            stages: run.stages,
        };
        info!(
            "Run {}: {}/{} compliant in {}ms",
            outcome.run_id,
            outcome.verdicts.iter().filter(|v| v.is_compliant).count(),
            outcome.verdicts.len(),
            start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_complete(&outcome);
        }
        Ok(outcome)
    }

    /// Plain-English summary of `requests`, one example each.
    ///
    /// An empty list makes no model call and yields an empty string.
    pub async fn summarize_requests(
        &self,
        requests: &[ComplianceRequest],
    ) -> Result<String, PipelineError> {
        if requests.is_empty() {
            return Ok(String::new());
        }
        let prompt = requests_summary_prompt(requests);
        self.generate_cleaned("requests summary", &prompt).await
    }

    /// Read the stored requests record. A missing record is an empty list.
    pub async fn load_requests(&self) -> Result<Vec<ComplianceRequest>, PipelineError> {
        let key = self.config.requests_key.as_str();
        let bytes = self
            .storage
            .get(key)
            .await
            .map_err(|e| PipelineError::StorageUnavailable {
                key: key.to_string(),
                detail: e.to_string(),
            })?;
        match bytes {
            None => {
                debug!("No requests record at {}", key);
                Ok(Vec::new())
            }
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                PipelineError::StorageUnavailable {
                    key: key.to_string(),
                    detail: format!("malformed requests record: {e}"),
                }
            }),
        }
    }

    /// Overwrite the stored requests record.
    pub async fn save_requests(&self, requests: &[ComplianceRequest]) -> Result<(), PipelineError> {
        let key = self.config.requests_key.as_str();
        let bytes = serde_json::to_vec_pretty(requests)
            .map_err(|e| PipelineError::Internal(format!("serialise requests: {e}")))?;
        self.storage
            .put(key, bytes)
            .await
            .map_err(|e| PipelineError::StorageUnavailable {
                key: key.to_string(),
                detail: e.to_string(),
            })?;
        info!("Saved {} request(s) to {}", requests.len(), key);
        Ok(())
    }

    /// Publish a new request with a generated summary.
    ///
    /// The new request replaces whatever was outstanding before.
    pub async fn publish_request(
        &self,
        name: &str,
        description: &str,
        strategy: Option<EvaluationStrategy>,
    ) -> Result<ComplianceRequest, PipelineError> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() || description.is_empty() {
            return Err(PipelineError::InvalidRequest {
                reason: "document name and description are both required".into(),
            });
        }

        let mut request = ComplianceRequest::new(name, description);
        request.strategy = strategy;
        let summary = self
            .generate_cleaned("request summary", &request_summary_prompt(&request))
            .await?;
        let request = request.with_summary(summary);

        self.save_requests(std::slice::from_ref(&request)).await?;
        Ok(request)
    }

    /// Check `document` against whatever requests are currently stored.
    pub async fn check_pending(
        &self,
        document: &UploadedDocument,
    ) -> Result<PipelineOutcome, PipelineError> {
        let requests = self.load_requests().await?;
        self.run_compliance_pipeline(document, &requests).await
    }

    async fn generate_cleaned(&self, what: &str, prompt: &str) -> Result<String, PipelineError> {
        let text = clean_generated_text(&self.generator.generate(what, prompt).await?);
        if text.is_empty() {
            return Err(PipelineError::GenerationFailed {
                detail: format!("{what} was empty"),
            });
        }
        Ok(text)
    }
}
