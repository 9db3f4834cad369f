//! Corrective message generation for documents that missed their requests.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::CorrectiveMessage;
use crate::pipeline::extract::preview;
use crate::pipeline::generate::TextGenerator;
use crate::pipeline::postprocess::clean_generated_text;
use crate::prompts::corrective_prompt;
use tracing::info;

/// Explains a mismatch to the submitter in one generative call.
#[derive(Clone)]
pub struct CorrectiveMessageGenerator {
    generator: TextGenerator,
    preview_lines: usize,
    preview_chars: usize,
}

impl CorrectiveMessageGenerator {
    pub fn new(generator: TextGenerator, config: &PipelineConfig) -> Self {
        Self {
            generator,
            preview_lines: config.preview_lines,
            preview_chars: config.preview_chars,
        }
    }

    /// Build the message for `missing` (in verdict order).
    ///
    /// Exactly one invocation of the model, not counting transient retries.
    /// An empty reply after cleanup is `GenerationFailed`.
    pub async fn generate(
        &self,
        missing: Vec<String>,
        lines: &[String],
    ) -> Result<CorrectiveMessage, PipelineError> {
        let text = preview(lines, self.preview_lines, self.preview_chars);
        let prompt = corrective_prompt(&missing, &text);
        let reply = self.generator.generate("corrective message", &prompt).await?;
        let text = clean_generated_text(&reply);
        if text.is_empty() {
            return Err(PipelineError::GenerationFailed {
                detail: "corrective message was empty".into(),
            });
        }
        info!(
            "Corrective message for {} missing document(s), {} chars",
            missing.len(),
            text.len()
        );
        Ok(CorrectiveMessage {
            missing_document_names: missing,
            text,
        })
    }
}
