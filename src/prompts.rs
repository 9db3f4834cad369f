//! Prompts sent to the generative text service.
//!
//! Every prompt the crate issues is built here so unit tests can inspect
//! the exact wording without a live model. Callers pass an already bounded
//! preview (see [`crate::pipeline::extract::preview`]); nothing here reads
//! the full document text.

use crate::model::ComplianceRequest;

/// Opening line shared by prompts that address the auditee directly.
pub const ASSISTANT_PREAMBLE: &str =
    "You are a compliance assistant. Do not include any personal advice disclaimer.";

/// Plain-English summary of a single request, with one concrete example.
pub fn request_summary_prompt(request: &ComplianceRequest) -> String {
    format!(
        "Summarize this audit request for a non-expert and give one concrete example:\n\
         Document: {}\nDescription: {}",
        request.requested_document_name, request.description
    )
}

/// Plain-English summary of every outstanding request, one example each.
pub fn requests_summary_prompt(requests: &[ComplianceRequest]) -> String {
    let listing = requests
        .iter()
        .map(|r| format!("- {}: {}", r.requested_document_name, r.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Summarize these audit requests in plain English for a non-expert and give an example for each:\n\n{listing}"
    )
}

/// Lenient yes/no judgment of whether the uploaded text satisfies `request`.
pub fn semantic_check_prompt(request: &ComplianceRequest, preview: &str) -> String {
    format!(
        "{ASSISTANT_PREAMBLE}\n\
         An auditor requested the following document.\n\
         Requested document: {}\n\
         Description: {}\n\n\
         Text detected in the uploaded document: {preview}...\n\n\
         Be lenient: accept the upload if it plausibly is the requested document, \
         even if wording or formatting differ.\n\
         Answer with the single word COMPLIANT or NON-COMPLIANT.",
        request.requested_document_name, request.description
    )
}

/// Explain a mismatch and show one example of the correct document.
pub fn corrective_prompt(missing: &[String], preview: &str) -> String {
    format!(
        "{ASSISTANT_PREAMBLE} You received the wrong document. \
         OCR detected: {preview}... We were looking for {}. \
         Generate a message explaining the mismatch and an example of the correct document format.",
        missing.join(", ")
    )
}
