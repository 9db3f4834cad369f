//! Compliance evaluation: one verdict per request, against the extracted lines.
//!
//! ## Keyword (default)
//!
//! Compliant iff the request's keyword (first token of its name, lower-cased)
//! is a case-insensitive substring of at least one line. Deliberately coarse:
//! "Tax Form W2" matches any line containing "tax", including "syntax".
//! No external call is made.
//!
//! ## Semantic
//!
//! The generative service is asked, leniently, whether the preview satisfies
//! the request, and its free-form reply is read with
//! [`parse_semantic_answer`]. A reply that says neither word is a
//! non-compliant verdict, not an error; only transport failures and
//! undecodable bodies propagate.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::model::{ComplianceRequest, EvaluationStrategy};
use crate::output::ComplianceVerdict;
use crate::pipeline::extract::preview;
use crate::pipeline::generate::TextGenerator;
use crate::prompts::semantic_check_prompt;
use tracing::{debug, info};

const AFFIRMATIVE: &str = "COMPLIANT";
const NEGATIVE: &str = "NON-COMPLIANT";

/// Keyword check for a single request.
pub fn evaluate_keyword(request: &ComplianceRequest, lines: &[String]) -> ComplianceVerdict {
    let is_compliant = match request.keyword() {
        Some(keyword) => lines
            .iter()
            .any(|line| line.to_lowercase().contains(&keyword)),
        None => false,
    };
    ComplianceVerdict {
        requested_document_name: request.requested_document_name.clone(),
        is_compliant,
        strategy: EvaluationStrategy::Keyword,
    }
}

/// Read a semantic reply: compliant only if it contains `COMPLIANT` and does
/// not contain `NON-COMPLIANT` (case-insensitive).
pub fn parse_semantic_answer(reply: &str) -> bool {
    let upper = reply.to_uppercase();
    upper.contains(AFFIRMATIVE) && !upper.contains(NEGATIVE)
}

/// Dispatches each request to its strategy.
#[derive(Clone)]
pub struct ComplianceEvaluator {
    generator: TextGenerator,
    default_strategy: EvaluationStrategy,
    preview_lines: usize,
    preview_chars: usize,
}

impl ComplianceEvaluator {
    pub fn new(generator: TextGenerator, config: &PipelineConfig) -> Self {
        Self {
            generator,
            default_strategy: config.default_strategy,
            preview_lines: config.preview_lines,
            preview_chars: config.preview_chars,
        }
    }

    /// Evaluate one request. The request's own strategy wins over the default.
    pub async fn evaluate(
        &self,
        request: &ComplianceRequest,
        lines: &[String],
    ) -> Result<ComplianceVerdict, PipelineError> {
        let strategy = request.strategy.unwrap_or(self.default_strategy);
        let verdict = match strategy {
            EvaluationStrategy::Keyword => evaluate_keyword(request, lines),
            EvaluationStrategy::Semantic => self.evaluate_semantic(request, lines).await?,
        };
        info!(
            "{} [{}]: {}",
            verdict.requested_document_name,
            verdict.strategy,
            if verdict.is_compliant { "compliant" } else { "non-compliant" }
        );
        Ok(verdict)
    }

    /// Evaluate every request, in order. Stops at the first fatal error so no
    /// partial verdict list is ever returned.
    pub async fn evaluate_all(
        &self,
        requests: &[ComplianceRequest],
        lines: &[String],
    ) -> Result<Vec<ComplianceVerdict>, PipelineError> {
        let mut verdicts = Vec::with_capacity(requests.len());
        for request in requests {
            verdicts.push(self.evaluate(request, lines).await?);
        }
        Ok(verdicts)
    }

    async fn evaluate_semantic(
        &self,
        request: &ComplianceRequest,
        lines: &[String],
    ) -> Result<ComplianceVerdict, PipelineError> {
        let text = preview(lines, self.preview_lines, self.preview_chars);
        let prompt = semantic_check_prompt(request, &text);
        let reply = self.generator.generate("semantic check", &prompt).await?;
        debug!(
            "Semantic reply for {}: {:?}",
            request.requested_document_name,
            reply.chars().take(80).collect::<String>()
        );
        Ok(ComplianceVerdict {
            requested_document_name: request.requested_document_name.clone(),
            is_compliant: parse_semantic_answer(&reply),
            strategy: EvaluationStrategy::Semantic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::services::GenerativeTextService;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keyword_match_on_first_token() {
        let req = ComplianceRequest::new("Coaching Certification", "Signed letter");
        let v = evaluate_keyword(&req, &lines(&["Coaching Certification Letter", "Issued 2023"]));
        assert!(v.is_compliant);
        assert_eq!(v.strategy, EvaluationStrategy::Keyword);
        assert_eq!(v.requested_document_name, "Coaching Certification");
    }

    #[test]
    fn keyword_miss() {
        let req = ComplianceRequest::new("Tax Form W2", "Wage statement");
        assert!(!evaluate_keyword(&req, &lines(&["Invoice #123"])).is_compliant);
    }

    #[test]
    fn keyword_is_a_substring_match() {
        let req = ComplianceRequest::new("Tax Form W2", "Wage statement");
        assert!(evaluate_keyword(&req, &lines(&["Rust SYNTAX guide"])).is_compliant);
    }

    #[test]
    fn keyword_ignores_later_tokens() {
        let req = ComplianceRequest::new("Tax Form W2", "Wage statement");
        assert!(!evaluate_keyword(&req, &lines(&["Form W2"])).is_compliant);
    }

    #[test]
    fn blank_name_is_never_compliant() {
        let req = ComplianceRequest::new("   ", "nothing");
        assert!(!evaluate_keyword(&req, &lines(&["anything at all"])).is_compliant);
    }

    #[test]
    fn no_lines_is_non_compliant() {
        let req = ComplianceRequest::new("Invoice", "any");
        assert!(!evaluate_keyword(&req, &[]).is_compliant);
    }

    #[test]
    fn semantic_answer_parsing() {
        assert!(parse_semantic_answer("COMPLIANT"));
        assert!(parse_semantic_answer("compliant."));
        assert!(parse_semantic_answer("The document is Compliant with the request"));
        assert!(!parse_semantic_answer("NON-COMPLIANT"));
        assert!(!parse_semantic_answer("non-compliant: this is an invoice"));
        assert!(!parse_semantic_answer("Looks fine to me"));
        assert!(!parse_semantic_answer(""));
    }

    struct Answering {
        body: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl GenerativeTextService for Answering {
        async fn invoke(&self, _: &str, _: &str, _: u32) -> Result<Vec<u8>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.as_bytes().to_vec())
        }
    }

    fn evaluator(body: &'static str) -> (ComplianceEvaluator, Arc<Answering>) {
        let model = Arc::new(Answering {
            body,
            calls: AtomicU32::new(0),
        });
        let config = PipelineConfig::default();
        let generator = TextGenerator::new(model.clone(), &config);
        (ComplianceEvaluator::new(generator, &config), model)
    }

    #[tokio::test]
    async fn keyword_strategy_makes_no_call() {
        let (eval, model) = evaluator(r#"{"outputText":"COMPLIANT"}"#);
        let req = ComplianceRequest::new("Tax Form W2", "Wage statement");
        let v = eval.evaluate(&req, &lines(&["Invoice #123"])).await.unwrap();
        assert!(!v.is_compliant);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn semantic_strategy_uses_reply() {
        let (eval, model) = evaluator(r#"{"outputText":"COMPLIANT"}"#);
        let req = ComplianceRequest::new("Tax Form W2", "Wage statement")
            .with_strategy(EvaluationStrategy::Semantic);
        let v = eval.evaluate(&req, &lines(&["W-2 Wage and Tax Statement"])).await.unwrap();
        assert!(v.is_compliant);
        assert_eq!(v.strategy, EvaluationStrategy::Semantic);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn semantic_non_answer_is_non_compliant() {
        let (eval, _) = evaluator(r#"{"results":[{"outputText":"I am not sure."}]}"#);
        let req = ComplianceRequest::new("Tax Form W2", "Wage statement")
            .with_strategy(EvaluationStrategy::Semantic);
        let v = eval.evaluate(&req, &lines(&["something"])).await.unwrap();
        assert!(!v.is_compliant);
    }

    #[tokio::test]
    async fn evaluate_all_keeps_request_order() {
        let (eval, _) = evaluator(r#"{"outputText":"NON-COMPLIANT"}"#);
        let reqs = vec![
            ComplianceRequest::new("Invoice", "any invoice"),
            ComplianceRequest::new("Tax Form W2", "wages"),
        ];
        let verdicts = eval.evaluate_all(&reqs, &lines(&["Invoice #123"])).await.unwrap();
        let names: Vec<_> = verdicts.iter().map(|v| v.requested_document_name.as_str()).collect();
        assert_eq!(names, ["Invoice", "Tax Form W2"]);
        assert!(verdicts[0].is_compliant);
        assert!(!verdicts[1].is_compliant);
    }
}
