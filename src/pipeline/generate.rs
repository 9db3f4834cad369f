//! One prompt in, decoded text out.
//!
//! Every call to the generative text service goes through [`TextGenerator`]:
//! invoke under the retry policy, then decode the body with
//! [`decode_response`]. Transport failures that outlast the retries become
//! `GenerationUnavailable`; bodies that cannot be decoded become
//! `GenerationFailed`. Prompt wording lives in [`crate::prompts`].

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::decode::decode_response;
use crate::pipeline::retry::{with_retry, RetryPolicy};
use crate::services::GenerativeTextService;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Clone)]
pub struct TextGenerator {
    service: Arc<dyn GenerativeTextService>,
    model_id: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl TextGenerator {
    pub fn new(service: Arc<dyn GenerativeTextService>, config: &PipelineConfig) -> Self {
        Self {
            service,
            model_id: config.model_id.clone(),
            max_tokens: config.max_tokens,
            retry: RetryPolicy::from_config(config),
        }
    }

    /// Invoke the model once (plus transient retries) and decode the reply.
    ///
    /// The returned text is exactly what decoding produced: it may be empty
    /// and has not been cleaned up.
    pub async fn generate(&self, what: &str, prompt: &str) -> Result<String, PipelineError> {
        let start = Instant::now();
        let service = self.service.as_ref();
        let model_id = self.model_id.as_str();
        let max_tokens = self.max_tokens;
        let body = with_retry(self.retry, what, move || {
            service.invoke(model_id, prompt, max_tokens)
        })
        .await
        .map_err(|e| PipelineError::GenerationUnavailable {
            detail: format!("{what}: {e}"),
        })?;

        let decoded = decode_response(&body)?;
        debug!(
            "{}: {} response bytes from {} decoded in {}ms",
            what,
            body.len(),
            self.model_id,
            start.elapsed().as_millis()
        );
        Ok(decoded.into_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FixedModel {
        replies: Mutex<Vec<Result<Vec<u8>, ServiceError>>>,
        calls: AtomicU32,
        last_prompt: Mutex<String>,
    }

    impl FixedModel {
        fn new(mut replies: Vec<Result<Vec<u8>, ServiceError>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
                last_prompt: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeTextService for FixedModel {
        async fn invoke(&self, _: &str, prompt: &str, _: u32) -> Result<Vec<u8>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(ServiceError::Permanent("script exhausted".into())))
        }
    }

    fn generator(model: Arc<FixedModel>) -> TextGenerator {
        TextGenerator::new(model, &PipelineConfig::default())
    }

    #[tokio::test]
    async fn decodes_reply() {
        let model = FixedModel::new(vec![Ok(br#"{"outputText":"hello"}"#.to_vec())]);
        let text = generator(model.clone()).generate("test", "prompt").await.unwrap();
        assert_eq!(text, "hello");
        assert_eq!(*model.last_prompt.lock().unwrap(), "prompt");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let model = FixedModel::new(vec![
            Err(ServiceError::Transient("429".into())),
            Ok(br#"{"completion":"ok"}"#.to_vec()),
        ]);
        let text = generator(model.clone()).generate("test", "p").await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_unavailable() {
        let model = FixedModel::new(vec![Err(ServiceError::Permanent("403".into()))]);
        let err = generator(model).generate("test", "p").await.unwrap_err();
        assert!(matches!(err, PipelineError::GenerationUnavailable { .. }));
    }

    #[tokio::test]
    async fn undecodable_body_is_generation_failed() {
        let model = FixedModel::new(vec![Ok(b"<<oops>>".to_vec())]);
        let err = generator(model).generate("test", "p").await.unwrap_err();
        assert!(matches!(err, PipelineError::GenerationFailed { .. }));
    }
}
