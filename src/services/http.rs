//! HTTP adapters for the OCR and generative text services.
//!
//! Both speak JSON over `reqwest`. Failures are classified once, here, so the
//! retry layer only has to look at [`ServiceError::is_transient`]:
//!
//! * connect errors, timeouts, a body cut off mid-read, HTTP 429 and 5xx →
//!   `Transient`
//! * any other non-2xx status, or an unparseable body → `Permanent`

use super::{GenerativeTextService, OcrService, PollResponse};
use crate::error::{PipelineError, ServiceError};
use crate::model::{DocumentLocation, TextBlock};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

fn build_client(timeout_secs: u64) -> Result<Client, PipelineError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PipelineError::Internal(format!("Failed to create HTTP client: {e}")))
}

fn classify_send_error(e: reqwest::Error) -> ServiceError {
    // No compression features are enabled, so a decode error is a failed body read.
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_decode() {
        ServiceError::Transient(e.to_string())
    } else {
        ServiceError::Permanent(e.to_string())
    }
}

fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    let msg = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ServiceError::Transient(msg)
    } else {
        ServiceError::Permanent(msg)
    }
}

/// Send a prepared request and return the body of a 2xx response.
async fn send(request: reqwest::RequestBuilder) -> Result<Vec<u8>, ServiceError> {
    let response = request.send().await.map_err(classify_send_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(classify_send_error)?;
    if !status.is_success() {
        return Err(classify_status(status, &String::from_utf8_lossy(&body)));
    }
    Ok(body.to_vec())
}

fn parse_json<T: for<'de> Deserialize<'de>>(what: &str, body: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(body)
        .map_err(|e| ServiceError::Permanent(format!("malformed {what} response: {e}")))
}

// ── Generative text ──────────────────────────────────────────────────────

/// Invoke-model style completion endpoint: `POST {endpoint}/model/{id}/invoke`.
#[derive(Debug, Clone)]
pub struct HttpGenerativeService {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvokeRequest<'a> {
    input_text: &'a str,
    text_generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_token_count: u32,
}

impl HttpGenerativeService {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            client: build_client(timeout_secs)?,
        })
    }

    fn invoke_url(&self, model_id: &str) -> String {
        format!("{}/model/{}/invoke", self.endpoint, model_id)
    }
}

#[async_trait]
impl GenerativeTextService for HttpGenerativeService {
    async fn invoke(
        &self,
        model_id: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<Vec<u8>, ServiceError> {
        let body = InvokeRequest {
            input_text: prompt,
            text_generation_config: GenerationConfig {
                max_token_count: max_tokens,
            },
        };
        let mut request = self
            .client
            .post(self.invoke_url(model_id))
            .header("accept", "application/json")
            .json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        debug!("Invoking model {} ({} prompt chars)", model_id, prompt.len());
        send(request).await
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// Job-style text detection endpoint with Textract-shaped payloads.
///
/// * `POST {endpoint}/jobs`      → `{"JobId": "..."}`
/// * `GET  {endpoint}/jobs/{id}` → `{"JobStatus": "...", "Blocks": [...]}`
/// * `POST {endpoint}/detect`    → `{"Blocks": [...]}`
#[derive(Debug, Clone)]
pub struct HttpOcrService {
    endpoint: String,
    client: Client,
}

#[derive(Serialize)]
struct S3Object<'a> {
    #[serde(rename = "S3Object")]
    s3_object: &'a DocumentLocation,
}

#[derive(Serialize)]
struct StartJobRequest<'a> {
    #[serde(rename = "DocumentLocation")]
    document_location: S3Object<'a>,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    #[serde(rename = "Document")]
    document: S3Object<'a>,
}

#[derive(Debug, Deserialize)]
struct StartJobResponse {
    #[serde(rename = "JobId")]
    job_id: String,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(rename = "Blocks", default)]
    blocks: Vec<TextBlock>,
}

impl HttpOcrService {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, PipelineError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: build_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl OcrService for HttpOcrService {
    async fn start_async_job(&self, location: &DocumentLocation) -> Result<String, ServiceError> {
        let body = StartJobRequest {
            document_location: S3Object { s3_object: location },
        };
        let raw = send(self.client.post(format!("{}/jobs", self.endpoint)).json(&body)).await?;
        let parsed: StartJobResponse = parse_json("start job", &raw)?;
        Ok(parsed.job_id)
    }

    async fn poll_async_job(&self, job_id: &str) -> Result<PollResponse, ServiceError> {
        let raw = send(self.client.get(format!("{}/jobs/{}", self.endpoint, job_id))).await?;
        parse_json("poll job", &raw)
    }

    async fn detect_sync(
        &self,
        location: &DocumentLocation,
    ) -> Result<Vec<TextBlock>, ServiceError> {
        let body = DetectRequest {
            document: S3Object { s3_object: location },
        };
        let raw = send(self.client.post(format!("{}/detect", self.endpoint)).json(&body)).await?;
        let parsed: DetectResponse = parse_json("detect", &raw)?;
        Ok(parsed.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "").is_transient());
        assert!(!classify_status(StatusCode::UNAUTHORIZED, "bad key").is_transient());
    }

    #[test]
    fn invoke_url_strips_trailing_slash() {
        let svc = HttpGenerativeService::new("http://localhost:8080/", None, 30).unwrap();
        assert_eq!(
            svc.invoke_url("amazon.titan-text-lite-v1"),
            "http://localhost:8080/model/amazon.titan-text-lite-v1/invoke"
        );
    }

    #[test]
    fn invoke_body_shape() {
        let body = InvokeRequest {
            input_text: "hello",
            text_generation_config: GenerationConfig { max_token_count: 64 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["inputText"], "hello");
        assert_eq!(json["textGenerationConfig"]["maxTokenCount"], 64);
    }

    #[test]
    fn start_job_body_shape() {
        let loc = DocumentLocation {
            bucket: "b".into(),
            key: "uploads/x.pdf".into(),
        };
        let body = StartJobRequest {
            document_location: S3Object { s3_object: &loc },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["DocumentLocation"]["S3Object"]["Name"], "uploads/x.pdf");
        assert_eq!(json["DocumentLocation"]["S3Object"]["Bucket"], "b");
    }

    #[tokio::test]
    async fn truncated_body_is_transient() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            sock.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{\"JobId\"")
                .await
                .unwrap();
            let _ = sock.shutdown().await;
        });

        let client = build_client(5).unwrap();
        let err = send(client.get(format!("http://{addr}/jobs/job-1")))
            .await
            .unwrap_err();
        assert!(err.is_transient(), "{err}");
    }

    #[test]
    fn malformed_json_is_permanent() {
        let err = parse_json::<StartJobResponse>("start job", b"not json").unwrap_err();
        assert!(!err.is_transient());
    }
}
