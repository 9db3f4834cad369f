//! Decode a generative-service response body into text.
//!
//! Different model families answer with different JSON shapes. Exactly one
//! branch applies, first match wins, and fields are never merged:
//!
//! 1. top-level `outputText`
//! 2. top-level `completion`
//! 3. first element of a non-empty `results` array: its `outputText`, then
//!    `output`, then `generatedText`
//! 4. otherwise the raw decoded body, unchanged
//!
//! A field counts as present when it exists and is not `null`. Bodies that
//! are not UTF-8 or not JSON at all are `GenerationFailed`.

use crate::error::PipelineError;
use serde_json::{Map, Value};

const RESULT_FIELDS: [&str; 3] = ["outputText", "output", "generatedText"];

/// Which branch of the precedence produced the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedResponse {
    OutputText(String),
    Completion(String),
    ResultItem { field: &'static str, text: String },
    Raw(String),
}

impl DecodedResponse {
    pub fn text(&self) -> &str {
        match self {
            DecodedResponse::OutputText(t)
            | DecodedResponse::Completion(t)
            | DecodedResponse::ResultItem { text: t, .. }
            | DecodedResponse::Raw(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            DecodedResponse::OutputText(t)
            | DecodedResponse::Completion(t)
            | DecodedResponse::ResultItem { text: t, .. }
            | DecodedResponse::Raw(t) => t,
        }
    }
}

/// Apply the decoding precedence to a raw response body.
pub fn decode_response(body: &[u8]) -> Result<DecodedResponse, PipelineError> {
    let raw = std::str::from_utf8(body).map_err(|e| PipelineError::GenerationFailed {
        detail: format!("response body is not UTF-8: {e}"),
    })?;
    let value: Value = serde_json::from_str(raw).map_err(|e| PipelineError::GenerationFailed {
        detail: format!("response body is not JSON: {e}"),
    })?;

    let Some(obj) = value.as_object() else {
        return Ok(DecodedResponse::Raw(raw.to_string()));
    };

    if let Some(v) = present(obj, "outputText") {
        return Ok(DecodedResponse::OutputText(as_text(v)));
    }
    if let Some(v) = present(obj, "completion") {
        return Ok(DecodedResponse::Completion(as_text(v)));
    }
    let first_result = present(obj, "results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(Value::as_object);
    if let Some(first) = first_result {
        for field in RESULT_FIELDS {
            if let Some(v) = present(first, field) {
                return Ok(DecodedResponse::ResultItem {
                    field,
                    text: as_text(v),
                });
            }
        }
    }
    Ok(DecodedResponse::Raw(raw.to_string()))
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn as_text(v: &Value) -> String {
    match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    }
}
