//! Intake: reject bad uploads, then persist the raw bytes for OCR.
//!
//! Validation happens before any external call, so a rejected upload never
//! reaches storage, OCR, or the generative service. Checks run cheapest
//! first: filename, extension, size, then content signature.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::model::{DocumentLocation, UploadedDocument};
use crate::services::StorageService;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_FILENAME_BYTES: usize = 255;

const PDF_MAGIC: &[u8] = b"%PDF";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Expected leading bytes for a known extension.
fn magic_for(extension: &str) -> Option<&'static [u8]> {
    match extension {
        "pdf" => Some(PDF_MAGIC),
        "png" => Some(PNG_MAGIC),
        "jpg" | "jpeg" => Some(JPEG_MAGIC),
        _ => None,
    }
}

/// Check `document` against the configured upload rules.
pub fn validate_upload(
    document: &UploadedDocument,
    config: &PipelineConfig,
) -> Result<(), PipelineError> {
    let name = document.filename.as_str();
    let reject = |reason: String| -> Result<(), PipelineError> {
        Err(PipelineError::invalid_upload(name, reason))
    };

    if name.is_empty() {
        return reject("filename is empty".into());
    }
    if name.len() > MAX_FILENAME_BYTES {
        return reject(format!("filename longer than {MAX_FILENAME_BYTES} bytes"));
    }
    if name.contains("..") || name.contains(['/', '\\', '\0']) {
        return reject("filename contains a path separator or '..'".into());
    }

    if document.extension.is_empty() {
        return reject("filename has no extension".into());
    }
    if !config.allowed_extensions.iter().any(|e| *e == document.extension) {
        return reject(format!(
            "extension '{}' is not one of: {}",
            document.extension,
            config.allowed_extensions.join(", ")
        ));
    }

    if document.raw_bytes.is_empty() {
        return reject("file is empty".into());
    }
    if document.size_bytes > config.max_upload_bytes {
        return reject(format!(
            "{} bytes exceeds the {} byte limit",
            document.size_bytes, config.max_upload_bytes
        ));
    }

    if config.verify_magic_bytes {
        if let Some(magic) = magic_for(&document.extension) {
            if !document.raw_bytes.starts_with(magic) {
                return reject(format!(
                    "content does not look like a .{} file",
                    document.extension
                ));
            }
        }
    }
    Ok(())
}

/// A fresh, collision-free storage key for an upload.
pub fn document_key(prefix: &str, filename: &str) -> String {
    format!("{prefix}{}-{filename}", Uuid::new_v4())
}

/// Validate and store `document`, returning where the OCR service finds it.
///
/// Storage writes are not retried; a failure is `StorageUnavailable`.
pub async fn store_upload(
    storage: &dyn StorageService,
    document: &UploadedDocument,
    config: &PipelineConfig,
) -> Result<DocumentLocation, PipelineError> {
    validate_upload(document, config)?;
    debug!("Accepted upload {:?}", document);

    let key = document_key(&config.upload_prefix, &document.filename);
    storage
        .put(&key, document.raw_bytes.clone())
        .await
        .map_err(|e| PipelineError::StorageUnavailable {
            key: key.clone(),
            detail: e.to_string(),
        })?;
    info!("Stored {} ({} bytes) as {}", document.filename, document.size_bytes, key);

    Ok(DocumentLocation {
        bucket: config.bucket.clone(),
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStorage;

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn pdf(name: &str) -> UploadedDocument {
        UploadedDocument::new(name, b"%PDF-1.7\n...".to_vec())
    }

    fn reason(result: Result<(), PipelineError>) -> String {
        match result {
            Err(PipelineError::InvalidUpload { reason, .. }) => reason,
            other => panic!("expected InvalidUpload, got {other:?}"),
        }
    }

    #[test]
    fn accepts_known_formats() {
        let cfg = config();
        validate_upload(&pdf("w2.pdf"), &cfg).unwrap();
        let png = UploadedDocument::new("scan.PNG", PNG_MAGIC.to_vec());
        validate_upload(&png, &cfg).unwrap();
        let jpg = UploadedDocument::new("photo.jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0]);
        validate_upload(&jpg, &cfg).unwrap();
    }

    #[test]
    fn rejects_bad_filenames() {
        let cfg = config();
        for name in ["", "../etc.pdf", "a/b.pdf", "a\\b.pdf", "nul\0.pdf"] {
            assert!(validate_upload(&pdf(name), &cfg).is_err(), "{name:?} accepted");
        }
        let long = format!("{}.pdf", "x".repeat(252));
        assert!(reason(validate_upload(&pdf(&long), &cfg)).contains("255"));
    }

    #[test]
    fn rejects_extension() {
        let cfg = config();
        assert!(reason(validate_upload(&pdf("README"), &cfg)).contains("no extension"));
        assert!(reason(validate_upload(&pdf("w2.docx"), &cfg)).contains("docx"));
    }

    #[test]
    fn rejects_empty_and_oversized() {
        let cfg = PipelineConfig::builder().max_upload_bytes(8).build().unwrap();
        let empty = UploadedDocument::new("w2.pdf", vec![]);
        assert!(reason(validate_upload(&empty, &cfg)).contains("empty"));
        assert!(reason(validate_upload(&pdf("w2.pdf"), &cfg)).contains("limit"));
    }

    #[test]
    fn magic_bytes_checked_when_enabled() {
        let fake = UploadedDocument::new("w2.pdf", b"PK\x03\x04zip".to_vec());
        assert!(validate_upload(&fake, &config()).is_err());

        let lenient = PipelineConfig::builder().verify_magic_bytes(false).build().unwrap();
        validate_upload(&fake, &lenient).unwrap();
    }

    #[test]
    fn keys_are_unique() {
        let a = document_key("uploads/", "w2.pdf");
        let b = document_key("uploads/", "w2.pdf");
        assert_ne!(a, b);
        assert!(a.starts_with("uploads/"));
        assert!(a.ends_with("-w2.pdf"));
    }

    #[tokio::test]
    async fn store_upload_persists_bytes() {
        let storage = InMemoryStorage::new();
        let doc = pdf("w2.pdf");
        let loc = store_upload(&storage, &doc, &config()).await.unwrap();
        assert_eq!(loc.bucket, config().bucket);
        assert_eq!(storage.get(&loc.key).await.unwrap(), Some(doc.raw_bytes));
    }

    #[tokio::test]
    async fn rejected_upload_is_not_stored() {
        let storage = InMemoryStorage::new();
        let doc = UploadedDocument::new("w2.exe", b"MZ".to_vec());
        assert!(store_upload(&storage, &doc, &config()).await.is_err());
        assert!(storage.keys().is_empty());
    }
}
