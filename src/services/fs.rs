//! Directory-backed storage.
//!
//! Keys map to paths below a root directory (`uploads/x.pdf` becomes
//! `<root>/uploads/x.pdf`). Writes go to a sibling temp file first and are
//! renamed into place, so a reader never observes a half-written value.
//! Each write gets its own temp file; concurrent writers to one key race
//! only on the rename, and the last rename wins.

use super::StorageService;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path, refusing anything that escapes the root.
    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        let rel = Path::new(key);
        let escapes = key.is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(ServiceError::Permanent(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(rel))
    }
}

fn io_error(key: &str, e: std::io::Error) -> ServiceError {
    let msg = format!("{key}: {e}");
    match e.kind() {
        ErrorKind::PermissionDenied | ErrorKind::InvalidInput => ServiceError::Permanent(msg),
        _ => ServiceError::Transient(msg),
    }
}

#[async_trait]
impl StorageService for FsStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| io_error(key, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_error(key, e));
        }

        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_with_nested_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path());
        store.put("uploads/a.pdf", b"%PDF-1.7".to_vec()).await.unwrap();
        assert_eq!(
            store.get("uploads/a.pdf").await.unwrap(),
            Some(b"%PDF-1.7".to_vec())
        );
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("a.pdf")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_writes_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsStorage::new(dir.path()));

        for _round in 0..5 {
            let writers: Vec<_> = (0..16u8)
                .map(|i| {
                    let store = store.clone();
                    tokio::spawn(async move {
                        store.put("audit_requests.json", vec![i; 64 * 1024]).await
                    })
                })
                .collect();
            for w in writers {
                w.await.unwrap().unwrap();
            }
        }

        let stored = store.get("audit_requests.json").await.unwrap().unwrap();
        assert_eq!(stored.len(), 64 * 1024);
        assert!(stored.iter().all(|b| *b == stored[0]), "value must come from one writer");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1, "no temp files left");
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path());
        assert_eq!(store.get("audit_requests.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStorage::new(dir.path());
        for key in ["../x", "/etc/passwd", "a/../../b", ""] {
            let err = store.put(key, vec![1]).await.unwrap_err();
            assert!(!err.is_transient(), "{key} should be rejected permanently");
        }
    }
}
