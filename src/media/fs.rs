use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::debug;

use super::{MediaStore, filename_of};
use crate::{common::errors::MediaError, configs::MediaConfig, protocol::MediaPayload};

/// [`MediaStore`] backed by a library directory and a temp directory.
pub struct FsMediaStore {
    library_dir: PathBuf,
    temp_dir: PathBuf,
}

impl FsMediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            library_dir: config.library_dir.clone(),
            temp_dir: config.temp_dir.clone(),
        }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn read_encoded(&self, path: &Path) -> Result<MediaPayload, MediaError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| MediaError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(MediaPayload(STANDARD.encode(bytes)))
    }

    async fn exists_locally(&self, filename: &str) -> Option<PathBuf> {
        let candidate = self.library_dir.join(filename_of(filename));
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Some(candidate),
            _ => None,
        }
    }

    async fn persist_temporary(
        &self,
        filename: &str,
        payload: &MediaPayload,
    ) -> Result<PathBuf, MediaError> {
        let persist_err = |reason: String| MediaError::Persist {
            filename: filename.to_string(),
            reason,
        };

        let name = filename_of(filename);
        if name.is_empty() || name == "." || name == ".." {
            return Err(persist_err("invalid filename".into()));
        }

        let bytes = STANDARD
            .decode(payload.as_str())
            .map_err(|e| persist_err(e.to_string()))?;

        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| persist_err(e.to_string()))?;
        let path = self.temp_dir.join(name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| persist_err(e.to_string()))?;

        debug!("Persisted {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> FsMediaStore {
        FsMediaStore::new(&MediaConfig {
            library_dir: root.join("library"),
            temp_dir: root.join("tmp"),
        })
    }

    #[tokio::test]
    async fn test_read_then_persist_restores_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let source = dir.path().join("bolero.mid");
        std::fs::write(&source, b"MThd\x00\x00\x00\x06").unwrap();

        let payload = store.read_encoded(&source).await.unwrap();
        assert_eq!(payload.as_str(), "TVRoZAAAAAY=");

        let saved = store.persist_temporary("bolero.mid", &payload).await.unwrap();
        assert_eq!(saved, dir.path().join("tmp").join("bolero.mid"));
        assert_eq!(std::fs::read(saved).unwrap(), b"MThd\x00\x00\x00\x06");
    }

    #[tokio::test]
    async fn test_exists_locally_looks_in_library() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        std::fs::create_dir_all(dir.path().join("library")).unwrap();
        std::fs::write(dir.path().join("library").join("reel.mid"), b"x").unwrap();

        assert_eq!(
            store.exists_locally("reel.mid").await,
            Some(dir.path().join("library").join("reel.mid"))
        );
        assert_eq!(store.exists_locally("jig.mid").await, None);
    }

    #[tokio::test]
    async fn test_persist_strips_directories_and_rejects_bad_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let payload = MediaPayload(STANDARD.encode(b"abc"));

        let saved = store
            .persist_temporary("../../etc/evil.mid", &payload)
            .await
            .unwrap();
        assert_eq!(saved, dir.path().join("tmp").join("evil.mid"));

        let err = store
            .persist_temporary("x.mid", &MediaPayload("not base64!".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Persist { .. }));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .read_encoded(&dir.path().join("missing.mid"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Read { .. }));
    }
}
