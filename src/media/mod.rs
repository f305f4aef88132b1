use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    common::errors::MediaError,
    protocol::{MediaPayload, Track},
};

pub mod fs;

pub use fs::FsMediaStore;

/// Storage for the shared song file.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Reads the file at `path` as a transferable payload.
    async fn read_encoded(&self, path: &Path) -> Result<MediaPayload, MediaError>;

    /// Path of a local copy of `filename`, if one exists.
    async fn exists_locally(&self, filename: &str) -> Option<PathBuf>;

    /// Writes a received payload somewhere temporary and returns its path.
    async fn persist_temporary(
        &self,
        filename: &str,
        payload: &MediaPayload,
    ) -> Result<PathBuf, MediaError>;
}

/// Lists the selectable parts of a song file.
#[async_trait]
pub trait TrackInspector: Send + Sync {
    async fn extract_tracks(&self, path: &Path) -> Result<Vec<Track>, MediaError>;
}

/// Final component of a path, accepting both `/` and `\` separators so
/// paths announced by peers on other platforms resolve the same way.
pub fn filename_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
