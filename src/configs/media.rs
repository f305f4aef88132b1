use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MediaConfig {
    /// Directory searched for a local copy of a selected song.
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,
    /// Directory transferred songs are written to.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            library_dir: default_library_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("songs")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("bandlink")
}
