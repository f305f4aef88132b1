use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub media: MediaConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Reads `config.toml` from the working directory, falling back to
    /// `config.default.toml`.
    pub fn load() -> AnyResult<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> AnyResult<Self> {
        let config_path = ["config.toml", "config.default.toml"]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
            .ok_or("config.toml or config.default.toml not found")?;

        let config_str = std::fs::read_to_string(&config_path)?;
        if config_str.trim().is_empty() {
            return Err(format!("{} is empty", config_path.display()).into());
        }

        let config = Self::from_toml(&config_str)?;
        tracing::info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    pub fn from_toml(s: &str) -> AnyResult<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sections_take_defaults() {
        let config = Config::from_toml("[session]\n").unwrap();
        assert_eq!(config.session.host_delay_ms, 300);
        assert_eq!(config.session.rendezvous_prefix, "wwm-");
        assert!(!config.session.drift.enabled);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_load_prefers_config_over_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.default.toml"),
            "[session]\nhost_delay_ms = 100\n",
        )
        .unwrap();
        assert_eq!(Config::load_from(dir.path()).unwrap().session.host_delay_ms, 100);

        std::fs::write(dir.path().join("config.toml"), "[session]\nhost_delay_ms = 200\n").unwrap();
        assert_eq!(Config::load_from(dir.path()).unwrap().session.host_delay_ms, 200);
    }

    #[test]
    fn test_load_rejects_missing_or_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(dir.path()).is_err());

        std::fs::write(dir.path().join("config.toml"), "  \n").unwrap();
        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_shipped_default_config_parses() {
        let config = Config::load_from(Path::new(env!("CARGO_MANIFEST_DIR"))).unwrap();
        assert_eq!(config.session.rendezvous_prefix, "wwm-");
    }

    #[test]
    fn test_host_delay_is_clamped() {
        let config = Config::from_toml("[session]\nhost_delay_ms = 900\n").unwrap();
        assert_eq!(config.session.host_delay_ms(), 500);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [session]
            host_delay_ms = 120
            rendezvous_prefix = "band-"

            [session.drift]
            enabled = true
            threshold_ms = 80

            [media]
            library_dir = "/srv/midi"
            temp_dir = "/tmp/band"

            [logging]
            level = "debug"

            [logging.file]
            path = "logs/band.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.host_delay_ms(), 120);
        assert_eq!(config.session.rendezvous_prefix, "band-");
        assert!(config.session.drift.enabled);
        assert_eq!(config.session.drift.threshold_ms, 80);
        assert_eq!(config.media.library_dir.to_str(), Some("/srv/midi"));
        let file = config.logging.unwrap().file.unwrap();
        assert_eq!(file.max_lines, 10_000);
    }
}
