//! # research-config — `models.ini` and API key resolution
//!
//! Reads the `[models]` and `[openrouter]` sections of a `models.ini` file
//! into a [`ModelsConfig`] and resolves the OpenRouter API key from the
//! `OPENROUTER_API_KEY` environment variable. Deliberately does not read
//! `training_config.ini` or any other configuration file — model routing is
//! the only external configuration this workspace consumes.

use std::path::Path;

use thiserror::Error;

/// Default OpenRouter chat-completions base URL when `[openrouter].base_url`
/// is absent from `models.ini`.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default fallback interval when `[models].fallback_interval` is absent or
/// unparseable.
pub const DEFAULT_FALLBACK_INTERVAL: u64 = 3;

/// Errors reading or validating `models.ini` and related environment state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    MissingFile(String),
    #[error("models.ini is missing the [models] section")]
    MissingModelsSection,
    #[error("models.primary is not set in models.ini")]
    MissingPrimary,
    #[error("OPENROUTER_API_KEY is not set")]
    MissingApiKey,
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Resolved model routing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelsConfig {
    pub primary: String,
    pub fallback: String,
    pub fallback_interval: u64,
    pub base_url: String,
}

impl ModelsConfig {
    /// Parse `models.ini` at `path`. `[models].primary` is required;
    /// `fallback`, `fallback_interval`, and `[openrouter].base_url` all fall
    /// back to sensible defaults the way the upstream config validator does.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.display().to_string()));
        }
        let ini = ini::Ini::load_from_file(path)
            .map_err(|e| ConfigError::Other(Box::new(e)))?;
        let models = ini
            .section(Some("models"))
            .ok_or(ConfigError::MissingModelsSection)?;

        let primary = models
            .get("primary")
            .map(|s| s.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingPrimary)?;

        let fallback = models
            .get("fallback")
            .map(|s| s.trim().trim_matches('"').to_string())
            .unwrap_or_default();

        let fallback_interval = models
            .get("fallback_interval")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_FALLBACK_INTERVAL);

        let base_url = ini
            .section(Some("openrouter"))
            .and_then(|s| s.get("base_url"))
            .map(|s| s.trim().trim_matches('"').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        tracing::info!(primary = %primary, fallback = %fallback, fallback_interval, base_url = %base_url, "loaded models.ini");

        Ok(Self {
            primary,
            fallback,
            fallback_interval,
            base_url,
        })
    }

    /// Resolve the OpenRouter API key from the process environment.
    pub fn api_key() -> Result<String, ConfigError> {
        std::env::var("OPENROUTER_API_KEY").map_err(|_| ConfigError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_ini(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ModelsConfig::load("/nonexistent/models.ini").unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn full_ini_is_parsed() {
        let f = write_ini(
            "[models]\nprimary = alibaba/tongyi-deepresearch-30b-a3b\nfallback = qwen/qwen-2.5-7b-instruct:free\nfallback_interval = 5\n\n[openrouter]\nbase_url = https://openrouter.ai/api/v1\n",
        );
        let cfg = ModelsConfig::load(f.path()).unwrap();
        assert_eq!(cfg.primary, "alibaba/tongyi-deepresearch-30b-a3b");
        assert_eq!(cfg.fallback, "qwen/qwen-2.5-7b-instruct:free");
        assert_eq!(cfg.fallback_interval, 5);
        assert_eq!(cfg.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn missing_primary_is_an_error() {
        let f = write_ini("[models]\nfallback = some/model\n");
        let err = ModelsConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPrimary));
    }

    #[test]
    fn missing_models_section_is_an_error() {
        let f = write_ini("[openrouter]\nbase_url = https://example.com\n");
        let err = ModelsConfig::load(f.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingModelsSection));
    }

    #[test]
    fn absent_optional_fields_use_defaults() {
        let f = write_ini("[models]\nprimary = alibaba/tongyi-deepresearch-30b-a3b\n");
        let cfg = ModelsConfig::load(f.path()).unwrap();
        assert_eq!(cfg.fallback, "");
        assert_eq!(cfg.fallback_interval, DEFAULT_FALLBACK_INTERVAL);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn zero_or_invalid_interval_falls_back_to_default() {
        let f = write_ini(
            "[models]\nprimary = x\nfallback_interval = 0\n",
        );
        let cfg = ModelsConfig::load(f.path()).unwrap();
        assert_eq!(cfg.fallback_interval, DEFAULT_FALLBACK_INTERVAL);
    }

    #[test]
    fn api_key_reads_environment_variable() {
        std::env::set_var("OPENROUTER_API_KEY", "test-key-123");
        assert_eq!(ModelsConfig::api_key().unwrap(), "test-key-123");
        std::env::remove_var("OPENROUTER_API_KEY");
    }

    #[test]
    fn api_key_missing_is_an_error() {
        std::env::remove_var("OPENROUTER_API_KEY");
        let err = ModelsConfig::api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }
}
