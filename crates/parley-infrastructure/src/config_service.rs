//! Resolves configuration and credentials at startup.
//!
//! Priority for tunables: environment variables > `config.toml` > defaults.
//! Priority for credentials: `secret.json` > environment variables.

use crate::paths::ParleyPaths;
use crate::storage::{SecretStorage, SecretStorageError};
use parley_core::config::{AssistantConfig, OpenAiSecret};
use parley_core::{ParleyError, Result};
use std::fs;
use std::path::PathBuf;

pub struct ConfigService {
    config_path: Option<PathBuf>,
    secret_storage: Option<SecretStorage>,
}

impl ConfigService {
    /// Uses the default locations under `~/.config/parley/`.
    pub fn new() -> Self {
        Self {
            config_path: ParleyPaths::config_file().ok(),
            secret_storage: SecretStorage::new().ok(),
        }
    }

    /// Uses explicit locations (for testing or `--config`).
    pub fn with_paths(config_path: PathBuf, secret_path: PathBuf) -> Self {
        Self {
            config_path: Some(config_path),
            secret_storage: Some(SecretStorage::with_path(secret_path)),
        }
    }

    /// Loads tunables from the process environment.
    pub fn load_config(&self) -> Result<AssistantConfig> {
        self.load_config_with(|key| std::env::var(key).ok())
    }

    pub fn load_config_with<F>(&self, lookup: F) -> Result<AssistantConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config_path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)?;
                let config = AssistantConfig::from_toml_str(&content)?;
                tracing::info!(path = %path.display(), "Loaded configuration file");
                config
            }
            _ => AssistantConfig::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Resolves the location of the Q&A store.
    pub fn store_path(&self, config: &AssistantConfig) -> Result<PathBuf> {
        match &config.data_file {
            Some(path) => Ok(path.clone()),
            None => ParleyPaths::store_file().map_err(|e| ParleyError::config(e.to_string())),
        }
    }

    /// Loads OpenAI credentials from the process environment.
    pub fn load_openai_secret(&self) -> Result<OpenAiSecret> {
        self.load_openai_secret_with(|key| std::env::var(key).ok())
    }

    pub fn load_openai_secret_with<F>(&self, lookup: F) -> Result<OpenAiSecret>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(storage) = &self.secret_storage {
            match storage.load() {
                Ok(secret_config) => {
                    if let Some(openai) = secret_config.openai {
                        tracing::info!(api_key = %openai.masked_key(), "Loaded OpenAI key from secret file");
                        return Ok(openai);
                    }
                }
                Err(SecretStorageError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unreadable secret file");
                }
            }
        }

        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ParleyError::config(
                    "OPENAI_API_KEY not found in ~/.config/parley/secret.json or environment variables",
                )
            })?;

        let secret = OpenAiSecret {
            api_key,
            model_name: lookup("OPENAI_MODEL_NAME"),
            base_url: lookup("OPENAI_BASE_URL"),
        };
        tracing::info!(api_key = %secret.masked_key(), "Loaded OpenAI key from environment");
        Ok(secret)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ConfigService {
        ConfigService::with_paths(dir.path().join("config.toml"), dir.path().join("secret.json"))
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let config = service(&dir).load_config_with(|_| None).unwrap();
        assert_eq!(config, AssistantConfig::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "max_retries = 5\nmax_context_turns = 12\n").unwrap();

        let config = service(&dir)
            .load_config_with(|key| (key == "PARLEY_MAX_RETRIES").then(|| "2".to_string()))
            .unwrap();

        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_context_turns, 12);
    }

    #[test]
    fn test_secret_file_wins_over_env() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secret.json"), r#"{"openai": {"api_key": "from-file"}}"#).unwrap();

        let secret = service(&dir)
            .load_openai_secret_with(|_| Some("from-env".to_string()))
            .unwrap();
        assert_eq!(secret.api_key, "from-file");
    }

    #[test]
    fn test_env_fallback_and_missing_key() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let secret = svc
            .load_openai_secret_with(|key| (key == "OPENAI_API_KEY").then(|| "sk-env-1234".to_string()))
            .unwrap();
        assert_eq!(secret.api_key, "sk-env-1234");

        let err = svc.load_openai_secret_with(|_| None).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_explicit_data_file_is_used() {
        let dir = TempDir::new().unwrap();
        let config = AssistantConfig {
            data_file: Some(dir.path().join("qa.json")),
            ..AssistantConfig::default()
        };
        assert_eq!(service(&dir).store_path(&config).unwrap(), dir.path().join("qa.json"));
    }
}
