//! Layered settings for the agent.
//!
//! Lowest to highest precedence: built-in defaults, the user config file
//! (`<config dir>/tabpilot/config.toml`), `./tabpilot.toml`, an explicit
//! `--config` path, then `TABPILOT_*` environment variables. An empty
//! `api_key` falls back to `OPENAI_API_KEY`.

use std::env;
use std::path::{Path, PathBuf};

use agent_core::{AgentError, AgentSettings, SettingsSource};
use config::{Config, Environment, File};
use tracing::debug;

use crate::errors::ConfigError;

pub const ENV_PREFIX: &str = "TABPILOT";
pub const FALLBACK_KEY_VAR: &str = "OPENAI_API_KEY";
pub const LOCAL_FILE: &str = "tabpilot.toml";

/// One config file in the layering.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FileLayer {
    path: PathBuf,
    required: bool,
}

/// Reads [`AgentSettings`] from every layer on each call.
#[derive(Clone, Debug)]
pub struct SettingsLoader {
    files: Vec<FileLayer>,
    env_prefix: String,
    fallback_key_var: Option<String>,
    max_rounds: Option<u32>,
}

impl SettingsLoader {
    /// Standard layering for the binary.
    pub fn discover(explicit: Option<&Path>) -> Self {
        let mut loader = Self::empty();
        if let Some(dir) = dirs::config_dir() {
            loader = loader.optional_file(dir.join("tabpilot").join("config.toml"));
        }
        loader = loader.optional_file(LOCAL_FILE);
        if let Some(path) = explicit {
            loader = loader.required_file(path);
        }
        loader
    }

    /// Defaults and environment only.
    pub fn empty() -> Self {
        Self {
            files: Vec::new(),
            env_prefix: ENV_PREFIX.to_string(),
            fallback_key_var: Some(FALLBACK_KEY_VAR.to_string()),
            max_rounds: None,
        }
    }

    pub fn optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(FileLayer {
            path: path.into(),
            required: false,
        });
        self
    }

    pub fn required_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(FileLayer {
            path: path.into(),
            required: true,
        });
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn fallback_key_var(mut self, var: Option<&str>) -> Self {
        self.fallback_key_var = var.map(str::to_string);
        self
    }

    /// Command-line override applied after every other layer.
    pub fn max_rounds(mut self, rounds: Option<u32>) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn load(&self) -> Result<AgentSettings, ConfigError> {
        let defaults = Config::try_from(&AgentSettings::default())?;
        let mut builder = Config::builder().add_source(defaults);

        for layer in &self.files {
            if layer.required && !layer.path.exists() {
                return Err(ConfigError::MissingFile(layer.path.clone()));
            }
            if layer.path.exists() {
                debug!(path = %layer.path.display(), "loading config file");
            }
            builder = builder.add_source(File::from(layer.path.clone()).required(layer.required));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let mut settings: AgentSettings = builder.build()?.try_deserialize()?;

        if settings.api_key.trim().is_empty() {
            if let Some(var) = &self.fallback_key_var {
                if let Ok(key) = env::var(var) {
                    settings.api_key = key.trim().to_string();
                }
            }
        }
        if let Some(rounds) = self.max_rounds {
            settings.max_rounds = rounds;
        }

        settings
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(settings)
    }
}

impl SettingsSource for SettingsLoader {
    fn settings(&self) -> Result<AgentSettings, AgentError> {
        self.load().map_err(|err| AgentError::config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn isolated() -> SettingsLoader {
        SettingsLoader::empty()
            .env_prefix("TABPILOT_TEST")
            .fallback_key_var(Some("TABPILOT_TEST_FALLBACK"))
    }

    #[test]
    #[serial]
    fn defaults_apply_without_sources() {
        let settings = isolated().load().unwrap();
        assert_eq!(settings, AgentSettings::default());
    }

    #[test]
    #[serial]
    fn later_files_override_earlier_ones() {
        let dir = TempDir::new().unwrap();
        let user = write(&dir, "user.toml", "model_id = \"user-model\"\nmax_rounds = 4\n");
        let local = write(&dir, "local.toml", "max_rounds = 7\nvision = false\n");

        let settings = isolated()
            .optional_file(user)
            .optional_file(local)
            .optional_file(dir.path().join("absent.toml"))
            .load()
            .unwrap();
        assert_eq!(settings.model_id, "user-model");
        assert_eq!(settings.max_rounds, 7);
        assert!(!settings.vision);
        assert!(settings.highlight);
    }

    #[test]
    #[serial]
    fn environment_overrides_files() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "tabpilot.toml", "max_rounds = 4\napi_key = \"from-file\"\n");
        env::set_var("TABPILOT_TEST_MAX_ROUNDS", "12");
        env::set_var("TABPILOT_TEST_MODEL_ID", "env-model");

        let result = isolated().required_file(file).load();
        env::remove_var("TABPILOT_TEST_MAX_ROUNDS");
        env::remove_var("TABPILOT_TEST_MODEL_ID");

        let settings = result.unwrap();
        assert_eq!(settings.max_rounds, 12);
        assert_eq!(settings.model_id, "env-model");
        assert_eq!(settings.api_key, "from-file");
    }

    #[test]
    #[serial]
    fn api_key_falls_back_to_secondary_variable() {
        env::set_var("TABPILOT_TEST_FALLBACK", " sk-fallback ");
        let result = isolated().load();
        env::remove_var("TABPILOT_TEST_FALLBACK");
        assert_eq!(result.unwrap().api_key, "sk-fallback");
    }

    #[test]
    #[serial]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = isolated()
            .required_file(dir.path().join("nope.toml"))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    #[serial]
    fn zero_round_budget_is_rejected() {
        let err = isolated().max_rounds(Some(0)).load().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let source: &dyn SettingsSource = &isolated().max_rounds(Some(0));
        assert!(matches!(source.settings(), Err(AgentError::Config(_))));
    }
}
