//! Configuration loading for tarmac
//!
//! Settings come from `.tarmac.toml` at the repository root, with a
//! user-level fallback in the platform config directory. Repo values win
//! key-by-key over user values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Filename for repository-level configuration.
const CONFIG_FILE: &str = ".tarmac.toml";

/// Directory under the user config dir holding the fallback file.
const USER_CONFIG_DIR: &str = "tarmac";

/// Default environment variable consulted for the review API token.
pub const DEFAULT_TOKEN_ENV: &str = "TARMAC_TOKEN";

/// Landing defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LandConfig {
    /// Default integration ref when neither `--onto` nor upstream tracking
    /// determines one
    pub onto: Option<String>,
    /// Default remote when neither `--remote` nor tracking determines one
    pub remote: Option<String>,
}

/// Review service connection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    /// Base URI of the review service API
    pub api: Option<String>,
    /// Environment variable holding the API token
    pub token_env: Option<String>,
}

/// Combined configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Landing defaults
    #[serde(default)]
    pub land: LandConfig,
    /// Review service settings
    #[serde(default)]
    pub review: ReviewConfig,
}

impl Config {
    /// Merge another config underneath this one; present values win.
    fn or(mut self, fallback: Self) -> Self {
        self.land.onto = self.land.onto.or(fallback.land.onto);
        self.land.remote = self.land.remote.or(fallback.land.remote);
        self.review.api = self.review.api.or(fallback.review.api);
        self.review.token_env = self.review.token_env.or(fallback.review.token_env);
        self
    }

    /// The environment variable to read the review API token from.
    pub fn token_env(&self) -> &str {
        self.review.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV)
    }

    /// Resolve the review API token from the configured environment
    /// variable. Missing token is an error only when the API is configured.
    pub fn review_token(&self) -> Result<Option<String>> {
        if self.review.api.is_none() {
            return Ok(None);
        }
        match std::env::var(self.token_env()) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token)),
            _ => Err(Error::Config(format!(
                "review API is configured but ${} is not set",
                self.token_env()
            ))),
        }
    }
}

/// Path of the repo-level config file.
pub fn repo_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(CONFIG_FILE)
}

/// Path of the user-level fallback config file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join("config.toml"))
}

fn load_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Load configuration for a repository.
///
/// Both files are optional; an empty [`Config`] is returned when neither
/// exists. Parse errors are surfaced, not swallowed.
pub fn load_config(repo_root: &Path) -> Result<Config> {
    let repo = {
        let path = repo_config_path(repo_root);
        if path.exists() { load_file(&path)? } else { Config::default() }
    };

    let user = match user_config_path() {
        Some(path) if path.exists() => load_file(&path)?,
        _ => Config::default(),
    };

    Ok(repo.or(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_files_yield_default() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn repo_file_parsed() {
        let temp = TempDir::new().unwrap();
        fs::write(
            repo_config_path(temp.path()),
            "[land]\nonto = \"main\"\nremote = \"upstream\"\n\n[review]\napi = \"https://review.example.com/api\"\n",
        )
        .unwrap();

        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.land.onto.as_deref(), Some("main"));
        assert_eq!(config.land.remote.as_deref(), Some("upstream"));
        assert_eq!(
            config.review.api.as_deref(),
            Some("https://review.example.com/api")
        );
    }

    #[test]
    fn parse_error_names_the_file() {
        let temp = TempDir::new().unwrap();
        fs::write(repo_config_path(temp.path()), "[land\nonto = ").unwrap();

        let err = load_config(temp.path()).unwrap_err();
        assert!(err.to_string().contains(".tarmac.toml"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(repo_config_path(temp.path()), "[land]\nbranch = \"x\"\n").unwrap();

        assert!(load_config(temp.path()).is_err());
    }

    #[test]
    fn merge_prefers_repo_values() {
        let repo = Config {
            land: LandConfig {
                onto: Some("main".to_string()),
                remote: None,
            },
            review: ReviewConfig::default(),
        };
        let user = Config {
            land: LandConfig {
                onto: Some("master".to_string()),
                remote: Some("origin".to_string()),
            },
            review: ReviewConfig {
                api: Some("https://review.example.com/api".to_string()),
                token_env: None,
            },
        };

        let merged = repo.or(user);
        assert_eq!(merged.land.onto.as_deref(), Some("main"));
        assert_eq!(merged.land.remote.as_deref(), Some("origin"));
        assert!(merged.review.api.is_some());
    }

    #[test]
    fn token_not_required_without_api() {
        let config = Config::default();
        assert!(config.review_token().unwrap().is_none());
    }
}
