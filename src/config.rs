//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL override and the last used username.
//!
//! Configuration is stored at `~/.config/budgetbook/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "budgetbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the API base URL
const API_BASE_ENV: &str = "BUDGETBOOK_API_BASE";

/// Default API base URL (local development backend)
const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base: Option<String>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Resolve the API base URL: environment variable, then config file,
    /// then the local development default.
    pub fn api_base(&self) -> String {
        std::env::var(API_BASE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.api_base.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding config and stored credentials
    pub fn data_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // The env var is process-global; tests that touch it run serialized
    // and restore whatever was set before.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<R>(value: Option<&str>, f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock().unwrap();
        let saved = std::env::var(API_BASE_ENV).ok();
        match value {
            Some(v) => std::env::set_var(API_BASE_ENV, v),
            None => std::env::remove_var(API_BASE_ENV),
        }
        let result = f();
        match saved {
            Some(v) => std::env::set_var(API_BASE_ENV, v),
            None => std::env::remove_var(API_BASE_ENV),
        }
        result
    }

    #[test]
    fn test_api_base_default() {
        with_env(None, || {
            assert_eq!(Config::default().api_base(), DEFAULT_API_BASE);
        });
    }

    #[test]
    fn test_api_base_from_file() {
        with_env(None, || {
            let config = Config {
                api_base: Some("https://budget.example.com/api".to_string()),
                last_username: None,
            };
            assert_eq!(config.api_base(), "https://budget.example.com/api");
        });
    }

    #[test]
    fn test_api_base_env_overrides_file() {
        with_env(Some("https://env.example.com/api"), || {
            let config = Config {
                api_base: Some("https://file.example.com/api".to_string()),
                last_username: None,
            };
            assert_eq!(config.api_base(), "https://env.example.com/api");
        });
    }
}
