use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::utils::url::normalize_base_url;

/// Where the client points when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment fallback for the backend base URL.
pub const BASE_URL_ENV: &str = "FELICHAT_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Base URL of the backend conversational service.
    pub base_url: Option<String>,
    /// Default transcript log file, enabled at startup when set.
    pub log_file: Option<String>,
    /// Display name used for user turns in transcript logs.
    pub user_display_name: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "felichat")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    /// Resolve the backend base URL: CLI flag, then environment, then config
    /// file, then the built-in default.
    pub fn resolve_base_url(&self, flag: Option<&str>) -> String {
        let env = std::env::var(BASE_URL_ENV).ok();
        Self::resolve_base_url_from(flag, env.as_deref(), self.base_url.as_deref())
    }

    fn resolve_base_url_from(
        flag: Option<&str>,
        env: Option<&str>,
        configured: Option<&str>,
    ) -> String {
        fn pick(source: Option<&str>) -> Option<&str> {
            source.map(str::trim).filter(|url| !url.is_empty())
        }
        let chosen = pick(flag)
            .or_else(|| pick(env))
            .or_else(|| pick(configured))
            .unwrap_or(DEFAULT_BASE_URL);
        normalize_base_url(chosen)
    }
}
