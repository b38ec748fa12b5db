use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

static HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[UW][A-Z0-9]+$").expect("handle pattern is valid"));

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Deserialize)]
struct ConfigFile {
    /// The bot's own user handle, e.g. "U0BOT1234". Commands must start with a mention of it.
    bot_user_id: String,
    /// Handle → display name, used for leaderboard lines.
    #[serde(default)]
    display_names: HashMap<String, String>,
    /// Directory for state files (database, logs). Defaults to current directory.
    data_dir: Option<String>,
    /// Database file. Defaults to `<data_dir>/karma.db`.
    database_path: Option<String>,
    /// Channel that receives warnings and errors from the log.
    log_channel: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

pub struct Config {
    /// Path to the config file.
    pub config_path: PathBuf,
    pub bot_user_id: String,
    /// Read-only after load; shared with the engine.
    pub display_names: Arc<HashMap<String, String>>,
    /// Directory for state files (logs, database).
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_channel: Option<String>,
    /// Score into an in-memory database that is thrown away on exit.
    pub dry_run: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let bot_user_id = file.bot_user_id.trim().to_string();
        if bot_user_id.is_empty() {
            return Err(ConfigError::Validation("bot_user_id is required".into()));
        }
        if !HANDLE.is_match(&bot_user_id) {
            return Err(ConfigError::Validation(format!(
                "bot_user_id '{bot_user_id}' appears invalid (expected format: U0123ABCD)"
            )));
        }
        if let Some(bad) = file.display_names.keys().find(|k| !HANDLE.is_match(k)) {
            return Err(ConfigError::Validation(format!(
                "display_names key '{bad}' is not a user handle"
            )));
        }
        if file.log_channel.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(ConfigError::Validation("log_channel must not be empty".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let database_path = file
            .database_path
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("karma.db"));

        Ok(Self {
            config_path,
            bot_user_id,
            display_names: Arc::new(file.display_names),
            data_dir,
            database_path,
            log_channel: file.log_channel,
            dry_run: file.dry_run,
        })
    }
}
