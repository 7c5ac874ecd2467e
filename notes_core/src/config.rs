use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const APP_DIR_NAME: &str = "apple-notes-mcp";
pub const DEFAULT_OSASCRIPT: &str = "/usr/bin/osascript";
pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Runtime settings for both backends.
///
/// Resolution order, later wins: built-in defaults, the TOML file
/// (`$NOTES_MCP_CONFIG` or `<config_dir>/apple-notes-mcp/config.toml`),
/// then environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotesConfig {
    /// Override for the NoteStore.sqlite location.
    pub database_path: Option<PathBuf>,
    /// Account used by `create_note` when the caller names none.
    pub default_account: Option<String>,
    pub script_timeout_secs: u64,
    pub osascript_path: PathBuf,
    pub log_level: LogLevel,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            default_account: None,
            script_timeout_secs: DEFAULT_SCRIPT_TIMEOUT_SECS,
            osascript_path: PathBuf::from(DEFAULT_OSASCRIPT),
            log_level: LogLevel::Info,
        }
    }
}

impl NotesConfig {
    /// Load from the default file location (if present) and the process
    /// environment. Invalid environment values are logged and skipped.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, warnings) = Self::load_with_warnings()?;
        for warning in &warnings {
            warn!("Ignoring {}", warning);
        }
        Ok(config)
    }

    /// Like [`NotesConfig::load`], but hands back the skipped environment
    /// values instead of logging them.
    pub fn load_with_warnings() -> Result<(Self, Vec<ConfigError>), ConfigError> {
        let path = std::env::var_os("NOTES_MCP_CONFIG")
            .map(PathBuf::from)
            .or_else(|| default_config_path().filter(|p| p.exists()));
        Self::load_from(path.as_deref(), |key| std::env::var(key).ok())
    }

    /// Read `path` (defaults when `None`) and layer `lookup` on top.
    pub fn load_from<F>(
        path: Option<&Path>,
        lookup: F,
    ) -> Result<(Self, Vec<ConfigError>), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        let warnings = config.apply_env(lookup);
        Ok((config, warnings))
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup` so tests can feed a map.
    ///
    /// A bad value leaves the current setting in place and is returned.
    /// `DEBUG_MODE=true` wins over any other log level.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        if let Some(level) = non_blank(lookup("NOTES_LOG_LEVEL")) {
            match level.parse::<LogLevel>() {
                Ok(level) => self.log_level = level,
                Err(message) => warnings.push(ConfigError::Invalid {
                    key: "NOTES_LOG_LEVEL".to_string(),
                    message,
                }),
            }
        }
        if let Some(path) = non_blank(lookup("NOTES_DB_PATH")) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(account) = non_blank(lookup("NOTES_DEFAULT_ACCOUNT")) {
            self.default_account = Some(account);
        }
        if let Some(path) = non_blank(lookup("NOTES_OSASCRIPT")) {
            self.osascript_path = PathBuf::from(path);
        }
        if let Some(secs) = non_blank(lookup("NOTES_SCRIPT_TIMEOUT_SECS")) {
            match secs.trim().parse::<u64>() {
                Ok(0) => warnings.push(ConfigError::Invalid {
                    key: "NOTES_SCRIPT_TIMEOUT_SECS".to_string(),
                    message: "must be greater than zero".to_string(),
                }),
                Ok(secs) => self.script_timeout_secs = secs,
                Err(e) => warnings.push(ConfigError::Invalid {
                    key: "NOTES_SCRIPT_TIMEOUT_SECS".to_string(),
                    message: e.to_string(),
                }),
            }
        }
        if self.script_timeout_secs == 0 {
            warnings.push(ConfigError::Invalid {
                key: "script_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
            self.script_timeout_secs = DEFAULT_SCRIPT_TIMEOUT_SECS;
        }
        if let Some(debug) = lookup("DEBUG_MODE") {
            if debug.trim().eq_ignore_ascii_case("true") {
                self.log_level = LogLevel::Debug;
            }
        }
        warnings
    }

    /// Database location: explicit override, else the Notes group container.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(default_database_path)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
        .map(|base| base.join(APP_DIR_NAME).join("config.toml"))
}

pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join("Library/Group Containers/group.com.apple.notes/NoteStore.sqlite")
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
