//src/config.rs
use crate::history_view::{is_valid_date_format, DEFAULT_DATE_FORMAT};
use comfy_table::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR: &str = "workout-journal";
const DB_FILE_NAME: &str = "journal.sqlite";
pub const CONFIG_ENV_VAR: &str = "WORKOUT_JOURNAL_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("Could not determine data directory.")]
    CannotDetermineDataDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid color name: {0}")]
    InvalidColor(String),
    #[error("Rest duration must be greater than zero seconds (got {0}).")]
    InvalidRestDuration(u32),
    #[error("Invalid date format '{0}'.")]
    InvalidDateFormat(String),
    #[error("The rest backend needs `store.rest_url` in {0:?}.")]
    MissingRestUrl(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum StandardColor {
    Black, Red, Green, Yellow, Blue, Magenta, Cyan, White,
    DarkGrey, DarkRed, DarkGreen, DarkYellow, DarkBlue, DarkMagenta, DarkCyan, Grey,
}

impl From<StandardColor> for Color {
    fn from(value: StandardColor) -> Self {
        match value {
            StandardColor::Black => Color::Black, StandardColor::Red => Color::Red,
            StandardColor::Green => Color::Green, StandardColor::Yellow => Color::Yellow,
            StandardColor::Blue => Color::Blue, StandardColor::Magenta => Color::Magenta,
            StandardColor::Cyan => Color::Cyan, StandardColor::White => Color::White,
            StandardColor::DarkGrey => Color::DarkGrey, StandardColor::DarkRed => Color::DarkRed,
            StandardColor::DarkGreen => Color::DarkGreen, StandardColor::DarkYellow => Color::DarkYellow,
            StandardColor::DarkBlue => Color::DarkBlue, StandardColor::DarkMagenta => Color::DarkMagenta,
            StandardColor::DarkCyan => Color::DarkCyan, StandardColor::Grey => Color::Grey,
        }
    }
}

pub fn parse_color(color_str: &str) -> Result<StandardColor, ConfigError> {
    StandardColor::iter()
        .find(|color| format!("{color:?}").eq_ignore_ascii_case(color_str.trim()))
        .ok_or_else(|| ConfigError::InvalidColor(color_str.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeConfig {
    pub header_color: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self { header_color: "Green".to_string() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Rest,
    Memory,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    /// Defaults to `<data_dir>/workout-journal/journal.sqlite`.
    pub sqlite_path: Option<PathBuf>,
    pub rest_url: Option<String>,
    pub auth_token: Option<String>,
}

impl StoreConfig {
    pub fn sqlite_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.sqlite_path {
            Some(path) => Ok(path.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::CannotDetermineDataDir)?;
                Ok(data_dir.join(APP_DIR).join(DB_FILE_NAME))
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Countdown started after each completed set.
    pub rest_duration_secs: u32,
    pub group_history_by_date: bool,
    /// chrono format string used for history group labels.
    pub date_format: String,
    pub store: StoreConfig,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rest_duration_secs: 60,
            group_history_by_date: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            store: StoreConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl Config {
    pub fn header_color(&self) -> Color {
        match parse_color(&self.theme.header_color) {
            Ok(color) => color.into(),
            Err(e) => {
                warn!("{e}; using green headers");
                Color::Green
            }
        }
    }
}

/// Path of the config file, creating its directory when missing.
/// `WORKOUT_JOURNAL_CONFIG_DIR` replaces the platform config directory.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR).ok() {
        Some(path_str) => {
            let path = PathBuf::from(path_str);
            if !path.is_dir() {
                warn!(
                    "{CONFIG_ENV_VAR} points to '{}', which is not a directory. Trying to create it.",
                    path.display()
                );
            }
            path
        }
        None => dirs::config_dir()
            .ok_or(ConfigError::CannotDetermineConfigDir)?
            .join(APP_DIR),
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }
    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the config, writing the defaults out on first use.
pub fn load(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        let config = Config::default();
        save(config_path, &config)?;
        info!(path = %config_path.display(), "wrote default config");
        return Ok(config);
    }
    let content = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&content)?;
    if config.rest_duration_secs == 0 {
        return Err(ConfigError::InvalidRestDuration(0));
    }
    if !is_valid_date_format(&config.date_format) {
        return Err(ConfigError::InvalidDateFormat(config.date_format));
    }
    Ok(config)
}

pub fn save(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    fs::write(config_path, toml::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_parse_case_insensitively() {
        assert_eq!(parse_color("darkblue").unwrap(), StandardColor::DarkBlue);
        assert_eq!(parse_color(" Red ").unwrap(), StandardColor::Red);
        assert!(matches!(parse_color("mauve"), Err(ConfigError::InvalidColor(_))));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str("rest_duration_secs = 90\n[store]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(config.rest_duration_secs, 90);
        assert!(config.group_history_by_date);
        assert_eq!(config.store.backend, Backend::Memory);
        assert_eq!(config.theme, ThemeConfig::default());
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let first = load(&path).unwrap();
        assert_eq!(first, Config::default());
        assert!(path.exists());

        let mut changed = first;
        changed.rest_duration_secs = 120;
        changed.store.rest_url = Some("https://example.test/db".into());
        save(&path, &changed).unwrap();
        assert_eq!(load(&path).unwrap(), changed);
    }

    #[test]
    fn zero_rest_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "rest_duration_secs = 0\n").unwrap();
        assert!(matches!(load(&path), Err(ConfigError::InvalidRestDuration(0))));
    }

    #[test]
    fn unknown_date_specifier_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "date_format = \"%d/%Q\"\n").unwrap();
        assert!(matches!(load(&path), Err(ConfigError::InvalidDateFormat(f)) if f == "%d/%Q"));
    }
}
