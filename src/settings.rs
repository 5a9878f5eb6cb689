//! User preferences from the settings panel

use crate::{
    config::default_config_dir,
    error::{BackZapError, Result},
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Appearance preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    Light,
    Dark,
    #[default]
    System,
}

impl std::str::FromStr for Appearance {
    type Err = BackZapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(BackZapError::invalid_config(format!(
                "Unknown appearance '{}' (expected light, dark or system)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Appearance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Persisted user preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Processing updates and tips
    pub notifications: bool,
    /// Automatically save processed images to the library
    pub auto_save: bool,
    pub appearance: Appearance,
    pub language: String,
    /// Whether the onboarding carousel has been completed or skipped
    pub onboarding_completed: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications: true,
            auto_save: false,
            appearance: Appearance::System,
            language: "English".to_string(),
            onboarding_completed: false,
        }
    }
}

impl Settings {
    /// Keys accepted by [`Settings::set`]
    pub const KEYS: &'static [&'static str] = &[
        "notifications",
        "auto_save",
        "appearance",
        "language",
        "onboarding_completed",
    ];

    /// Default settings file (`<config_dir>/backzap/settings.json`)
    #[must_use]
    pub fn default_path() -> PathBuf {
        default_config_dir().join("settings.json")
    }

    /// Load settings; a missing file yields the defaults
    ///
    /// # Errors
    /// - File read failures other than "not found"
    /// - Malformed JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            },
            Err(e) => Err(BackZapError::file_io_error("read settings", path, e)),
        }
    }

    /// # Errors
    /// - Directory creation or write failures
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BackZapError::file_io_error("create settings directory", parent, e))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| BackZapError::file_io_error("write settings", path, e))
    }

    /// Update one setting from its string form
    ///
    /// # Errors
    /// - Unknown key
    /// - Value that does not parse for the key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "notifications" => self.notifications = parse_bool(key, value)?,
            "auto_save" => self.auto_save = parse_bool(key, value)?,
            "appearance" => self.appearance = value.parse()?,
            "language" => {
                let language = value.trim();
                if language.is_empty() {
                    return Err(BackZapError::invalid_config("Language must not be empty"));
                }
                self.language = language.to_string();
            },
            "onboarding_completed" => self.onboarding_completed = parse_bool(key, value)?,
            other => {
                return Err(BackZapError::invalid_config(format!(
                    "Unknown setting '{}' (known: {})",
                    other,
                    Self::KEYS.join(", ")
                )))
            },
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(BackZapError::invalid_config(format!(
            "Setting '{}' expects on/off, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.notifications);
        assert!(!settings.auto_save);
        assert_eq!(settings.appearance, Appearance::System);
        assert_eq!(settings.language, "English");
        assert!(!settings.onboarding_completed);
    }

    #[test]
    fn test_set_values() {
        let mut settings = Settings::default();
        settings.set("auto_save", "on").unwrap();
        settings.set("notifications", "false").unwrap();
        settings.set("appearance", "Dark").unwrap();
        settings.set("language", " Deutsch ").unwrap();

        assert!(settings.auto_save);
        assert!(!settings.notifications);
        assert_eq!(settings.appearance, Appearance::Dark);
        assert_eq!(settings.language, "Deutsch");
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut settings = Settings::default();
        assert!(settings.set("auto_save", "maybe").is_err());
        assert!(settings.set("appearance", "sepia").is_err());
        assert!(settings.set("language", "  ").is_err());
        assert!(settings.set("volume", "11").is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cfg").join("settings.json");
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.set("auto_save", "yes").unwrap();
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }
}
