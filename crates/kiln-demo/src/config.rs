use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Demo settings, read from a TOML file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    pub window: WindowSection,
    pub movement: MovementSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "kiln arena".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementSection {
    /// Degrees per second.
    pub turn_speed: f32,
    /// Units per second.
    pub velocity: f32,
    /// Soft boundary radius around the origin; `0` disables it.
    pub reach: f32,
}

impl Default for MovementSection {
    fn default() -> Self {
        Self {
            turn_speed: 60.0,
            velocity: 100.0,
            reach: 780.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// `env_logger` filter; `RUST_LOG` is used when absent.
    pub filter: Option<String>,
    pub file: Option<PathBuf>,
}

impl DemoConfig {
    /// Loads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("no config at '{}', using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("failed to parse TOML from '{}'", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = DemoConfig::from_toml("").unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.movement.reach, 780.0);
        assert_eq!((config.window.width, config.window.height), (1024, 768));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DemoConfig::from_toml(
            r#"
            [movement]
            velocity = 250.0

            [logging]
            filter = "kiln_engine=debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.movement.velocity, 250.0);
        assert_eq!(config.movement.turn_speed, 60.0);
        assert_eq!(config.logging.filter.as_deref(), Some("kiln_engine=debug"));
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(DemoConfig::from_toml("[movement]\nspeed = 3.0\n").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = DemoConfig::load(Path::new("/nonexistent/kiln.toml")).unwrap();
        assert_eq!(config, DemoConfig::default());
    }
}
