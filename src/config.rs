use comfy_table::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;

use crate::stats::WeeklyTargets;
use crate::units::WeightUnit;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_CONFIG_DIR: &str = "liftlog";
const CONFIG_ENV_VAR: &str = "LIFTLOG_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid color name: {0}")]
    InvalidColor(String),
    #[error("Weekly workout goal must be at least 1 (got {0}).")]
    InvalidWeeklyGoal(u32),
}

/// Colors accepted for `theme.header_color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum StandardColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    DarkGrey,
    DarkRed,
    DarkGreen,
    DarkYellow,
    DarkBlue,
    DarkMagenta,
    DarkCyan,
    Grey,
}

impl From<StandardColor> for Color {
    fn from(value: StandardColor) -> Self {
        match value {
            StandardColor::Black => Self::Black,
            StandardColor::Red => Self::Red,
            StandardColor::Green => Self::Green,
            StandardColor::Yellow => Self::Yellow,
            StandardColor::Blue => Self::Blue,
            StandardColor::Magenta => Self::Magenta,
            StandardColor::Cyan => Self::Cyan,
            StandardColor::White => Self::White,
            StandardColor::DarkGrey => Self::DarkGrey,
            StandardColor::DarkRed => Self::DarkRed,
            StandardColor::DarkGreen => Self::DarkGreen,
            StandardColor::DarkYellow => Self::DarkYellow,
            StandardColor::DarkBlue => Self::DarkBlue,
            StandardColor::DarkMagenta => Self::DarkMagenta,
            StandardColor::DarkCyan => Self::DarkCyan,
            StandardColor::Grey => Self::Grey,
        }
    }
}

/// Parses a color name (case-insensitive) into a `StandardColor`.
pub fn parse_color(color_str: &str) -> Result<StandardColor, ConfigError> {
    StandardColor::iter()
        .find(|color| format!("{color:?}").eq_ignore_ascii_case(color_str))
        .ok_or_else(|| ConfigError::InvalidColor(color_str.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Theme {
    pub header_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self { header_color: "Green".to_string() }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)] // Missing fields fall back to defaults
pub struct Config {
    pub default_unit: WeightUnit,
    pub weekly_workout_goal: u32,
    pub calories_per_minute: u32,
    pub recent_limit: usize,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        let targets = WeeklyTargets::default();
        Self {
            default_unit: WeightUnit::Kg,
            weekly_workout_goal: targets.workouts_per_week,
            calories_per_minute: targets.calories_per_minute,
            recent_limit: 5,
            theme: Theme::default(),
        }
    }
}

impl Config {
    pub const fn weekly_targets(&self) -> WeeklyTargets {
        WeeklyTargets {
            workouts_per_week: self.weekly_workout_goal,
            calories_per_minute: self.calories_per_minute,
        }
    }

    /// # Errors
    /// `ConfigError::InvalidWeeklyGoal` if the goal is 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weekly_workout_goal == 0 {
            return Err(ConfigError::InvalidWeeklyGoal(self.weekly_workout_goal));
        }
        parse_color(&self.theme.header_color)?;
        Ok(())
    }
}

/// Determines the path to the configuration file, creating its directory.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR).ok() {
        Some(path_str) => PathBuf::from(path_str),
        None => dirs::config_dir()
            .ok_or(ConfigError::CannotDetermineConfigDir)?
            .join(APP_CONFIG_DIR),
    };

    if !config_dir_path.exists() {
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration, writing a default file if none exists.
pub fn load(config_path: &Path) -> Result<Config, ConfigError> {
    if !config_path.exists() {
        let default_config = Config::default();
        save(config_path, &default_config)?;
        return Ok(default_config);
    }
    let config_content = fs::read_to_string(config_path)?;
    let config: Config = toml::from_str(&config_content)?;
    config.validate()?;
    Ok(config)
}

/// Saves the configuration to the TOML file.
pub fn save(config_path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}
