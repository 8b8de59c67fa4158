//! Configuration system for labwm
//!
//! Loads configuration from TOML file at `~/.config/labwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appearance: AppearanceConfig,
    pub decorations: DecorationConfig,
    pub title_controls: TitleControlsConfig,
    pub commands: CommandsConfig,
    pub keys: KeysConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path, writing the defaults there when it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", config_path))?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("labwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Font and colors used for the decorations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// X core font name
    pub font: String,
    pub border: String,
    pub text: String,
    pub active: String,
    pub inactive: String,
    pub menu: String,
    pub selected: String,
    pub empty: String,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            font: "fixed".to_string(),
            border: "#000000".to_string(),
            text: "#000000".to_string(),
            active: "#ffd86b".to_string(),
            inactive: "#c0c0c0".to_string(),
            menu: "#dddddd".to_string(),
            selected: "#aad5ff".to_string(),
            empty: "#000000".to_string(),
        }
    }
}

/// Frame geometry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationConfig {
    pub border_width: u16,
    pub transient_border_width: u16,
    /// Smallest size a window can be resized to
    pub min_width: i32,
    pub min_height: i32,
    /// Space around the title text
    pub text_padding: i32,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            border_width: 2,
            transient_border_width: 1,
            min_width: 80,
            min_height: 80,
            text_padding: 3,
        }
    }
}

/// The clickable controls at the right end of a title bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleControl {
    Close,
    RaiseLower,
    Resize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleControlsConfig {
    /// Controls listed from the right edge of the title bar
    pub order: Vec<TitleControl>,
    /// Width of one control column; 0 means the title bar height
    pub control_width: i32,
}

impl Default for TitleControlsConfig {
    fn default() -> Self {
        Self {
            order: vec![
                TitleControl::Close,
                TitleControl::RaiseLower,
                TitleControl::Resize,
            ],
            control_width: 0,
        }
    }
}

/// Shell commands launched by clicking the desktop background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub button1: Option<String>,
    pub button2: Option<String>,
    pub button3: Option<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            button1: Some("xterm".to_string()),
            button2: None,
            button3: None,
        }
    }
}

impl CommandsConfig {
    pub fn for_button(&self, button: u8) -> Option<&str> {
        match button {
            1 => self.button1.as_deref(),
            2 => self.button2.as_deref(),
            3 => self.button3.as_deref(),
            _ => None,
        }
    }
}

/// Keyboard bindings, by keysym name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Modifier that must be held: Shift, Control, Mod1..Mod5
    pub modifier: String,
    pub cycle_prev: String,
    pub cycle_next: String,
    pub fullscreen: String,
    pub toggle_z: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            modifier: "Mod1".to_string(),
            cycle_prev: "Page_Up".to_string(),
            cycle_next: "Page_Down".to_string(),
            fullscreen: "F11".to_string(),
            toggle_z: "F12".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labwm").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[appearance]
font = "9x15"

[title_controls]
order = ["resize", "raise_lower", "close"]
control_width = 16

[commands]
button3 = "xclock"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.appearance.font, "9x15");
        assert_eq!(config.appearance.border, "#000000");
        assert_eq!(config.title_controls.order[0], TitleControl::Resize);
        assert_eq!(config.title_controls.control_width, 16);
        assert_eq!(config.commands.for_button(1), Some("xterm"));
        assert_eq!(config.commands.for_button(3), Some("xclock"));
        assert_eq!(config.decorations.border_width, 2);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "decorations = 3").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
