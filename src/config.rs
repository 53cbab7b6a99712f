//! Configuration management

use crate::{RelayError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::PathBuf;

/// Application configuration for the relay bot
///
/// Covers the gateway identity, the synthesis and player commands, and the
/// relay policy knobs. Session state that changes at runtime lives in the
/// snapshot, not here.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.ttsrelay.cfg)
    path: PathBuf,
}

impl Config {
    /// Load configuration from disk or create default
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| RelayError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| RelayError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Get config file path (~/.ttsrelay.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ttsrelay.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("bot"))
            .set("guild_id", "console")
            .set("control_panel_url", "http://localhost:5173")
            .set("snapshot_path", "");

        ini.with_section(Some("speech"))
            .set("synth_command", "espeak-ng -m --stdout")
            .set("player_command", "paplay");

        ini.with_section(Some("relay")).set("override_users", "");

        ini
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    // Relay-specific configuration getters

    /// The single guild this process serves
    pub fn guild_id(&self) -> String {
        self.get_string("bot", "guild_id", "console")
    }

    /// Base URL of the control-panel frontend
    pub fn control_panel_url(&self) -> String {
        self.get_string("bot", "control_panel_url", "http://localhost:5173")
    }

    /// Where the session snapshot persists between runs
    pub fn snapshot_path(&self) -> PathBuf {
        let configured = self.get_string("bot", "snapshot_path", "");
        if configured.is_empty() {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".ttsrelay-snapshot.json")
        } else {
            PathBuf::from(configured)
        }
    }

    /// Synthesis command: SSML on stdin, audio on stdout
    pub fn synth_command(&self) -> Vec<String> {
        split_command(&self.get_string("speech", "synth_command", "espeak-ng -m --stdout"))
    }

    /// Player command: audio on stdin
    pub fn player_command(&self) -> Vec<String> {
        split_command(&self.get_string("speech", "player_command", "paplay"))
    }

    /// Optional voice-catalog JSON file
    pub fn voices_file(&self) -> Option<PathBuf> {
        let path = self.get_string("speech", "voices_file", "");
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }

    /// Sender ids relayed regardless of focus, comma separated
    pub fn override_users(&self) -> Vec<String> {
        self.get_string("relay", "override_users", "")
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Split a configured command line on whitespace
fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}
