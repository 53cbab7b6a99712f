//! Flat snapshot persistence
//!
//! The durable slice of session state is one JSON file: voice selection and
//! the control panel's canned-message bank. It is loaded once at startup and
//! rewritten on every edit. A corrupt or missing file falls back to the
//! hardcoded defaults; persistence problems never prevent startup.

use crate::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default voice used until a snapshot or command says otherwise
pub const DEFAULT_VOICE_NAME: &str = "en-AU-WilliamNeural";
pub const DEFAULT_VOICE_LANGUAGE: &str = "en-AU";
pub const DEFAULT_VOICE_STYLE: &str = "neutral";

/// A named group of canned quick-reply messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    pub name: String,
    pub messages: Vec<String>,
}

/// The control panel's bank of canned messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBank {
    pub groups: Vec<MessageGroup>,
}

/// The persisted slice of session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub voice_name: String,
    pub voice_language: String,
    pub voice_style: String,
    pub messages: MessageBank,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            voice_name: DEFAULT_VOICE_NAME.to_string(),
            voice_language: DEFAULT_VOICE_LANGUAGE.to_string(),
            voice_style: DEFAULT_VOICE_STYLE.to_string(),
            messages: MessageBank::default(),
        }
    }
}

impl Snapshot {
    /// Load the snapshot, falling back to defaults on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(snapshot) => {
                    debug!("Loaded snapshot from {:?}", path);
                    snapshot
                }
                Err(e) => {
                    warn!("Corrupt snapshot at {:?} ({}), using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("No snapshot at {:?} ({}), using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Write the snapshot back to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!("Saving snapshot to {:?}", path);
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
