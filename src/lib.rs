//! ttsrelay - Voice-channel text-to-speech relay bot
//!
//! Listens for chat messages from a focused user (or an override allow-list),
//! synthesizes them to speech, and plays them into a voice channel in strict
//! arrival order. A control-panel bridge exposes connection status and a bank
//! of canned quick-reply messages.

pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod panel;
pub mod relay;
pub mod session;
pub mod speech;

pub use error::{RelayError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "ttsrelay";
