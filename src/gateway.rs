//! Chat-platform seam
//!
//! The platform connection itself (login, gateway session, voice handshake)
//! is an external collaborator. The core reaches it through this trait, and
//! inbound traffic arrives as [`AppEvent`](crate::event::AppEvent)s pushed
//! onto the event channel by the platform adapter.

use crate::session::ChannelRef;
use crate::speech::{AudioSink, ProcessSink};
use crate::Result;
use log::info;

/// Outbound operations against the chat platform
pub trait ChatGateway {
    /// Join a voice channel, returning the session's output sink
    ///
    /// Every call yields a fresh sink; a reconnect never reuses the old one.
    fn connect_voice(&mut self, channel: &ChannelRef) -> Result<Box<dyn AudioSink>>;

    /// Post a message to a text channel
    ///
    /// Command replies arrive here as plain content; an adapter that can
    /// render ephemeral replies decides visibility from the invocation it
    /// is answering, not from this call.
    fn send_to_channel(&mut self, channel_id: &str, content: &str) -> Result<()>;
}

/// Gateway for the local console mode
///
/// "Joining a voice channel" builds a [`ProcessSink`] around the configured
/// player command, and text-channel sends go to stdout. Useful for driving
/// the relay pipeline without a chat platform.
pub struct LocalGateway {
    player: Vec<String>,
}

impl LocalGateway {
    pub fn new(player: Vec<String>) -> Self {
        Self { player }
    }
}

impl ChatGateway for LocalGateway {
    fn connect_voice(&mut self, channel: &ChannelRef) -> Result<Box<dyn AudioSink>> {
        info!("Local voice connection to '{}'", channel.name);
        Ok(Box::new(ProcessSink::new(self.player.clone())?))
    }

    fn send_to_channel(&mut self, channel_id: &str, content: &str) -> Result<()> {
        println!("[#{}] {}", channel_id, content);
        Ok(())
    }
}
