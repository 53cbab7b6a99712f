//! Relay policy
//!
//! Stateless per-message filter deciding whether an inbound text event
//! becomes a playback job. It reads session state but never mutates it.
//! Overridden senders speak at a fixed faster rate than the focused user so
//! secondary or automated senders are distinguishable by ear.

use crate::session::SessionData;
use log::debug;

/// Speaking rate for the focused user
pub const FOCUSED_RATE: f32 = 1.0;
/// Speaking rate for override-listed senders
pub const OVERRIDE_RATE: f32 = 1.5;

/// A text message as delivered by the chat gateway
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub guild_id: String,
    pub channel_id: String,
    /// Absent when the platform cannot resolve the sender
    pub author_id: Option<String>,
    pub author_name: String,
    pub content: String,
}

/// Outcome of the relay filter for one message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelayDecision {
    /// Relay the message at the given speaking rate
    Accept { rate: f32 },
    /// No voice connection; audio is best-effort, so only a warning
    NoConnection,
    /// The sender has no resolvable identity
    UnknownSender,
    /// The sender is neither focused nor override-listed
    NotFocused,
    /// Focused sender, but the message came from an unbound channel
    WrongChannel,
}

impl RelayDecision {
    pub fn accepted(&self) -> bool {
        matches!(self, RelayDecision::Accept { .. })
    }
}

/// Decide whether a message should be spoken
///
/// `connected` reflects whether an output sink currently exists; the session
/// does not own the sink, so the caller supplies that fact.
pub fn evaluate(message: &InboundMessage, session: &SessionData, connected: bool) -> RelayDecision {
    if !connected {
        return RelayDecision::NoConnection;
    }

    let Some(author_id) = message.author_id.as_deref() else {
        return RelayDecision::UnknownSender;
    };

    // Override users bypass the channel restriction entirely.
    if session.is_override_user(author_id) {
        return RelayDecision::Accept {
            rate: OVERRIDE_RATE,
        };
    }

    let focused = session
        .focused_user
        .as_ref()
        .is_some_and(|user| user.id == author_id);
    if !focused {
        debug!("Ignoring message from unfocused user {}", message.author_name);
        return RelayDecision::NotFocused;
    }

    let bound_channel = session
        .text_channel
        .as_ref()
        .is_some_and(|channel| channel.id == message.channel_id);
    if !bound_channel {
        return RelayDecision::WrongChannel;
    }

    RelayDecision::Accept { rate: FOCUSED_RATE }
}
