//! Application events
//!
//! Everything the bot reacts to arrives on one channel and is handled to
//! completion on the event-loop thread: gateway traffic, synthesis
//! completions from worker threads, sink transitions, and control-panel
//! messages. No queue or session state is mutated anywhere else.

use crate::commands::CommandInvocation;
use crate::relay::InboundMessage;
use crate::session::MessageBank;
use crate::speech::{AudioClip, JobId, SinkTransition};
use std::sync::mpsc;

/// Sending half of the event channel, cloned into collaborator threads
pub type EventSender = mpsc::Sender<AppEvent>;

/// One unit of work for the event loop
#[derive(Debug)]
pub enum AppEvent {
    /// A text message was created on the chat platform
    Message(InboundMessage),

    /// A slash command was invoked
    Command(CommandInvocation),

    /// A synthesis request produced audio
    SynthesisComplete { job: JobId, clip: AudioClip },

    /// A synthesis request failed; the job is dropped without retry
    SynthesisFailed { job: JobId, reason: String },

    /// The output sink changed state
    SinkTransition(SinkTransition),

    /// The voice connection dropped; might be a transient re-signalling
    VoiceDisconnected,

    /// The voice connection is re-signalling after a disconnect
    VoiceReconnecting,

    /// The control panel replaced the canned-message bank
    PanelSetMessages(MessageBank),

    /// The control panel asked to send (and speak) a message
    PanelSendMessage(String),

    /// Shut the event loop down
    Shutdown,
}
