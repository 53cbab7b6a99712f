//! Session context
//!
//! One explicit context object holds who is focused, which channels are
//! bound, and the current voice parameters. The relay policy, command
//! handlers and panel bridge all read it by reference; every mutation goes
//! through [`Session::update`], which notifies registered observers so the
//! control-panel broadcast always sees the newest state.

pub mod snapshot;

pub use snapshot::{MessageBank, MessageGroup, Snapshot};

use crate::speech::SpeechOptions;
use log::debug;

/// A chat-platform user, by id and display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub name: String,
}

/// A chat-platform channel, by id and display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
}

/// The readable session state
#[derive(Debug, Clone)]
pub struct SessionData {
    /// Guild this process listens to; traffic from elsewhere is ignored
    pub guild_id: String,

    /// Voice channel we are connected to, if any
    pub voice_channel: Option<ChannelRef>,

    /// The user whose messages are relayed by default
    pub focused_user: Option<UserRef>,

    /// Text channel whose messages are eligible for relay
    pub text_channel: Option<ChannelRef>,

    /// Current synthesis voice; must be valid for `voice_language`
    pub voice_name: String,
    pub voice_language: String,

    /// Voice style; ignored by the provider if the voice lacks it
    pub voice_style: String,

    /// User ids relayed from any channel, at the faster override rate
    pub override_users: Vec<String>,

    /// Canned quick-reply messages edited from the control panel
    pub messages: MessageBank,
}

impl SessionData {
    /// Synthesis options for the current voice at the given rate
    pub fn speech_options(&self, rate: f32) -> SpeechOptions {
        SpeechOptions {
            rate,
            voice: self.voice_name.clone(),
            style: self.voice_style.clone(),
            language: self.voice_language.clone(),
        }
    }

    pub fn is_override_user(&self, user_id: &str) -> bool {
        self.override_users.iter().any(|id| id == user_id)
    }

    /// The persisted slice of this state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            voice_name: self.voice_name.clone(),
            voice_language: self.voice_language.clone(),
            voice_style: self.voice_style.clone(),
            messages: self.messages.clone(),
        }
    }
}

type Observer = Box<dyn Fn(&SessionData)>;

/// Session state plus its change observers
pub struct Session {
    data: SessionData,
    observers: Vec<Observer>,
}

impl Session {
    /// Build the session from static configuration and the loaded snapshot
    pub fn new(guild_id: &str, override_users: Vec<String>, snapshot: Snapshot) -> Self {
        Self {
            data: SessionData {
                guild_id: guild_id.to_string(),
                voice_channel: None,
                focused_user: None,
                text_channel: None,
                voice_name: snapshot.voice_name,
                voice_language: snapshot.voice_language,
                voice_style: snapshot.voice_style,
                override_users,
                messages: snapshot.messages,
            },
            observers: Vec::new(),
        }
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Register an observer called after every update
    pub fn observe<F>(&mut self, observer: F)
    where
        F: Fn(&SessionData) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Apply a mutation and notify all observers
    ///
    /// The single entry point for session changes; call sites never touch
    /// the data directly, so no change can bypass the broadcast.
    pub fn update<F>(&mut self, mutate: F)
    where
        F: FnOnce(&mut SessionData),
    {
        mutate(&mut self.data);
        debug!(
            "Session updated (focused: {:?}, voice channel: {:?})",
            self.data.focused_user.as_ref().map(|u| &u.name),
            self.data.voice_channel.as_ref().map(|c| &c.name),
        );
        for observer in &self.observers {
            observer(&self.data);
        }
    }
}
