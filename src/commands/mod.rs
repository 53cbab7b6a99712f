//! Slash-command handlers
//!
//! Commands are the only interactions that get user-visible errors; the
//! speech pipeline itself is fire-and-forget and never surfaces through a
//! command reply.

use crate::app::App;
use crate::session::{ChannelRef, UserRef};
use log::{info, warn};

/// A command with its parsed options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Join a voice channel and focus the invoking user
    Join { voice_channel: ChannelRef },
    /// Leave the current voice channel
    Leave,
    /// Refocus onto the invoking user and their text channel
    SpeakMe,
    /// Switch to a different synthesis voice
    SetVoice { name: String },
    /// Switch the current voice's speaking style
    SetStyle { style: String },
    ListVoices,
    ListStyles,
    Status,
}

/// A command invocation as delivered by the gateway
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub guild_id: String,
    pub user: UserRef,
    pub channel: ChannelRef,
    pub command: Command,
}

/// Reply posted back to the invoker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Visible only to the invoker on platforms that support it
    pub ephemeral: bool,
}

impl Reply {
    fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }
}

/// Execute one command against the application state
pub fn dispatch(app: &mut App, invocation: &CommandInvocation) -> Reply {
    info!(
        "Command: {:?}; user: {}",
        invocation.command, invocation.user.name
    );

    match &invocation.command {
        Command::Join { voice_channel } => join(app, invocation, voice_channel),
        Command::Leave => leave(app),
        Command::SpeakMe => speak_me(app, invocation),
        Command::SetVoice { name } => set_voice(app, name),
        Command::SetStyle { style } => set_style(app, style),
        Command::ListVoices => list_voices(app),
        Command::ListStyles => list_styles(app),
        Command::Status => status(app),
    }
}

fn join(app: &mut App, invocation: &CommandInvocation, voice_channel: &ChannelRef) -> Reply {
    if let Err(e) = app.connect_voice(voice_channel, &invocation.user, &invocation.channel) {
        warn!("Failed to join '{}': {}", voice_channel.name, e);
        return Reply::ephemeral(format!(
            "I couldn't join {}. Try again in a moment.",
            voice_channel.name
        ));
    }

    Reply::ephemeral(format!(
        "Connected! I'm speaking {}'s messages from #{}. Control panel: {}",
        invocation.user.name,
        invocation.channel.name,
        app.control_panel_url()
    ))
}

fn leave(app: &mut App) -> Reply {
    if !app.connected() {
        return Reply::ephemeral("I'm not in a voice channel.");
    }

    app.teardown_voice(true);
    Reply::ephemeral("Disconnected.")
}

fn speak_me(app: &mut App, invocation: &CommandInvocation) -> Reply {
    let user = invocation.user.clone();
    let channel = invocation.channel.clone();
    app.session.update(move |data| {
        data.focused_user = Some(user);
        data.text_channel = Some(channel);
    });

    if app.connected() {
        Reply::public(format!("I'm now speaking {}'s messages.", invocation.user.name))
    } else {
        Reply::ephemeral(
            "I'm not in a voice channel. If you use /join, I'll join that channel \
             and start speaking your messages.",
        )
    }
}

fn set_voice(app: &mut App, name: &str) -> Reply {
    let Some(voice) = app
        .voices
        .iter()
        .find(|v| {
            v.short_name.eq_ignore_ascii_case(name) || v.local_name.eq_ignore_ascii_case(name)
        })
        .cloned()
    else {
        return Reply::ephemeral(format!(
            "I don't know the voice \"{}\". Use /list-voices to see what's available.",
            name
        ));
    };

    app.session.update(|data| {
        data.voice_name = voice.short_name.clone();
        data.voice_language = voice.locale.clone();
        // A style from the previous voice may not exist on this one.
        data.voice_style = crate::session::snapshot::DEFAULT_VOICE_STYLE.to_string();
    });
    app.persist_snapshot();

    Reply::ephemeral(format!("Voice set to {} ({}).", voice.local_name, voice.locale))
}

fn set_style(app: &mut App, style: &str) -> Reply {
    let styles = app.current_voice_styles();
    if !styles.iter().any(|s| s == style) {
        return Reply::ephemeral(format!(
            "The current voice doesn't support the style \"{}\". \
             Use /list-styles to see what's available.",
            style
        ));
    }

    let style = style.to_string();
    app.session.update(move |data| data.voice_style = style);
    app.persist_snapshot();

    Reply::ephemeral("Style updated.")
}

fn list_voices(app: &mut App) -> Reply {
    if app.voices.is_empty() {
        return Reply::ephemeral("No voices are available right now.");
    }

    let names: Vec<String> = app
        .voices
        .iter()
        .map(|v| format!("{} ({})", v.short_name, v.locale))
        .collect();

    Reply::ephemeral(format!(
        "Available voices:\n{}\nUse /set-voice to pick one.",
        names.join(", ")
    ))
}

fn list_styles(app: &mut App) -> Reply {
    let current = app.session.data().voice_name.clone();
    if app.voices.iter().all(|v| v.short_name != current) {
        return Reply::ephemeral(format!(
            "The current voice ({}) is not valid. Please set a new voice using /set-voice.",
            current
        ));
    }

    let styles = app.current_voice_styles();
    Reply::ephemeral(format!(
        "Available styles:\n{}. Use /set-style to pick one. Current style is {}.",
        styles.join(", "),
        app.session.data().voice_style
    ))
}

fn status(app: &mut App) -> Reply {
    let data = app.session.data();
    let content = match (&data.voice_channel, &data.focused_user) {
        (Some(channel), Some(user)) => format!(
            "Connected to {}, speaking {}'s messages with voice {} (style {}).",
            channel.name, user.name, data.voice_name, data.voice_style
        ),
        (Some(channel), None) => format!("Connected to {}, but not focused on anyone.", channel.name),
        _ => "Not connected to a voice channel.".to_string(),
    };
    Reply::ephemeral(content)
}
