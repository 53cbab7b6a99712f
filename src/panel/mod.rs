//! Control-panel bridge
//!
//! The panel is a remote client on a real-time channel: it observes
//! connection status and the canned-message bank, and can push back edits or
//! ask for a message to be sent. The transport (socket room) lives outside
//! the core; this module defines the wire schema and the session observer
//! that keeps every connected panel current.

use crate::session::{MessageBank, Session, SessionData};
use serde::Serialize;
use std::rc::Rc;

/// Connection half of the panel schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ConnectionState {
    NotConnected,
    Connected {
        channel: String,
        user: String,
        voice: String,
    },
}

/// Full state pushed to panels on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub connection_state: ConnectionState,
    pub messages: MessageBank,
}

impl PanelState {
    /// Derive the panel view of the session
    pub fn from_session(data: &SessionData) -> Self {
        let connection_state = match (&data.voice_channel, &data.text_channel) {
            (Some(_), Some(text_channel)) => ConnectionState::Connected {
                channel: text_channel.name.clone(),
                user: data
                    .focused_user
                    .as_ref()
                    .map(|user| user.name.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                voice: data.voice_name.clone(),
            },
            _ => ConnectionState::NotConnected,
        };

        Self {
            connection_state,
            messages: data.messages.clone(),
        }
    }
}

/// Outbound push to whatever real-time transport hosts the panels
pub trait PanelTransport {
    fn push(&self, state: &PanelState);
}

/// Keep panels updated by observing the session
pub fn register_publisher(session: &mut Session, transport: Rc<dyn PanelTransport>) {
    session.observe(move |data| {
        transport.push(&PanelState::from_session(data));
    });
}
