//! Output sink abstraction and the transition-to-tick bridge
//!
//! The sink is a single-stream audio device: it owns its own state and the
//! queue never sets that state directly, it only issues play commands and
//! observes transition notifications.

use crate::speech::queue::{AudioClip, PlaybackQueue};
use crate::{RelayError, Result};
use log::{debug, error, warn};
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::thread;

/// State of the audio output device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Idle,
    Playing,
    Paused,
    Stopped,
}

/// A single state change emitted by the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkTransition {
    pub old: SinkState,
    pub new: SinkState,
}

impl SinkTransition {
    /// Did playback of the previous item finish naturally?
    pub fn finished_playing(&self) -> bool {
        self.old == SinkState::Playing && self.new == SinkState::Idle
    }
}

/// Single-stream audio output device
///
/// Implementations back onto the platform's voice connection. The relay core
/// only ever has one sink per session; a reconnect constructs a fresh one.
pub trait AudioSink {
    /// Begin playing a clip. Callers must only invoke this when the sink is
    /// idle; the playback queue guarantees that.
    fn play(&mut self, clip: AudioClip) -> Result<()>;

    /// Stop playback and refuse further work. Used at session teardown.
    fn stop(&mut self) -> Result<()>;

    fn state(&self) -> SinkState;

    /// Surface a pending state transition, if any
    ///
    /// Process-backed sinks discover "playback finished" by reaping their
    /// child here; event-backed sinks deliver transitions through the event
    /// channel instead and return None.
    fn poll(&mut self) -> Option<SinkTransition>;
}

/// Bridge a sink transition into the queue
///
/// This is the sole re-entry point that drains the queue after admission:
/// whenever the sink moves from playing to idle, the next ready head job (if
/// any) is played. All other transitions are observability only.
pub fn on_transition(
    transition: SinkTransition,
    queue: &mut PlaybackQueue,
    sink: &mut dyn AudioSink,
) -> Result<bool> {
    debug!(
        "Sink transition: {:?} -> {:?}",
        transition.old, transition.new
    );

    if transition.finished_playing() {
        return queue.tick(sink);
    }

    Ok(false)
}

/// Sink that plays clips by piping them to an external player command
///
/// Used by the local console mode and for development without a chat
/// platform. The player (e.g. `paplay` or `ffplay -nodisp -autoexit -`)
/// reads the clip from stdin and exits when playback ends; the child is
/// reaped from the event loop via [`poll`](AudioSink::poll).
pub struct ProcessSink {
    player: Vec<String>,
    state: SinkState,
    child: Option<Child>,
}

impl ProcessSink {
    /// Create a sink around the given player command line
    pub fn new(player: Vec<String>) -> Result<Self> {
        if player.is_empty() {
            return Err(RelayError::Playback(
                "No player command configured".to_string(),
            ));
        }

        Ok(Self {
            player,
            state: SinkState::Idle,
            child: None,
        })
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.kill() {
                Ok(_) => {
                    let _ = child.wait(); // Clean up zombie
                }
                Err(e) => {
                    debug!("Failed to kill player process: {}", e);
                }
            }
        }
    }
}

impl AudioSink for ProcessSink {
    fn play(&mut self, clip: AudioClip) -> Result<()> {
        if self.state == SinkState::Stopped {
            return Err(RelayError::Playback(
                "Sink is stopped and cannot play".to_string(),
            ));
        }

        let mut cmd = Command::new(&self.player[0]);
        cmd.args(&self.player[1..]);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            RelayError::Playback(format!("Failed to spawn player '{}': {}", self.player[0], e))
        })?;

        let Some(mut stdin) = child.stdin.take() else {
            let _ = child.kill();
            return Err(RelayError::Playback(
                "Player process has no stdin".to_string(),
            ));
        };

        // Feed the clip from a separate thread. The player consumes its
        // input at playback speed, so writing on the event-loop thread
        // would block for the duration of the clip.
        thread::spawn(move || {
            if let Err(e) = stdin.write_all(&clip.bytes) {
                warn!("Failed to write clip to player: {}", e);
            }
            // Dropping stdin closes the pipe and lets the player finish.
        });

        self.child = Some(child);
        self.state = SinkState::Playing;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.kill_child();
        self.state = SinkState::Stopped;
        Ok(())
    }

    fn state(&self) -> SinkState {
        self.state
    }

    fn poll(&mut self) -> Option<SinkTransition> {
        if self.state != SinkState::Playing {
            return None;
        }

        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    warn!("Player exited with status {}", status);
                }
                self.child = None;
                self.state = SinkState::Idle;
                Some(SinkTransition {
                    old: SinkState::Playing,
                    new: SinkState::Idle,
                })
            }
            Ok(None) => None,
            Err(e) => {
                error!("Failed to poll player process: {}", e);
                self.child = None;
                self.state = SinkState::Idle;
                Some(SinkTransition {
                    old: SinkState::Playing,
                    new: SinkState::Idle,
                })
            }
        }
    }
}

impl Drop for ProcessSink {
    fn drop(&mut self) {
        self.kill_child();
    }
}
