//! Speech synthesis client
//!
//! The synthesis provider is an opaque external service: it takes an SSML
//! payload and returns a playable byte stream, with latency and success
//! outside our control. Requests are fired from the event loop and their
//! completions come back as events, possibly in any order.

use crate::event::{AppEvent, EventSender};
use crate::speech::queue::{AudioClip, JobId};
use crate::speech::ssml;
use crate::{RelayError, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

/// Per-request synthesis options
///
/// Voice, style and language come from the session; the rate is chosen per
/// message by the relay policy (override senders speak faster).
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    pub rate: f32,
    pub voice: String,
    pub style: String,
    pub language: String,
}

/// One entry in the provider's voice catalog
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Provider identifier, e.g. "en-AU-WilliamNeural"
    pub short_name: String,
    /// Human-readable name, e.g. "William"
    pub local_name: String,
    /// BCP-47 locale, e.g. "en-AU"
    pub locale: String,
    /// Styles this voice supports, beyond the implicit "neutral"
    #[serde(default)]
    pub styles: Vec<String>,
}

/// Blocking interface to the external synthesis engine
///
/// Implementations run on a worker thread, never on the event loop.
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize an SSML payload into a playable byte stream
    fn synthesize(&self, ssml: &str) -> Result<AudioClip>;

    /// The provider's voice catalog
    fn voices(&self) -> Result<Vec<VoiceInfo>>;
}

/// Backend that shells out to a synthesis command
///
/// The command receives SSML on stdin and writes the audio byte stream to
/// stdout (e.g. `espeak-ng -m --stdout`, or a wrapper script around a cloud
/// provider). A voice catalog can be supplied as a JSON file.
pub struct CommandBackend {
    command: Vec<String>,
    voices_file: Option<PathBuf>,
}

impl CommandBackend {
    pub fn new(command: Vec<String>, voices_file: Option<PathBuf>) -> Result<Self> {
        if command.is_empty() {
            return Err(RelayError::Synthesis(
                "No synthesis command configured".to_string(),
            ));
        }

        Ok(Self {
            command,
            voices_file,
        })
    }

    fn load_voices(path: &Path) -> Result<Vec<VoiceInfo>> {
        let json = std::fs::read_to_string(path)?;
        let voices: Vec<VoiceInfo> = serde_json::from_str(&json)?;
        Ok(voices)
    }
}

impl SynthesisBackend for CommandBackend {
    fn synthesize(&self, ssml: &str) -> Result<AudioClip> {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| {
            RelayError::Synthesis(format!(
                "Failed to spawn synthesis command '{}': {}",
                self.command[0], e
            ))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(ssml.as_bytes())
                .map_err(|e| RelayError::Synthesis(format!("Failed to send SSML: {}", e)))?;
            // Close stdin so the engine knows the payload is complete.
        }

        let mut bytes = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_end(&mut bytes)
                .map_err(|e| RelayError::Synthesis(format!("Failed to read audio: {}", e)))?;
        }

        let status = child
            .wait()
            .map_err(|e| RelayError::Synthesis(format!("Synthesis command failed: {}", e)))?;

        if !status.success() {
            return Err(RelayError::Synthesis(format!(
                "Synthesis command exited with status {}",
                status
            )));
        }

        // An empty payload is a provider failure, not silence.
        if bytes.is_empty() {
            return Err(RelayError::Synthesis(
                "Synthesis produced no audio".to_string(),
            ));
        }

        Ok(AudioClip::new(bytes))
    }

    fn voices(&self) -> Result<Vec<VoiceInfo>> {
        match &self.voices_file {
            Some(path) => Self::load_voices(path),
            None => Ok(Vec::new()),
        }
    }
}

/// Asynchronous front end to a [`SynthesisBackend`]
///
/// `request` returns immediately; the result arrives later on the event
/// channel as [`AppEvent::SynthesisComplete`] or
/// [`AppEvent::SynthesisFailed`], decoupled from admission.
pub struct Synthesizer {
    backend: Arc<dyn SynthesisBackend>,
    events: EventSender,
}

impl Synthesizer {
    pub fn new(backend: Arc<dyn SynthesisBackend>, events: EventSender) -> Self {
        Self { backend, events }
    }

    /// Fire an asynchronous synthesis request for an admitted job
    pub fn request(&self, job: JobId, text: &str, options: &SpeechOptions) {
        let payload = ssml::build(text, options);
        debug!("Requesting synthesis for job {} ({} chars)", job, text.len());

        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        thread::spawn(move || {
            let event = match backend.synthesize(&payload) {
                Ok(clip) => {
                    debug!("Synthesis for job {} produced {} bytes", job, clip.len());
                    AppEvent::SynthesisComplete { job, clip }
                }
                Err(e) => AppEvent::SynthesisFailed {
                    job,
                    reason: e.to_string(),
                },
            };

            // The loop may already be gone during shutdown.
            if events.send(event).is_err() {
                warn!("Event loop closed before synthesis for job {} landed", job);
            }
        });
    }

    /// The provider's voice catalog, restricted to English locales
    ///
    /// Catalog loading failures are not fatal; voice selection commands
    /// simply report an empty catalog.
    pub fn english_voices(&self) -> Vec<VoiceInfo> {
        match self.backend.voices() {
            Ok(voices) => voices
                .into_iter()
                .filter(|v| v.locale.starts_with("en-"))
                .collect(),
            Err(e) => {
                warn!("Failed to load voice catalog: {}", e);
                Vec::new()
            }
        }
    }
}
