//! Application core: event handling and voice-session lifecycle
//!
//! One `App` owns the session context, the synthesizer, and the current
//! queue/sink pair. Every event handler runs to completion on the loop
//! thread before the next event is processed, so no locks guard queue or
//! session state.

use crate::commands::{self, CommandInvocation};
use crate::event::AppEvent;
use crate::gateway::ChatGateway;
use crate::relay::{self, InboundMessage, RelayDecision, FOCUSED_RATE};
use crate::session::{ChannelRef, Session, UserRef};
use crate::speech::{
    on_transition, AudioClip, AudioSink, JobId, PlaybackQueue, SinkTransition, SpeechOptions,
    Synthesizer, VoiceInfo,
};
use crate::Result;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How long a dropped voice connection may re-signal before we treat the
/// disconnect as genuine
pub const RECONNECT_GRACE: Duration = Duration::from_secs(5);

/// Default event-loop wakeup interval
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The queue/sink pair for one voice session
///
/// Constructed fresh on every connect and discarded whole on teardown;
/// a reconnect never reuses either half.
struct VoiceOutput {
    queue: PlaybackQueue,
    sink: Box<dyn AudioSink>,
}

/// Application state driven by the event loop
pub struct App {
    pub session: Session,

    /// Provider voice catalog (English locales only)
    pub voices: Vec<VoiceInfo>,

    synthesizer: Synthesizer,
    gateway: Box<dyn ChatGateway>,
    voice: Option<VoiceOutput>,

    /// Armed while a disconnect might still be transient re-signalling
    disconnect_deadline: Option<Instant>,
    reconnect_grace: Duration,

    snapshot_path: PathBuf,
    control_panel_url: String,
}

impl App {
    pub fn new(
        session: Session,
        synthesizer: Synthesizer,
        gateway: Box<dyn ChatGateway>,
        snapshot_path: PathBuf,
        control_panel_url: String,
    ) -> Self {
        let voices = synthesizer.english_voices();
        for voice in &voices {
            info!("Registered voice: {}", voice.short_name);
        }

        Self {
            session,
            voices,
            synthesizer,
            gateway,
            voice: None,
            disconnect_deadline: None,
            reconnect_grace: RECONNECT_GRACE,
            snapshot_path,
            control_panel_url,
        }
    }

    /// Is there an active voice connection (queue/sink pair)?
    pub fn connected(&self) -> bool {
        self.voice.is_some()
    }

    /// Override the disconnect grace window
    pub fn set_reconnect_grace(&mut self, grace: Duration) {
        self.reconnect_grace = grace;
    }

    pub fn control_panel_url(&self) -> String {
        format!(
            "{}?r={}",
            self.control_panel_url,
            self.session.data().guild_id
        )
    }

    /// Styles supported by the current voice; "neutral" is always offered
    pub fn current_voice_styles(&self) -> Vec<String> {
        let current = &self.session.data().voice_name;
        let mut styles = vec![crate::session::snapshot::DEFAULT_VOICE_STYLE.to_string()];
        if let Some(voice) = self.voices.iter().find(|v| &v.short_name == current) {
            styles.extend(voice.styles.iter().cloned());
        }
        styles
    }

    /// Process one event to completion
    ///
    /// Nothing from the speech pipeline propagates out of here; message
    /// relay is fire-and-forget and failures are log lines only.
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Message(message) => self.handle_message(message),
            AppEvent::Command(invocation) => self.handle_command_event(invocation),
            AppEvent::SynthesisComplete { job, clip } => self.on_synthesis_complete(job, clip),
            AppEvent::SynthesisFailed { job, reason } => self.on_synthesis_failed(job, &reason),
            AppEvent::SinkTransition(transition) => self.on_sink_transition(transition),
            AppEvent::VoiceDisconnected => self.on_voice_disconnected(),
            AppEvent::VoiceReconnecting => self.on_voice_reconnecting(),
            AppEvent::PanelSetMessages(bank) => {
                self.session.update(move |data| data.messages = bank);
                self.persist_snapshot();
            }
            AppEvent::PanelSendMessage(text) => self.on_panel_send(&text),
            AppEvent::Shutdown => debug!("Shutdown event reached the handler"),
        }
    }

    fn handle_message(&mut self, message: InboundMessage) {
        if message.guild_id != self.session.data().guild_id {
            // Not the guild we care about.
            return;
        }

        let decision = relay::evaluate(&message, self.session.data(), self.connected());
        match decision {
            RelayDecision::Accept { rate } => {
                info!("{}: \"{}\"", message.author_name, message.content);
                let options = self.session.data().speech_options(rate);
                self.speak(&message.content, &options);
            }
            RelayDecision::NoConnection => {
                warn!("Can't speak message - no voice connection");
            }
            RelayDecision::UnknownSender
            | RelayDecision::NotFocused
            | RelayDecision::WrongChannel => {
                debug!("Relay rejected message: {:?}", decision);
            }
        }
    }

    /// Admit a playback job and fire its synthesis request
    ///
    /// Best-effort: with no active sink this is a no-op beyond a warning,
    /// since there is no interaction to report an error to.
    pub fn speak(&mut self, text: &str, options: &SpeechOptions) {
        let Some(voice) = self.voice.as_mut() else {
            warn!("Tried to play speech, but there is no active sink");
            return;
        };

        let job = voice.queue.admit(text);
        self.synthesizer.request(job, text, options);
    }

    fn on_synthesis_complete(&mut self, job: JobId, clip: AudioClip) {
        let Some(voice) = self.voice.as_mut() else {
            debug!("Synthesis for job {} finished after session teardown", job);
            return;
        };

        if !voice.queue.attach_audio(job, clip) {
            // Evicted before its audio arrived; expected under backlog.
            return;
        }

        // The sink may already be idle with the queue stalled only on this
        // audio, so try to advance immediately.
        if let Err(e) = voice.queue.tick(voice.sink.as_mut()) {
            error!("Playback failed: {}", e);
        }
    }

    fn on_synthesis_failed(&mut self, job: JobId, reason: &str) {
        error!("Error synthesizing speech: {}", reason);
        if let Some(voice) = self.voice.as_mut() {
            voice.queue.fail(job);
        }
    }

    fn on_sink_transition(&mut self, transition: SinkTransition) {
        let Some(voice) = self.voice.as_mut() else {
            return;
        };

        if let Err(e) = on_transition(transition, &mut voice.queue, voice.sink.as_mut()) {
            error!("Playback failed: {}", e);
        }
    }

    fn handle_command_event(&mut self, invocation: CommandInvocation) {
        if invocation.guild_id != self.session.data().guild_id {
            return;
        }

        let reply = commands::dispatch(self, &invocation);
        if let Err(e) = self
            .gateway
            .send_to_channel(&invocation.channel.id, &reply.content)
        {
            error!("Failed to deliver command reply: {}", e);
        }
    }

    fn on_panel_send(&mut self, text: &str) {
        debug!("Panel send-message: {}", text);

        let channel_id = self
            .session
            .data()
            .text_channel
            .as_ref()
            .map(|channel| channel.id.clone());
        if let Some(channel_id) = channel_id {
            if let Err(e) = self.gateway.send_to_channel(&channel_id, text) {
                error!("Failed to post panel message: {}", e);
            }
        }

        if self.connected() {
            let options = self.session.data().speech_options(FOCUSED_RATE);
            self.speak(text, &options);
        }
    }

    fn on_voice_disconnected(&mut self) {
        if !self.connected() {
            return;
        }
        warn!(
            "Voice connection dropped; waiting {:?} for re-signalling",
            self.reconnect_grace
        );
        self.disconnect_deadline = Some(Instant::now() + self.reconnect_grace);
    }

    fn on_voice_reconnecting(&mut self) {
        if self.disconnect_deadline.take().is_some() {
            // Moving between channels; the connection recovers on its own.
            info!("Voice connection is re-signalling; disconnect was transient");
        }
    }

    /// Join a voice channel, building a fresh queue/sink pair
    pub(crate) fn connect_voice(
        &mut self,
        voice_channel: &ChannelRef,
        user: &UserRef,
        text_channel: &ChannelRef,
    ) -> Result<()> {
        // Never share a pair across sessions; discard the old one first.
        if self.voice.is_some() {
            self.teardown_voice(false);
        }

        let sink = self.gateway.connect_voice(voice_channel)?;
        self.voice = Some(VoiceOutput {
            queue: PlaybackQueue::new(),
            sink,
        });
        self.disconnect_deadline = None;

        info!("Connected to voice channel '{}'", voice_channel.name);

        let voice_channel = voice_channel.clone();
        let user = user.clone();
        let text_channel = text_channel.clone();
        self.session.update(move |data| {
            data.voice_channel = Some(voice_channel);
            data.focused_user = Some(user);
            data.text_channel = Some(text_channel);
        });

        Ok(())
    }

    /// Tear the voice session down: clear the queue, release the sink
    ///
    /// Outstanding synthesis completions for abandoned jobs become no-ops.
    pub fn teardown_voice(&mut self, clear_text_channel: bool) {
        if let Some(mut voice) = self.voice.take() {
            voice.queue.clear();
            if let Err(e) = voice.sink.stop() {
                warn!("Failed to stop sink cleanly: {}", e);
            }
        }
        self.disconnect_deadline = None;

        self.session.update(move |data| {
            data.voice_channel = None;
            data.focused_user = None;
            if clear_text_channel {
                data.text_channel = None;
            }
        });
    }

    /// Write the persisted slice of session state, logging on failure
    pub fn persist_snapshot(&self) {
        let snapshot = self.session.data().snapshot();
        if let Err(e) = snapshot.save(&self.snapshot_path) {
            warn!("Failed to save snapshot: {}", e);
        }
    }

    /// Housekeeping between events: reap sink transitions and check the
    /// reconnect deadline
    pub fn poll(&mut self) {
        if let Some(voice) = self.voice.as_mut() {
            let VoiceOutput { queue, sink } = voice;
            while let Some(transition) = sink.poll() {
                if let Err(e) = on_transition(transition, queue, sink.as_mut()) {
                    error!("Playback failed: {}", e);
                }
            }
        }

        if let Some(deadline) = self.disconnect_deadline {
            if Instant::now() >= deadline {
                self.disconnect_deadline = None;
                error!("Lost voice connection");
                self.teardown_voice(false);
            }
        }
    }

    /// How long the event loop may sleep before the next housekeeping pass
    pub fn next_timeout(&self) -> Duration {
        match self.disconnect_deadline {
            Some(deadline) => deadline
                .saturating_duration_since(Instant::now())
                .min(POLL_INTERVAL),
            None => POLL_INTERVAL,
        }
    }
}
