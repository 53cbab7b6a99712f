//! End-to-end tests for the relay pipeline
//!
//! Drives the application the way the event loop does: gateway traffic and
//! synthesis completions arrive as events, and playback is observed through
//! a scripted sink handed out by a fake gateway. The synthesis backend is
//! `cat`, so each "clip" is the SSML payload itself and carries the message
//! text it was built from.

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ttsrelay::app::App;
use ttsrelay::commands::{Command, CommandInvocation};
use ttsrelay::event::AppEvent;
use ttsrelay::gateway::ChatGateway;
use ttsrelay::relay::InboundMessage;
use ttsrelay::session::{ChannelRef, Session, Snapshot, UserRef};
use ttsrelay::speech::{AudioClip, AudioSink, CommandBackend, SinkState, SinkTransition, Synthesizer};
use ttsrelay::Result;

const GUILD: &str = "guild-1";

#[derive(Default)]
struct SinkShared {
    state: Option<SinkState>,
    played: Vec<Vec<u8>>,
}

impl SinkShared {
    fn state(&self) -> SinkState {
        self.state.unwrap_or(SinkState::Idle)
    }
}

/// Sink handed out by the fake gateway; playback finishes only when the
/// test says so
struct FakeSink {
    shared: Arc<Mutex<SinkShared>>,
}

impl AudioSink for FakeSink {
    fn play(&mut self, clip: AudioClip) -> Result<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.played.push(clip.bytes);
        shared.state = Some(SinkState::Playing);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.shared.lock().unwrap().state = Some(SinkState::Stopped);
        Ok(())
    }

    fn state(&self) -> SinkState {
        self.shared.lock().unwrap().state()
    }

    fn poll(&mut self) -> Option<SinkTransition> {
        None
    }
}

#[derive(Default)]
struct FakeGateway {
    sink: Arc<Mutex<SinkShared>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl ChatGateway for FakeGateway {
    fn connect_voice(&mut self, _channel: &ChannelRef) -> Result<Box<dyn AudioSink>> {
        self.sink.lock().unwrap().state = Some(SinkState::Idle);
        Ok(Box::new(FakeSink {
            shared: Arc::clone(&self.sink),
        }))
    }

    fn send_to_channel(&mut self, channel_id: &str, content: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }
}

struct Harness {
    app: App,
    rx: Receiver<AppEvent>,
    sink: Arc<Mutex<SinkShared>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
    snapshot_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with_voices(None)
}

fn harness_with_voices(voices_json: Option<&str>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("snapshot.json");

    let voices_file = voices_json.map(|json| {
        let path = dir.path().join("voices.json");
        std::fs::write(&path, json).unwrap();
        path
    });

    let (tx, rx) = mpsc::channel();
    let backend = Arc::new(CommandBackend::new(vec!["cat".to_string()], voices_file).unwrap());
    let synthesizer = Synthesizer::new(backend, tx);

    let gateway = FakeGateway::default();
    let sink = Arc::clone(&gateway.sink);
    let sent = Arc::clone(&gateway.sent);

    let session = Session::new(GUILD, vec!["bridge-bot".to_string()], Snapshot::default());
    let app = App::new(
        session,
        synthesizer,
        Box::new(gateway),
        snapshot_path.clone(),
        "http://panel.local".to_string(),
    );

    Harness {
        app,
        rx,
        sink,
        sent,
        snapshot_path,
        _dir: dir,
    }
}

fn alice() -> UserRef {
    UserRef {
        id: "alice".to_string(),
        name: "Alice".to_string(),
    }
}

fn text_channel() -> ChannelRef {
    ChannelRef {
        id: "general".to_string(),
        name: "general".to_string(),
    }
}

fn join_invocation() -> CommandInvocation {
    CommandInvocation {
        guild_id: GUILD.to_string(),
        user: alice(),
        channel: text_channel(),
        command: Command::Join {
            voice_channel: ChannelRef {
                id: "vc-1".to_string(),
                name: "Voice".to_string(),
            },
        },
    }
}

fn message(content: &str) -> AppEvent {
    AppEvent::Message(InboundMessage {
        guild_id: GUILD.to_string(),
        channel_id: "general".to_string(),
        author_id: Some("alice".to_string()),
        author_name: "Alice".to_string(),
        content: content.to_string(),
    })
}

/// Collect `n` synthesis outcomes from the worker threads
fn collect_completions(rx: &Receiver<AppEvent>, n: usize) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while events.len() < n {
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            event @ (AppEvent::SynthesisComplete { .. } | AppEvent::SynthesisFailed { .. }) => {
                events.push(event)
            }
            _ => {}
        }
    }
    events
}

fn job_of(event: &AppEvent) -> u64 {
    match event {
        AppEvent::SynthesisComplete { job, .. } | AppEvent::SynthesisFailed { job, .. } => *job,
        _ => panic!("not a synthesis outcome"),
    }
}

/// Tell the app the current clip finished
fn finish_playback(h: &mut Harness) {
    h.sink.lock().unwrap().state = Some(SinkState::Idle);
    h.app.handle_event(AppEvent::SinkTransition(SinkTransition {
        old: SinkState::Playing,
        new: SinkState::Idle,
    }));
}

fn played(h: &Harness) -> Vec<String> {
    h.sink
        .lock()
        .unwrap()
        .played
        .iter()
        .map(|bytes| String::from_utf8_lossy(bytes).to_string())
        .collect()
}

#[test]
fn test_messages_play_in_arrival_order_despite_reversed_completions() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));
    assert!(h.app.connected());

    h.app.handle_event(message("first message"));
    h.app.handle_event(message("second message"));

    // Deliver the completions newest-first; admission order must still win.
    let mut completions = collect_completions(&h.rx, 2);
    completions.sort_by_key(|event| std::cmp::Reverse(job_of(event)));
    for event in completions {
        h.app.handle_event(event);
    }

    // Only the first message is playing; the second waits its turn.
    {
        let clips = played(&h);
        assert_eq!(clips.len(), 1);
        assert!(clips[0].contains("first message"));
    }

    finish_playback(&mut h);
    let clips = played(&h);
    assert_eq!(clips.len(), 2);
    assert!(clips[1].contains("second message"));
}

#[test]
fn test_leave_abandons_inflight_synthesis() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));
    h.app.handle_event(message("never spoken"));

    let completions = collect_completions(&h.rx, 1);

    h.app.handle_event(AppEvent::Command(CommandInvocation {
        guild_id: GUILD.to_string(),
        user: alice(),
        channel: text_channel(),
        command: Command::Leave,
    }));
    assert!(!h.app.connected());

    // The completion lands after teardown and must do nothing.
    for event in completions {
        h.app.handle_event(event);
    }
    assert!(played(&h).is_empty());
}

#[test]
fn test_rejoin_does_not_resurrect_old_jobs() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));
    h.app.handle_event(message("from the old session"));
    let completions = collect_completions(&h.rx, 1);

    // Rejoin builds a fresh queue; the old job id is gone for good.
    h.app.handle_event(AppEvent::Command(join_invocation()));
    for event in completions {
        h.app.handle_event(event);
    }
    assert!(played(&h).is_empty());
}

#[test]
fn test_unfocused_and_foreign_guild_messages_are_ignored() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));

    h.app.handle_event(AppEvent::Message(InboundMessage {
        guild_id: GUILD.to_string(),
        channel_id: "general".to_string(),
        author_id: Some("mallory".to_string()),
        author_name: "Mallory".to_string(),
        content: "not for you".to_string(),
    }));
    h.app.handle_event(AppEvent::Message(InboundMessage {
        guild_id: "other-guild".to_string(),
        channel_id: "general".to_string(),
        author_id: Some("alice".to_string()),
        author_name: "Alice".to_string(),
        content: "wrong guild".to_string(),
    }));

    // Neither message may reach synthesis.
    assert!(h
        .rx
        .recv_timeout(Duration::from_millis(200))
        .is_err());
    assert!(played(&h).is_empty());
}

#[test]
fn test_override_sender_speaks_faster_from_any_channel() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));

    h.app.handle_event(AppEvent::Message(InboundMessage {
        guild_id: GUILD.to_string(),
        channel_id: "somewhere-else".to_string(),
        author_id: Some("bridge-bot".to_string()),
        author_name: "Bridge".to_string(),
        content: "announcement".to_string(),
    }));

    for event in collect_completions(&h.rx, 1) {
        h.app.handle_event(event);
    }

    let clips = played(&h);
    assert_eq!(clips.len(), 1);
    assert!(clips[0].contains("announcement"));
    assert!(clips[0].contains("rate=\"1.5\""));
}

#[test]
fn test_transient_disconnect_keeps_session_alive() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));

    h.app.handle_event(AppEvent::VoiceDisconnected);
    h.app.handle_event(AppEvent::VoiceReconnecting);
    h.app.poll();

    assert!(h.app.connected());

    h.app.handle_event(message("still here"));
    for event in collect_completions(&h.rx, 1) {
        h.app.handle_event(event);
    }
    assert_eq!(played(&h).len(), 1);
}

#[test]
fn test_expired_disconnect_tears_the_session_down() {
    let mut h = harness();
    h.app.set_reconnect_grace(Duration::from_millis(20));
    h.app.handle_event(AppEvent::Command(join_invocation()));

    h.app.handle_event(message("doomed"));
    let completions = collect_completions(&h.rx, 1);

    // No re-signalling arrives; the grace window lapses.
    h.app.handle_event(AppEvent::VoiceDisconnected);
    std::thread::sleep(Duration::from_millis(50));
    h.app.poll();
    assert!(!h.app.connected());

    // The queue died with the session; its completion must not play.
    for event in completions {
        h.app.handle_event(event);
    }
    assert!(played(&h).is_empty());
}

#[test]
fn test_set_voice_matches_names_case_insensitively() {
    let voices = r#"[
        {"short_name": "en-GB-RyanNeural", "local_name": "Ryan",
         "locale": "en-GB", "styles": []}
    ]"#;
    let mut h = harness_with_voices(Some(voices));

    h.app.handle_event(AppEvent::Command(CommandInvocation {
        guild_id: GUILD.to_string(),
        user: alice(),
        channel: text_channel(),
        command: Command::SetVoice {
            name: "ryan".to_string(),
        },
    }));

    let snapshot = Snapshot::load(&h.snapshot_path);
    assert_eq!(snapshot.voice_name, "en-GB-RyanNeural");
}

#[test]
fn test_set_voice_persists_snapshot_and_resets_style() {
    let voices = r#"[
        {"short_name": "en-GB-RyanNeural", "local_name": "Ryan",
         "locale": "en-GB", "styles": ["chat", "cheerful"]},
        {"short_name": "fr-FR-DeniseNeural", "local_name": "Denise",
         "locale": "fr-FR", "styles": []}
    ]"#;
    let mut h = harness_with_voices(Some(voices));
    assert_eq!(h.app.voices.len(), 1, "non-English voices are filtered");

    h.app.handle_event(AppEvent::Command(CommandInvocation {
        guild_id: GUILD.to_string(),
        user: alice(),
        channel: text_channel(),
        command: Command::SetStyle {
            style: "chat".to_string(),
        },
    }));
    // Default voice carries no "chat" style; nothing persisted yet.
    assert!(!h.snapshot_path.exists());

    h.app.handle_event(AppEvent::Command(CommandInvocation {
        guild_id: GUILD.to_string(),
        user: alice(),
        channel: text_channel(),
        command: Command::SetVoice {
            name: "Ryan".to_string(),
        },
    }));

    let snapshot = Snapshot::load(&h.snapshot_path);
    assert_eq!(snapshot.voice_name, "en-GB-RyanNeural");
    assert_eq!(snapshot.voice_language, "en-GB");
    assert_eq!(snapshot.voice_style, "neutral");

    // The new voice does support "chat".
    h.app.handle_event(AppEvent::Command(CommandInvocation {
        guild_id: GUILD.to_string(),
        user: alice(),
        channel: text_channel(),
        command: Command::SetStyle {
            style: "chat".to_string(),
        },
    }));
    let snapshot = Snapshot::load(&h.snapshot_path);
    assert_eq!(snapshot.voice_style, "chat");
}

#[test]
fn test_speakme_rebinds_focus() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));

    // Bob takes over from a different text channel.
    h.app.handle_event(AppEvent::Command(CommandInvocation {
        guild_id: GUILD.to_string(),
        user: UserRef {
            id: "bob".to_string(),
            name: "Bob".to_string(),
        },
        channel: ChannelRef {
            id: "dev".to_string(),
            name: "dev".to_string(),
        },
        command: Command::SpeakMe,
    }));

    // Alice's messages no longer relay; Bob's do.
    h.app.handle_event(message("from alice"));
    h.app.handle_event(AppEvent::Message(InboundMessage {
        guild_id: GUILD.to_string(),
        channel_id: "dev".to_string(),
        author_id: Some("bob".to_string()),
        author_name: "Bob".to_string(),
        content: "from bob".to_string(),
    }));

    for event in collect_completions(&h.rx, 1) {
        h.app.handle_event(event);
    }
    let clips = played(&h);
    assert_eq!(clips.len(), 1);
    assert!(clips[0].contains("from bob"));
}

#[test]
fn test_panel_message_bank_edit_is_persisted() {
    let mut h = harness();

    let mut bank = ttsrelay::session::MessageBank::default();
    bank.groups.push(ttsrelay::session::MessageGroup {
        name: "quick".to_string(),
        messages: vec!["brb".to_string()],
    });
    h.app.handle_event(AppEvent::PanelSetMessages(bank.clone()));

    let snapshot = Snapshot::load(&h.snapshot_path);
    assert_eq!(snapshot.messages, bank);
}

#[test]
fn test_command_replies_reach_the_invoking_channel() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));

    let sent = h.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "general");
    assert!(sent[0].1.contains("Alice"));
    assert!(sent[0].1.contains("http://panel.local?r=guild-1"));
}

#[test]
fn test_panel_message_is_posted_and_spoken() {
    let mut h = harness();
    h.app.handle_event(AppEvent::Command(join_invocation()));
    h.sent.lock().unwrap().clear();

    h.app
        .handle_event(AppEvent::PanelSendMessage("on my way".to_string()));

    {
        let sent = h.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "general");
        assert_eq!(sent[0].1, "on my way");
    }

    for event in collect_completions(&h.rx, 1) {
        h.app.handle_event(event);
    }
    let clips = played(&h);
    assert_eq!(clips.len(), 1);
    assert!(clips[0].contains("on my way"));
}
