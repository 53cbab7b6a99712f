//! ttsrelay main entry point
//!
//! Console mode: stdin lines act as the focused user's chat messages, the
//! configured player command takes the place of a voice connection, and the
//! event loop drives the same relay pipeline a gateway adapter would.

use log::{debug, error, info};
use std::io::{self, BufRead};
use std::process;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use ttsrelay::app::App;
use ttsrelay::commands::{Command, CommandInvocation};
use ttsrelay::config::Config;
use ttsrelay::event::{AppEvent, EventSender};
use ttsrelay::gateway::LocalGateway;
use ttsrelay::relay::InboundMessage;
use ttsrelay::session::{ChannelRef, Session, Snapshot, UserRef};
use ttsrelay::speech::{CommandBackend, Synthesizer};
use ttsrelay::Result;

/// Identity used for messages typed on the console
const CONSOLE_USER_ID: &str = "console-user";
const CONSOLE_CHANNEL_ID: &str = "console";

fn main() {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let debug_mode = args.iter().any(|arg| arg == "--debug" || arg == "-d");

    // Initialize logger
    if debug_mode {
        // Debug mode: write to ttsrelay.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("ttsrelay.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!(
                    "Warning: Failed to open ttsrelay.log for debug logging: {}",
                    e
                );
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "ttsrelay version {} starting (debug mode, logging to ttsrelay.log)",
            ttsrelay::VERSION
        );
    } else {
        // Normal mode: minimal logging to stderr, only errors
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    // Run the application
    if let Err(e) = run() {
        error!("Fatal error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    debug!("Initializing ttsrelay");

    let config = Config::load()?;
    info!("Config loaded from {:?}", config.path());

    let snapshot_path = config.snapshot_path();
    let snapshot = Snapshot::load(&snapshot_path);

    let mut session = Session::new(&config.guild_id(), config.override_users(), snapshot);

    let (tx, rx) = mpsc::channel();

    let backend = Arc::new(CommandBackend::new(
        config.synth_command(),
        config.voices_file(),
    )?);
    let synthesizer = Synthesizer::new(backend, tx.clone());

    let gateway = Box::new(LocalGateway::new(config.player_command()));

    // Console panels aren't wired to a transport; log state changes instead.
    session.observe(|data| {
        debug!(
            "Session changed: voice={:?} focus={:?}",
            data.voice_channel.as_ref().map(|c| &c.name),
            data.focused_user.as_ref().map(|u| &u.name),
        );
    });

    let mut app = App::new(
        session,
        synthesizer,
        gateway,
        snapshot_path,
        config.control_panel_url(),
    );

    spawn_console_reader(tx.clone(), config.guild_id());

    println!("ttsrelay {} ready", ttsrelay::VERSION);
    println!("Configuration loaded: {}", config.path().display());
    println!("Type messages to speak them; /quit to exit");

    // Join the console "voice channel" so typed messages relay immediately.
    app.handle_event(AppEvent::Command(console_join(&config.guild_id())));

    // Main event loop
    // All queue and session mutation happens here, one event at a time.
    loop {
        match rx.recv_timeout(app.next_timeout()) {
            Ok(AppEvent::Shutdown) => {
                info!("Shutting down");
                app.teardown_voice(true);
                app.persist_snapshot();
                return Ok(());
            }
            Ok(event) => app.handle_event(event),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // Every sender hung up; nothing left to relay.
                info!("Event channel closed");
                return Ok(());
            }
        }

        app.poll();
    }
}

/// Turn console stdin lines into inbound chat messages
///
/// The reader thread owns stdin and only ever sends events; it never touches
/// application state directly.
fn spawn_console_reader(events: EventSender, guild_id: String) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }

            let event = if line == "/quit" {
                AppEvent::Shutdown
            } else {
                AppEvent::Message(InboundMessage {
                    guild_id: guild_id.clone(),
                    channel_id: CONSOLE_CHANNEL_ID.to_string(),
                    author_id: Some(CONSOLE_USER_ID.to_string()),
                    author_name: "console".to_string(),
                    content: line,
                })
            };

            let quitting = matches!(event, AppEvent::Shutdown);
            if events.send(event).is_err() || quitting {
                break;
            }
        }

        // stdin closed; treat it like /quit.
        let _ = events.send(AppEvent::Shutdown);
    });
}

/// The implicit /join that binds the console session
fn console_join(guild_id: &str) -> CommandInvocation {
    CommandInvocation {
        guild_id: guild_id.to_string(),
        user: UserRef {
            id: CONSOLE_USER_ID.to_string(),
            name: "console".to_string(),
        },
        channel: ChannelRef {
            id: CONSOLE_CHANNEL_ID.to_string(),
            name: "console".to_string(),
        },
        command: Command::Join {
            voice_channel: ChannelRef {
                id: "local-audio".to_string(),
                name: "local audio".to_string(),
            },
        },
    }
}
