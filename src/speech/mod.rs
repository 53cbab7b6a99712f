//! Speech pipeline: playback queue, synthesis client, output sink

pub mod queue;
pub mod sink;
pub mod ssml;
pub mod synth;

pub use queue::{AudioClip, JobId, PlaybackQueue, MAX_QUEUE_SIZE};
pub use sink::{on_transition, AudioSink, ProcessSink, SinkState, SinkTransition};
pub use synth::{CommandBackend, SpeechOptions, SynthesisBackend, Synthesizer, VoiceInfo};
