//! Playback queue coordinating synthesis completion with single-stream playback
//!
//! Jobs are admitted in message-arrival order and played in exactly that
//! order, even though synthesized audio arrives out of order and at
//! unpredictable latency. The queue is bounded: when a fifth job is admitted
//! the oldest one is evicted, played or not. Dropping a stale message is
//! preferred over letting the speech backlog grow behind real time.

use crate::speech::sink::{AudioSink, SinkState};
use crate::Result;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Maximum number of jobs resident in the queue at once
pub const MAX_QUEUE_SIZE: usize = 4;

/// Identifier for a speech job
///
/// Ids are process-unique so that a completion for a job admitted to a
/// previous session's queue can never be mistaken for a current job.
pub type JobId = u64;

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Synthesized audio: an opaque, playable byte stream in the provider's
/// fixed compressed mono format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One pending or completed speech request
///
/// `audio` is `None` until the synthesis client completes, and transitions to
/// `Some` exactly once. Identity is the id, never the text: two jobs with
/// identical text are distinct.
struct Job {
    id: JobId,
    text: String,
    audio: Option<AudioClip>,
}

/// Ordered, bounded buffer of pending speech jobs
///
/// Consumed strictly from the head: a job never plays before jobs admitted
/// earlier, and the head blocks all progress until its audio is present.
pub struct PlaybackQueue {
    jobs: VecDeque<Job>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    /// Append a new job with no audio yet, evicting the head if the queue
    /// would exceed [`MAX_QUEUE_SIZE`]
    ///
    /// Always succeeds; capacity pressure is resolved by eviction, never by
    /// rejecting the new job. The caller is responsible for firing the
    /// asynchronous synthesis request for the returned id.
    pub fn admit(&mut self, text: &str) -> JobId {
        let id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        self.jobs.push_back(Job {
            id,
            text: text.to_string(),
            audio: None,
        });

        while self.jobs.len() > MAX_QUEUE_SIZE {
            if let Some(evicted) = self.jobs.pop_front() {
                debug!(
                    "Queue full, evicting job {} (\"{}\")",
                    evicted.id, evicted.text
                );
            }
        }

        id
    }

    /// Attach synthesized audio to a resident job
    ///
    /// Returns false if the job has already been evicted or played; a late
    /// completion for a departed job is expected and silently discarded.
    /// The caller should attempt a tick after a successful attach.
    pub fn attach_audio(&mut self, id: JobId, clip: AudioClip) -> bool {
        match self.jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                job.audio = Some(clip);
                true
            }
            None => {
                debug!("Audio for job {} arrived after it left the queue", id);
                false
            }
        }
    }

    /// Drop a job whose synthesis failed
    ///
    /// No-op if the job is no longer resident. No retry is attempted.
    pub fn fail(&mut self, id: JobId) {
        if let Some(index) = self.jobs.iter().position(|job| job.id == id) {
            if let Some(job) = self.jobs.remove(index) {
                warn!("Dropping job {} (\"{}\") after synthesis failure", job.id, job.text);
            }
        }
    }

    /// Attempt to play the head job
    ///
    /// Idempotent; safe to call any number of times. Plays iff the queue is
    /// non-empty, the head job's audio has arrived, and the sink is idle.
    /// This is the only path by which a job leaves the queue via successful
    /// playback. Returns whether a play command was issued.
    pub fn tick(&mut self, sink: &mut dyn AudioSink) -> Result<bool> {
        let Some(head) = self.jobs.front() else {
            return Ok(false);
        };

        if head.audio.is_none() {
            // Head job is still waiting on synthesis; no skipping ahead to a
            // later, ready job.
            return Ok(false);
        }

        if sink.state() != SinkState::Idle {
            // Cannot preempt current playback.
            return Ok(false);
        }

        // Checked above that the head exists and carries audio.
        let Some(job) = self.jobs.pop_front() else {
            return Ok(false);
        };
        let Some(clip) = job.audio else {
            return Ok(false);
        };

        debug!("Playing job {} (\"{}\")", job.id, job.text);
        sink.play(clip)?;
        Ok(true)
    }

    /// Empty the queue, abandoning all pending jobs
    ///
    /// Outstanding synthesis completions for the abandoned jobs become
    /// no-ops via the residency check in [`attach_audio`]. Used when the
    /// voice session is torn down.
    ///
    /// [`attach_audio`]: PlaybackQueue::attach_audio
    pub fn clear(&mut self) {
        if !self.jobs.is_empty() {
            debug!("Clearing {} pending job(s)", self.jobs.len());
        }
        self.jobs.clear();
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}
