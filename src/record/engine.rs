//! Pause-aware, duration-limited recording.
//!
//! Elapsed time is `now - start - paused_total - current_pause`, floored to whole seconds. The
//! host calls [`RecordingEngine::tick`] every [`RecorderOpts::tick_interval_ms`]; while recording,
//! each tick reports the elapsed seconds and auto-stops once the optional limit is reached.

use std::rc::Rc;

use crate::foundation::clock::Clock;
use crate::foundation::error::{InkreelError, InkreelResult};
use crate::media::track::MediaStream;
use crate::record::encoder::{EncoderConfig, MediaEncoder};
use crate::record::session::RecorderState;

/// Preferred recording format.
pub const PREFERRED_MIME: &str = "video/webm;codecs=vp9,opus";
/// Used when [`PREFERRED_MIME`] is unsupported.
pub const FALLBACK_MIME: &str = "video/webm";

/// Recorder configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecorderOpts {
    /// First-choice mime.
    pub preferred_mime: String,
    /// Second-choice mime.
    pub fallback_mime: String,
    /// Encoder chunking interval.
    pub chunk_interval_ms: u64,
    /// Host tick cadence.
    pub tick_interval_ms: u64,
    /// Target video bitrate.
    pub video_bits_per_second: u32,
    /// Auto-stop limit.
    pub max_duration_secs: Option<u64>,
}

impl Default for RecorderOpts {
    fn default() -> Self {
        Self {
            preferred_mime: PREFERRED_MIME.to_string(),
            fallback_mime: FALLBACK_MIME.to_string(),
            chunk_interval_ms: 1000,
            tick_interval_ms: 500,
            video_bits_per_second: 2_500_000,
            max_duration_secs: None,
        }
    }
}

impl RecorderOpts {
    /// Defaults with `INKREEL_TICK_MS` and `INKREEL_CHUNK_MS` overrides applied.
    ///
    /// Unparseable or zero values are ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tick_interval_ms = std::env::var("INKREEL_TICK_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.tick_interval_ms);
        let chunk_interval_ms = std::env::var("INKREEL_CHUNK_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.chunk_interval_ms);
        Self {
            tick_interval_ms,
            chunk_interval_ms,
            ..defaults
        }
    }

    /// Set the auto-stop limit.
    pub fn with_max_duration(mut self, secs: Option<u64>) -> Self {
        self.max_duration_secs = secs;
        self
    }
}

/// Styling band of the countdown bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Urgency {
    /// At most 75% used.
    Normal,
    /// More than 75% used.
    Warning,
    /// More than 90% used.
    Critical,
}

/// Fraction of the duration limit already recorded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DurationProgress {
    /// `elapsed / max`, capped at 1.
    pub ratio: f64,
    /// Band derived from `ratio`.
    pub urgency: Urgency,
}

impl DurationProgress {
    /// `None` when `max_secs` is zero.
    pub fn new(elapsed_secs: u64, max_secs: u64) -> Option<Self> {
        if max_secs == 0 {
            return None;
        }
        let ratio = (elapsed_secs as f64 / max_secs as f64).min(1.0);
        let urgency = if ratio > 0.9 {
            Urgency::Critical
        } else if ratio > 0.75 {
            Urgency::Warning
        } else {
            Urgency::Normal
        };
        Some(Self { ratio, urgency })
    }
}

/// One contiguous encoded recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedClip {
    /// Concatenated encoder chunks.
    pub bytes: Vec<u8>,
    /// Mime the encoder produced.
    pub mime: String,
    /// Whole seconds of active recording.
    pub duration_secs: u64,
}

/// Notifications produced by [`RecordingEngine::tick`].
#[derive(Debug)]
pub enum RecorderEvent {
    /// Elapsed whole seconds.
    Duration(u64),
    /// The engine stopped on its own (duration limit).
    Stopped(RecordedClip),
    /// The encoder failed; the attempt is over.
    Failed(InkreelError),
}

/// Recording engine over a [`MediaEncoder`].
pub struct RecordingEngine<E: MediaEncoder> {
    encoder: E,
    clock: Rc<dyn Clock>,
    opts: RecorderOpts,
    state: RecorderState,
    mime: Option<String>,
    chunks: Vec<Vec<u8>>,
    start_ms: u64,
    paused_ms: u64,
    pause_start_ms: u64,
    final_elapsed_ms: u64,
    clip: Option<RecordedClip>,
    pending: Vec<RecorderEvent>,
    error: Option<String>,
}

impl<E: MediaEncoder> std::fmt::Debug for RecordingEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingEngine")
            .field("state", &self.state)
            .field("mime", &self.mime)
            .field("chunks", &self.chunks.len())
            .finish_non_exhaustive()
    }
}

impl<E: MediaEncoder> RecordingEngine<E> {
    /// Idle engine.
    pub fn new(encoder: E, clock: Rc<dyn Clock>, opts: RecorderOpts) -> Self {
        Self {
            encoder,
            clock,
            opts,
            state: RecorderState::Idle,
            mime: None,
            chunks: Vec::new(),
            start_ms: 0,
            paused_ms: 0,
            pause_start_ms: 0,
            final_elapsed_ms: 0,
            clip: None,
            pending: Vec::new(),
            error: None,
        }
    }

    /// Current state. Never `Uploading` or `Success`; those belong to the session.
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Options in effect.
    pub fn opts(&self) -> &RecorderOpts {
        &self.opts
    }

    /// Change the auto-stop limit. Takes effect on the next tick.
    pub fn set_max_duration(&mut self, secs: Option<u64>) {
        self.opts.max_duration_secs = secs;
    }

    /// Mime picked at start.
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// Clock time at which recording started.
    pub fn start_ms(&self) -> Option<u64> {
        (self.state != RecorderState::Idle).then_some(self.start_ms)
    }

    /// Borrow the encoder.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Mutably borrow the encoder.
    pub fn encoder_mut(&mut self) -> &mut E {
        &mut self.encoder
    }

    /// Display message of the failure that moved the engine to `Error`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Last finished clip.
    pub fn clip(&self) -> Option<&RecordedClip> {
        self.clip.as_ref()
    }

    fn pick_mime(&self) -> Option<String> {
        [&self.opts.preferred_mime, &self.opts.fallback_mime]
            .into_iter()
            .find(|m| self.encoder.is_type_supported(m))
            .cloned()
    }

    /// Start capturing `stream`, resetting buffers and pause accounting.
    ///
    /// Only legal from `Idle`; a finished, previewed or failed attempt must be [`reset`] first.
    ///
    /// [`reset`]: RecordingEngine::reset
    #[tracing::instrument(skip(self, stream), fields(tracks = stream.tracks().len()))]
    pub fn start(&mut self, stream: &MediaStream) -> InkreelResult<()> {
        if self.state.is_capturing() {
            return Err(InkreelError::validation("recording already in progress"));
        }
        if !self.state.can_transition_to(RecorderState::Recording) {
            return Err(InkreelError::validation(format!(
                "cannot start recording from {}; reset first",
                self.state.as_str()
            )));
        }
        if !stream.is_active() {
            return Err(InkreelError::validation("media stream has no live tracks"));
        }

        self.chunks.clear();
        self.clip = None;
        self.pending.clear();
        self.error = None;
        self.paused_ms = 0;
        self.final_elapsed_ms = 0;

        let Some(mime) = self.pick_mime() else {
            let err = InkreelError::encoding(format!(
                "neither '{}' nor '{}' is supported",
                self.opts.preferred_mime, self.opts.fallback_mime
            ));
            self.enter_error(&err);
            return Err(err);
        };
        if mime != self.opts.preferred_mime {
            tracing::debug!(%mime, "falling back to secondary recording format");
        }

        let cfg = EncoderConfig {
            mime: mime.clone(),
            video_bits_per_second: self.opts.video_bits_per_second,
            chunk_interval_ms: self.opts.chunk_interval_ms,
        };
        let now = self.clock.now_ms();
        if let Err(err) = self.encoder.start(stream, &cfg, now) {
            self.enter_error(&err);
            return Err(err);
        }

        self.mime = Some(mime);
        self.start_ms = now;
        self.set_state(RecorderState::Recording)
    }

    /// Suspend. Only legal while recording; otherwise a no-op.
    pub fn pause(&mut self) {
        if self.state != RecorderState::Recording {
            return;
        }
        let now = self.clock.now_ms();
        self.encoder.pause(now);
        self.pause_start_ms = now;
        self.advance(RecorderState::Paused);
    }

    /// Continue after a pause. Only legal while paused; otherwise a no-op.
    pub fn resume(&mut self) {
        if self.state != RecorderState::Paused {
            return;
        }
        let now = self.clock.now_ms();
        self.paused_ms += now.saturating_sub(self.pause_start_ms);
        self.encoder.resume(now);
        self.advance(RecorderState::Recording);
    }

    /// Active milliseconds, excluding every pause including one in progress.
    pub fn elapsed_ms(&self) -> u64 {
        match self.state {
            RecorderState::Recording | RecorderState::Paused => {
                let now = self.clock.now_ms();
                let current_pause = if self.state == RecorderState::Paused {
                    now.saturating_sub(self.pause_start_ms)
                } else {
                    0
                };
                now.saturating_sub(self.start_ms)
                    .saturating_sub(self.paused_ms)
                    .saturating_sub(current_pause)
            }
            RecorderState::Idle => 0,
            _ => self.final_elapsed_ms,
        }
    }

    /// Whole elapsed seconds.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_ms() / 1000
    }

    /// Countdown progress when a limit is configured.
    pub fn progress(&self) -> Option<DurationProgress> {
        DurationProgress::new(self.elapsed_secs(), self.opts.max_duration_secs?)
    }

    /// Pull finished chunks from the encoder.
    ///
    /// An encoder failure ends the attempt: the engine enters `Error` and the error is returned.
    pub fn pump(&mut self) -> InkreelResult<()> {
        if !self.state.is_capturing() {
            return Ok(());
        }
        match self.encoder.poll(self.clock.now_ms()) {
            Ok(chunks) => {
                self.chunks.extend(chunks.into_iter().filter(|c| !c.is_empty()));
                Ok(())
            }
            Err(err) => {
                self.enter_error(&err);
                Err(err)
            }
        }
    }

    /// Periodic timer body.
    pub fn tick(&mut self) -> Vec<RecorderEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if self.state != RecorderState::Recording {
            return events;
        }
        if let Err(err) = self.pump() {
            events.push(RecorderEvent::Failed(err));
            return events;
        }

        let elapsed = self.elapsed_secs();
        events.push(RecorderEvent::Duration(elapsed));

        if let Some(max) = self.opts.max_duration_secs
            && max > 0
            && elapsed >= max
        {
            tracing::debug!(elapsed, max, "duration limit reached");
            if let Some(clip) = self.stop() {
                events.push(RecorderEvent::Stopped(clip));
            }
            events.append(&mut self.pending);
        }
        events
    }

    /// Finalize the recording. `None` if nothing was recording or the encoder failed; a
    /// failure is reported by the next [`RecordingEngine::tick`].
    #[tracing::instrument(skip(self))]
    pub fn stop(&mut self) -> Option<RecordedClip> {
        if !self.state.is_capturing() {
            return None;
        }
        let elapsed_ms = self.elapsed_ms();
        let now = self.clock.now_ms();

        let tail = match self.encoder.stop(now) {
            Ok(tail) => tail,
            Err(err) => {
                self.enter_error(&err);
                self.pending.push(RecorderEvent::Failed(err));
                return None;
            }
        };
        self.chunks.extend(tail.into_iter().filter(|c| !c.is_empty()));

        self.final_elapsed_ms = elapsed_ms;
        let clip = RecordedClip {
            bytes: self.chunks.concat(),
            mime: self.mime.clone().unwrap_or_default(),
            duration_secs: elapsed_ms / 1000,
        };
        self.chunks.clear();
        tracing::info!(
            bytes = clip.bytes.len(),
            duration_secs = clip.duration_secs,
            "recording finished"
        );
        self.clip = Some(clip.clone());
        self.advance(RecorderState::Stopped);
        Some(clip)
    }

    /// Enter preview of the stopped clip.
    pub fn preview(&mut self) -> InkreelResult<()> {
        if self.state != RecorderState::Stopped {
            return Err(InkreelError::validation("nothing to preview"));
        }
        self.set_state(RecorderState::Preview)
    }

    /// Discard everything and return to `Idle` (re-record). An active encoder is stopped and
    /// its output dropped.
    pub fn reset(&mut self) {
        if self.state.is_capturing()
            && let Err(err) = self.encoder.stop(self.clock.now_ms())
        {
            tracing::warn!(error = %err, "encoder failed while discarding recording");
        }
        self.chunks.clear();
        self.clip = None;
        self.mime = None;
        self.pending.clear();
        self.error = None;
        self.paused_ms = 0;
        self.final_elapsed_ms = 0;
        // Reset is the exit from every state, including `Error`.
        if self.state != RecorderState::Idle {
            tracing::debug!(from = self.state.as_str(), to = "idle", "recording engine");
            self.state = RecorderState::Idle;
        }
    }

    /// Stop recording and end every track of `stream`. Safe to call repeatedly.
    pub fn destroy(&mut self, stream: Option<&MediaStream>) -> Option<RecordedClip> {
        let clip = self.stop();
        if let Some(stream) = stream {
            stream.stop_all();
        }
        clip
    }

    fn enter_error(&mut self, err: &InkreelError) {
        tracing::warn!(error = %err, "recording failed");
        self.error = Some(err.user_message());
        self.chunks.clear();
        self.advance(RecorderState::Error);
    }

    /// Move to `next` if the recorder state machine allows it.
    fn set_state(&mut self, next: RecorderState) -> InkreelResult<()> {
        if self.state == next {
            return Ok(());
        }
        if !self.state.can_transition_to(next) {
            return Err(InkreelError::validation(format!(
                "illegal recorder transition {} -> {}",
                self.state.as_str(),
                next.as_str()
            )));
        }
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "recording engine");
        self.state = next;
        Ok(())
    }

    /// [`Self::set_state`] for transitions the caller has already guarded.
    fn advance(&mut self, next: RecorderState) {
        if let Err(err) = self.set_state(next) {
            tracing::warn!(error = %err, "recording engine transition rejected");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/engine.rs"]
mod tests;
