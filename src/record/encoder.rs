//! Platform recorder seam.

use crate::foundation::error::{InkreelError, InkreelResult};
use crate::media::track::MediaStream;

/// Recorder lifecycle as reported by the encoder itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncoderState {
    /// Not started, or stopped.
    Inactive,
    /// Consuming media.
    Recording,
    /// Started but not consuming media.
    Paused,
}

/// Parameters for one encoder run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Container/codec string, e.g. `video/webm;codecs=vp9,opus`.
    pub mime: String,
    /// Target video bitrate.
    pub video_bits_per_second: u32,
    /// Interval at which encoded chunks are emitted.
    pub chunk_interval_ms: u64,
}

/// A recorder that turns a live [`MediaStream`] into encoded chunks.
///
/// Times are passed in by the caller so that encoders never read a clock of their own.
pub trait MediaEncoder {
    /// Whether this encoder can produce `mime`.
    fn is_type_supported(&self, mime: &str) -> bool;

    /// Begin encoding `stream`.
    fn start(
        &mut self,
        stream: &MediaStream,
        cfg: &EncoderConfig,
        now_ms: u64,
    ) -> InkreelResult<()>;

    /// Suspend consumption. No-op unless recording.
    fn pause(&mut self, now_ms: u64);

    /// Continue after [`MediaEncoder::pause`]. No-op unless paused.
    fn resume(&mut self, now_ms: u64);

    /// Drive encoding and return chunks completed since the last call.
    fn poll(&mut self, now_ms: u64) -> InkreelResult<Vec<Vec<u8>>>;

    /// Finalize and return the remaining chunks.
    fn stop(&mut self, now_ms: u64) -> InkreelResult<Vec<Vec<u8>>>;

    /// Current lifecycle state.
    fn state(&self) -> EncoderState;
}

/// Deterministic in-memory encoder.
///
/// Emits one chunk per `chunk_interval_ms` of active (non-paused) time, plus a final partial
/// chunk on stop. Chunk bytes are `chunk-<n>;`. Failures can be injected with
/// [`MemoryEncoder::fail_next`].
#[derive(Debug)]
pub struct MemoryEncoder {
    supported: Vec<String>,
    state: EncoderState,
    config: Option<EncoderConfig>,
    active_ms: u64,
    resumed_at: u64,
    emitted: u64,
    fail_next: Option<String>,
}

impl MemoryEncoder {
    /// Encoder supporting the given mime strings.
    pub fn new<S: Into<String>>(supported: impl IntoIterator<Item = S>) -> Self {
        Self {
            supported: supported.into_iter().map(Into::into).collect(),
            state: EncoderState::Inactive,
            config: None,
            active_ms: 0,
            resumed_at: 0,
            emitted: 0,
            fail_next: None,
        }
    }

    /// Make the next `poll` or `stop` fail with `cause`.
    pub fn fail_next(&mut self, cause: impl Into<String>) {
        self.fail_next = Some(cause.into());
    }

    /// Configuration of the current or last run.
    pub fn config(&self) -> Option<&EncoderConfig> {
        self.config.as_ref()
    }

    /// Active milliseconds consumed so far.
    pub fn active_ms(&self) -> u64 {
        self.active_ms
    }

    fn accumulate(&mut self, now_ms: u64) {
        if self.state == EncoderState::Recording {
            self.active_ms += now_ms.saturating_sub(self.resumed_at);
            self.resumed_at = now_ms;
        }
    }

    fn chunk(&mut self) -> Vec<u8> {
        let bytes = format!("chunk-{};", self.emitted).into_bytes();
        self.emitted += 1;
        bytes
    }

    fn check_failure(&mut self) -> InkreelResult<()> {
        match self.fail_next.take() {
            Some(cause) => {
                self.state = EncoderState::Inactive;
                Err(InkreelError::encoding(cause))
            }
            None => Ok(()),
        }
    }
}

impl MediaEncoder for MemoryEncoder {
    fn is_type_supported(&self, mime: &str) -> bool {
        self.supported.iter().any(|m| m == mime)
    }

    fn start(
        &mut self,
        _stream: &MediaStream,
        cfg: &EncoderConfig,
        now_ms: u64,
    ) -> InkreelResult<()> {
        if !self.is_type_supported(&cfg.mime) {
            return Err(InkreelError::encoding(format!(
                "unsupported mime '{}'",
                cfg.mime
            )));
        }
        if cfg.chunk_interval_ms == 0 {
            return Err(InkreelError::validation("chunk interval must be non-zero"));
        }
        self.config = Some(cfg.clone());
        self.state = EncoderState::Recording;
        self.active_ms = 0;
        self.resumed_at = now_ms;
        self.emitted = 0;
        Ok(())
    }

    fn pause(&mut self, now_ms: u64) {
        if self.state == EncoderState::Recording {
            self.accumulate(now_ms);
            self.state = EncoderState::Paused;
        }
    }

    fn resume(&mut self, now_ms: u64) {
        if self.state == EncoderState::Paused {
            self.state = EncoderState::Recording;
            self.resumed_at = now_ms;
        }
    }

    fn poll(&mut self, now_ms: u64) -> InkreelResult<Vec<Vec<u8>>> {
        self.check_failure()?;
        self.accumulate(now_ms);
        let interval = self.config.as_ref().map_or(1, |c| c.chunk_interval_ms);
        let mut out = Vec::new();
        while self.active_ms >= (self.emitted + 1) * interval {
            out.push(self.chunk());
        }
        Ok(out)
    }

    fn stop(&mut self, now_ms: u64) -> InkreelResult<Vec<Vec<u8>>> {
        if self.state == EncoderState::Inactive {
            return Ok(Vec::new());
        }
        let mut out = self.poll(now_ms)?;
        out.push(self.chunk());
        self.state = EncoderState::Inactive;
        Ok(out)
    }

    fn state(&self) -> EncoderState {
        self.state
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/encoder.rs"]
mod tests;
