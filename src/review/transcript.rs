//! Waiting for the transcription collaborator.

use std::time::Duration;

use crate::foundation::clock::Clock;
use crate::foundation::error::{InkreelError, InkreelResult};
use crate::review::store::{RecordStore, Transcript};

/// Polling cadence for transcripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollOpts {
    /// Reads before giving up.
    pub max_attempts: u32,
    /// Delay between reads.
    pub interval: Duration,
}

impl Default for PollOpts {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollOpts {
    /// Defaults overridden by `INKREEL_POLL_ATTEMPTS` and `INKREEL_POLL_INTERVAL_MS`.
    pub fn from_env() -> Self {
        let d = Self::default();
        let max_attempts = std::env::var("INKREEL_POLL_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(d.max_attempts);
        let interval = std::env::var("INKREEL_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&n| n > 0)
            .map(Duration::from_millis)
            .unwrap_or(d.interval);
        Self {
            max_attempts,
            interval,
        }
    }
}

/// Outcome of [`poll_transcript`].
#[derive(Clone, Debug, PartialEq)]
pub enum TranscriptPoll {
    /// The transcript reached `complete` or `failed`.
    Ready(Transcript),
    /// Still running after every attempt. Shown as pending, not as an error.
    Pending,
}

/// Read the transcript until it is terminal or attempts run out.
///
/// Read errors count as "not ready yet".
#[tracing::instrument(skip(records, clock))]
pub fn poll_transcript(
    records: &dyn RecordStore,
    recording_id: &str,
    opts: PollOpts,
    clock: &dyn Clock,
) -> InkreelResult<TranscriptPoll> {
    if recording_id.is_empty() {
        return Err(InkreelError::validation("recording id is required"));
    }
    for attempt in 0..opts.max_attempts {
        match records.transcript_for(recording_id) {
            Ok(Some(t)) if t.status.is_terminal() => {
                tracing::debug!(attempt, status = ?t.status, "transcript ready");
                return Ok(TranscriptPoll::Ready(t));
            }
            Ok(_) => {}
            Err(err) => tracing::debug!(attempt, error = %err, "transcript read failed"),
        }
        clock.sleep(opts.interval);
    }
    Ok(TranscriptPoll::Pending)
}

/// `m:ss`. Negative or non-finite input shows `0:00`.
pub fn format_timestamp(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
#[path = "../../tests/unit/review/transcript.rs"]
mod tests;
