//! Owned recorder state for one reviewer visit.

use crate::foundation::error::{InkreelError, InkreelResult};
use crate::media::track::MediaStream;
use crate::record::engine::{RecordedClip, RecorderEvent};

/// Where a recording attempt is in its lifecycle.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// Nothing captured yet.
    #[default]
    Idle,
    /// Capturing.
    Recording,
    /// Capture suspended.
    Paused,
    /// Capture finished; a clip is available.
    Stopped,
    /// The reviewer is watching the clip back.
    Preview,
    /// The clip is being sent.
    Uploading,
    /// The clip was stored.
    Success,
    /// Capture or upload failed.
    Error,
}

impl RecorderState {
    /// Whether moving from `self` to `next` is legal.
    ///
    /// Any state may fail into [`RecorderState::Error`]. `Error` leaves through `Idle`
    /// (re-record) or `Uploading` (retry with the retained clip).
    pub fn can_transition_to(self, next: RecorderState) -> bool {
        use RecorderState::*;
        if next == Error {
            return self != Error;
        }
        matches!(
            (self, next),
            (Idle, Recording)
                | (Recording, Paused)
                | (Recording, Stopped)
                | (Paused, Recording)
                | (Paused, Stopped)
                | (Stopped, Preview)
                | (Stopped, Uploading)
                | (Stopped, Idle)
                | (Preview, Uploading)
                | (Preview, Idle)
                | (Uploading, Success)
                | (Success, Idle)
                | (Error, Idle)
                | (Error, Uploading)
        )
    }

    /// Recording or paused.
    pub fn is_capturing(self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    /// Lowercase name used in logs and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Preview => "preview",
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Recorder store: the state a recording UI renders from.
#[derive(Debug, Default)]
pub struct RecordingSession {
    state: RecorderState,
    media_stream: Option<MediaStream>,
    clip: Option<RecordedClip>,
    elapsed_secs: u64,
    max_duration_secs: Option<u64>,
    upload_progress: u8,
    error: Option<String>,
}

impl RecordingSession {
    /// Fresh session with an optional duration limit.
    pub fn new(max_duration_secs: Option<u64>) -> Self {
        Self {
            max_duration_secs,
            ..Self::default()
        }
    }

    /// Current state.
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: RecorderState) -> InkreelResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(InkreelError::validation(format!(
                "illegal recorder transition {} -> {}",
                self.state.as_str(),
                next.as_str()
            )));
        }
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "recorder state");
        self.state = next;
        Ok(())
    }

    /// Enter [`RecorderState::Error`] with a display message.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(from = self.state.as_str(), %message, "recorder failed");
        self.state = RecorderState::Error;
        self.error = Some(message);
    }

    /// Fold an engine event into the session.
    pub fn apply(&mut self, event: RecorderEvent) -> InkreelResult<()> {
        match event {
            RecorderEvent::Duration(secs) => {
                self.elapsed_secs = secs;
                Ok(())
            }
            RecorderEvent::Stopped(clip) => {
                self.transition(RecorderState::Stopped)?;
                self.elapsed_secs = clip.duration_secs;
                self.clip = Some(clip);
                Ok(())
            }
            RecorderEvent::Failed(err) => {
                self.fail(err.user_message());
                Ok(())
            }
        }
    }

    /// Attach the device stream granted for this visit.
    pub fn set_media_stream(&mut self, stream: Option<MediaStream>) {
        self.media_stream = stream;
    }

    /// Device stream, if granted.
    pub fn media_stream(&self) -> Option<&MediaStream> {
        self.media_stream.as_ref()
    }

    /// Store a clip produced outside of [`RecordingSession::apply`].
    pub fn set_clip(&mut self, clip: Option<RecordedClip>) {
        if let Some(c) = &clip {
            self.elapsed_secs = c.duration_secs;
        }
        self.clip = clip;
    }

    /// Recorded clip, kept until [`RecordingSession::reset`].
    pub fn clip(&self) -> Option<&RecordedClip> {
        self.clip.as_ref()
    }

    /// Seconds shown on the timer.
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    /// Configured duration limit.
    pub fn max_duration_secs(&self) -> Option<u64> {
        self.max_duration_secs
    }

    /// Upload progress in percent.
    pub fn upload_progress(&self) -> u8 {
        self.upload_progress
    }

    /// Clamped to 100.
    pub fn set_upload_progress(&mut self, pct: u8) {
        self.upload_progress = pct.min(100);
    }

    /// Display message of the last failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Back to `Idle` for a re-record. The media stream is kept.
    pub fn reset(&mut self) {
        self.state = RecorderState::Idle;
        self.clip = None;
        self.elapsed_secs = 0;
        self.upload_progress = 0;
        self.error = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/session.rs"]
mod tests;
