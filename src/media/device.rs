//! Camera/microphone acquisition.

use crate::foundation::core::FrameRGBA;
use crate::foundation::error::InkreelError;
use crate::media::track::{MediaStream, MediaTrack};

/// Microphone processing requested from the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioConstraints {
    /// Cancel speaker echo.
    pub echo_cancellation: bool,
    /// Suppress background noise.
    pub noise_suppression: bool,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44_100,
        }
    }
}

/// Camera settings requested from the platform. Sizes are "ideal", not exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoConstraints {
    /// Ideal frame width.
    pub ideal_width: u32,
    /// Ideal frame height.
    pub ideal_height: u32,
    /// Prefer the front-facing camera.
    pub user_facing: bool,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            user_facing: true,
        }
    }
}

/// What to capture. `None` leaves that kind out of the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Microphone request.
    pub audio: Option<AudioConstraints>,
    /// Camera request.
    pub video: Option<VideoConstraints>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            audio: Some(AudioConstraints::default()),
            video: Some(VideoConstraints::default()),
        }
    }
}

/// Why acquisition failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user (or policy) refused access.
    #[error("camera/microphone permission denied")]
    PermissionDenied,
    /// No matching device exists.
    #[error("no camera or microphone found")]
    DeviceNotFound,
    /// The device exists but could not be opened.
    #[error("capture failed: {0}")]
    Failed(String),
}

impl CaptureError {
    /// `true` when the user can fix this by granting access.
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

impl From<CaptureError> for InkreelError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => InkreelError::permission(err.to_string()),
            CaptureError::DeviceNotFound | CaptureError::Failed(_) => {
                InkreelError::device(err.to_string())
            }
        }
    }
}

/// Platform capture devices.
pub trait DeviceProvider {
    /// Open the requested devices as one stream.
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<MediaStream, CaptureError>;
}

/// Device that shows a fixed image as the camera and a silent microphone.
///
/// Used for offline replays and tests.
#[derive(Clone, Debug, Default)]
pub struct StillFrameDevice {
    frame: Option<FrameRGBA>,
}

impl StillFrameDevice {
    /// Camera showing `frame`.
    pub fn new(frame: FrameRGBA) -> Self {
        Self { frame: Some(frame) }
    }

    /// Microphone only; video requests fail with [`CaptureError::DeviceNotFound`].
    pub fn audio_only() -> Self {
        Self { frame: None }
    }
}

impl DeviceProvider for StillFrameDevice {
    fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<MediaStream, CaptureError> {
        let mut stream = MediaStream::default();
        if constraints.audio.is_some() {
            stream.add_track(MediaTrack::audio("still microphone"));
        }
        if constraints.video.is_some() {
            let frame = self.frame.clone().ok_or(CaptureError::DeviceNotFound)?;
            frame
                .validate()
                .map_err(|e| CaptureError::Failed(e.to_string()))?;
            let camera = MediaTrack::video("still camera");
            camera.push_frame(frame);
            stream.add_track(camera);
        }
        tracing::debug!(tracks = stream.tracks().len(), "devices acquired");
        Ok(stream)
    }
}

/// Acquire devices, converting the failure class into an [`InkreelError`].
pub fn request_permissions(
    devices: &mut dyn DeviceProvider,
    constraints: &CaptureConstraints,
) -> Result<MediaStream, InkreelError> {
    devices.acquire(constraints).map_err(|err| {
        tracing::warn!(error = %err, "device acquisition failed");
        InkreelError::from(err)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/media/device.rs"]
mod tests;
