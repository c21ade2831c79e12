//! Shared media track handles.
//!
//! A track is owned jointly by whoever holds a clone of it (device stream, compositor output,
//! encoder). Stopping a track is visible to every holder. Video tracks carry their latest frame.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::core::FrameRGBA;

static NEXT_TRACK_ID: AtomicU64 = AtomicU64::new(1);

/// Kind of data a track carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Microphone audio.
    Audio,
    /// Camera or synthesized video.
    Video,
}

#[derive(Debug)]
struct TrackInner {
    id: u64,
    kind: TrackKind,
    label: String,
    live: Cell<bool>,
    frame: RefCell<Option<FrameRGBA>>,
    frames_pushed: Cell<u64>,
}

/// Cheaply clonable handle to one media track.
#[derive(Clone, Debug)]
pub struct MediaTrack {
    inner: Rc<TrackInner>,
}

impl MediaTrack {
    fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(TrackInner {
                id: NEXT_TRACK_ID.fetch_add(1, Ordering::Relaxed),
                kind,
                label: label.into(),
                live: Cell::new(true),
                frame: RefCell::new(None),
                frames_pushed: Cell::new(0),
            }),
        }
    }

    /// New live video track with no frame yet.
    pub fn video(label: impl Into<String>) -> Self {
        Self::new(TrackKind::Video, label)
    }

    /// New live audio track.
    pub fn audio(label: impl Into<String>) -> Self {
        Self::new(TrackKind::Audio, label)
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Audio or video.
    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    /// Human-readable device label.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// `false` once [`MediaTrack::stop`] ran on any clone.
    pub fn is_live(&self) -> bool {
        self.inner.live.get()
    }

    /// End the track for every holder. Idempotent.
    pub fn stop(&self) {
        if self.inner.live.replace(false) {
            tracing::debug!(id = self.inner.id, label = %self.inner.label, "track stopped");
        }
    }

    /// Publish a new video frame. Ignored on stopped or audio tracks.
    pub fn push_frame(&self, frame: FrameRGBA) {
        if !self.is_live() || self.kind() != TrackKind::Video {
            return;
        }
        *self.inner.frame.borrow_mut() = Some(frame);
        self.inner.frames_pushed.set(self.inner.frames_pushed.get() + 1);
    }

    /// Latest published frame, if any.
    pub fn current_frame(&self) -> Option<FrameRGBA> {
        self.inner.frame.borrow().clone()
    }

    /// Run `f` on the latest frame without cloning it.
    pub fn with_frame<R>(&self, f: impl FnOnce(Option<&FrameRGBA>) -> R) -> R {
        f(self.inner.frame.borrow().as_ref())
    }

    /// Number of frames published so far.
    pub fn frames_pushed(&self) -> u64 {
        self.inner.frames_pushed.get()
    }

    /// Whether both handles refer to the same track.
    pub fn same_track(&self, other: &MediaTrack) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Ordered set of tracks captured or synthesized together.
#[derive(Clone, Debug, Default)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    /// Stream over the given tracks.
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    /// Append a track handle.
    pub fn add_track(&mut self, track: MediaTrack) {
        self.tracks.push(track);
    }

    /// All tracks in insertion order.
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// Video tracks in insertion order.
    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    /// Audio tracks in insertion order.
    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    /// First video track that has not been stopped.
    pub fn first_live_video(&self) -> Option<&MediaTrack> {
        self.video_tracks().find(|t| t.is_live())
    }

    /// `true` while any track is live.
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    /// Stop every track in the stream.
    pub fn stop_all(&self) {
        for t in &self.tracks {
            t.stop();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/track.rs"]
mod tests;
