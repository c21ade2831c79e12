//! Inkreel is the core of an async video-review tool.
//!
//! A reviewer records webcam + voice feedback while drawing on a document or image. The crate
//! models that loop without a browser:
//!
//! - [`AnnotationSurface`] holds the zoomable artifact and the vector ink drawn over it
//! - [`GestureController`] routes pointer, touch and wheel input to drawing or navigation
//! - [`RecordingEngine`] drives a [`MediaEncoder`] through record, pause and stop
//! - [`StreamCompositor`] merges surface layers and a mirrored webcam bubble into one stream
//! - [`PlaybackSynchronizer`] replays timestamped [`AnnotationSnapshot`]s against playback time
//! - [`ReviewSubmission`] uploads the take and its annotation sidecar to the collaborators
//!
//! Everything runs on one thread; hosts call `tick`, `draw_frame` and `handle` from their event
//! loop and react to the returned values.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod annotation;
pub(crate) mod artifact;
pub(crate) mod compositor;
pub(crate) mod encode;
pub(crate) mod geometry;
pub(crate) mod gesture;
pub(crate) mod media;
pub(crate) mod playback;
pub(crate) mod record;
pub(crate) mod render;
pub(crate) mod review;

pub use crate::foundation::clock::{Clock, ManualClock, SystemClock, UnixClock};
pub use crate::foundation::core::{Affine, BezPath, FrameRGBA, Point, Rect, Rgba8, Size, Vec2};
pub use crate::foundation::error::{FetchErrorKind, InkreelError, InkreelResult};

pub use crate::geometry::viewport::{
    ArtifactGeometry, REFIT_TOLERANCE, TALL_ASPECT_RATIO, ViewportTransform, ZoomLimits,
    ZoomPreset, centered, clamp_viewport, fit_zoom, refit_on_resize, relative_pan, zoom_to_point,
};

pub use crate::annotation::model::{
    AnnotationObject, Corner, ObjectId, SCENE_FORMAT_VERSION, SceneGraph, Shape, Style,
    normalized_rect,
};
pub use crate::annotation::snapshot::{
    AnnotationSnapshot, SnapshotLog, decode_snapshots, encode_snapshots,
};
pub use crate::annotation::surface::{AnnotationSurface, Mutation};
pub use crate::annotation::tools::{
    BrushSize, DEFAULT_COLOR, ERASER_WIDTH_FACTOR, EraserMode, PALETTE, Tool, ToolState,
};

pub use crate::artifact::fetch::{
    MAX_FETCH_BYTES, SourceUrl, check_fetch_size, classify_fetch_response, detect_source_url,
};
pub use crate::artifact::kind::{ArtifactKind, content_type_for};
pub use crate::artifact::raster::{
    FsRasterizer, RasterArtifact, Rasterizer, StitchOpts, decode_image, load_image_file,
    stitch_pages,
};

pub use crate::render::layers::{LayerSource, SurfaceLayers};

pub use crate::gesture::controller::{
    GestureController, GestureOutcome, InputEvent, MIN_PINCH_DISTANCE, Modifiers, PointerKind,
    WHEEL_NOISE_THRESHOLD, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};

pub use crate::media::device::{
    AudioConstraints, CaptureConstraints, CaptureError, DeviceProvider, StillFrameDevice,
    VideoConstraints, request_permissions,
};
pub use crate::media::track::{MediaStream, MediaTrack, TrackKind};

pub use crate::record::encoder::{EncoderConfig, EncoderState, MediaEncoder, MemoryEncoder};
pub use crate::record::engine::{
    DurationProgress, FALLBACK_MIME, PREFERRED_MIME, RecordedClip, RecorderEvent, RecorderOpts,
    RecordingEngine, Urgency,
};
pub use crate::record::session::{RecorderState, RecordingSession};

pub use crate::encode::ffmpeg::{
    FfmpegEncoderOpts, FfmpegMediaEncoder, available_encoders, codec_for_mime, is_ffmpeg_on_path,
};

pub use crate::compositor::stream::{
    CompositorOpts, PipCorner, StreamCompositor, letterbox, pip_rect,
};
pub use crate::compositor::ticker::{ClockTicker, FrameTicker, IntervalTicker};

pub use crate::playback::sync::PlaybackSynchronizer;

pub use crate::review::store::{
    FsObjectStore, MemoryObjectStore, MemoryRecordStore, NewRecording, ObjectStore, RecordStore,
    RecordingRow, RecordingStatus, RecordingTranscriber, ReviewerRow, StoredObject, Transcriber,
    Transcript, TranscriptSegment, TranscriptStatus,
};
pub use crate::review::transcript::{PollOpts, TranscriptPoll, format_timestamp, poll_transcript};
pub use crate::review::upload::{
    RECORDINGS_BUCKET, ReviewContext, ReviewSubmission, SIGNED_URL_TTL, UploadIds,
    UploadedRecording, recording_key, signed_recording_url, sidecar_key,
    upload_annotation_sidecar, upload_recording,
};
