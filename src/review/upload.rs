//! Sending a finished recording and its annotation sidecar to the collaborators.

use std::rc::Rc;
use std::time::Duration;

use crate::annotation::snapshot::{AnnotationSnapshot, encode_snapshots};
use crate::foundation::clock::{Clock, UnixClock};
use crate::foundation::error::{InkreelError, InkreelResult};
use crate::record::engine::RecordedClip;
use crate::record::session::{RecorderState, RecordingSession};
use crate::review::store::{NewRecording, ObjectStore, RecordStore, RecordingStatus, Transcriber};

/// Private bucket holding videos and annotation sidecars.
pub const RECORDINGS_BUCKET: &str = "recordings";
/// Lifetime of signed playback URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

const VIDEO_CONTENT_TYPE: &str = "video/webm";
const SIDECAR_CONTENT_TYPE: &str = "application/json";

/// Collaborators used by an upload.
pub struct ReviewContext<'a> {
    /// Object storage.
    pub objects: &'a dyn ObjectStore,
    /// Relational records.
    pub records: &'a dyn RecordStore,
    /// Transcription trigger.
    pub transcriber: &'a dyn Transcriber,
    /// Bucket for videos and sidecars.
    pub bucket: String,
    /// Wall clock for storage key timestamps.
    pub clock: Rc<dyn Clock>,
}

impl<'a> ReviewContext<'a> {
    /// Context using [`RECORDINGS_BUCKET`] and the system wall clock.
    pub fn new(
        objects: &'a dyn ObjectStore,
        records: &'a dyn RecordStore,
        transcriber: &'a dyn Transcriber,
    ) -> Self {
        Self {
            objects,
            records,
            transcriber,
            bucket: RECORDINGS_BUCKET.to_string(),
            clock: Rc::new(UnixClock),
        }
    }

    /// Replace the key timestamp clock.
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Who is uploading for which session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadIds {
    /// Reviewed session.
    pub session_id: String,
    /// Registered reviewer.
    pub reviewer_id: String,
}

impl UploadIds {
    /// Bundle both ids.
    pub fn new(session_id: impl Into<String>, reviewer_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            reviewer_id: reviewer_id.into(),
        }
    }
}

/// Result of a successful recording upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedRecording {
    /// Store-assigned recording id.
    pub recording_id: String,
    /// Storage path of the video. Not a URL.
    pub video_path: String,
}

/// `{session}/{reviewer}/{unix_ms}.webm`
pub fn recording_key(ids: &UploadIds, unix_ms: u64) -> String {
    format!("{}/{}/{unix_ms}.webm", ids.session_id, ids.reviewer_id)
}

/// `{session}/{reviewer}/{recording}.annotations.json`
pub fn sidecar_key(ids: &UploadIds, recording_id: &str) -> String {
    format!(
        "{}/{}/{recording_id}.annotations.json",
        ids.session_id, ids.reviewer_id
    )
}

/// Upload the video, create its record and trigger transcription.
///
/// `progress` receives 10, 60, 80 and 100. A failed transcription trigger is logged and does
/// not fail the upload.
#[tracing::instrument(skip(ctx, clip, progress), fields(len = clip.bytes.len()))]
pub fn upload_recording(
    ctx: &ReviewContext<'_>,
    clip: &RecordedClip,
    ids: &UploadIds,
    progress: &mut dyn FnMut(u8),
) -> InkreelResult<UploadedRecording> {
    if clip.bytes.is_empty() {
        return Err(InkreelError::validation("recording is empty"));
    }
    let video_path = recording_key(ids, ctx.clock.now_ms());

    progress(10);
    ctx.objects
        .upload(&ctx.bucket, &video_path, &clip.bytes, VIDEO_CONTENT_TYPE)
        .map_err(|e| as_upload_error("upload", e))?;
    progress(60);

    let row = ctx
        .records
        .insert_recording(NewRecording {
            session_id: ids.session_id.clone(),
            reviewer_id: ids.reviewer_id.clone(),
            video_path: video_path.clone(),
            duration_secs: clip.duration_secs,
            status: RecordingStatus::Uploaded,
        })
        .map_err(|e| as_upload_error("save", e))?;
    progress(80);

    if let Err(err) = ctx.transcriber.request(&row.id, &video_path) {
        tracing::warn!(recording_id = %row.id, error = %err, "transcription trigger failed");
    }
    progress(100);

    Ok(UploadedRecording {
        recording_id: row.id,
        video_path,
    })
}

fn as_upload_error(stage: &str, err: InkreelError) -> InkreelError {
    match err {
        InkreelError::Upload(msg) => InkreelError::upload(format!("{stage} failed: {msg}")),
        other => InkreelError::upload(format!("{stage} failed: {other}")),
    }
}

/// Upload the snapshot list next to its recording. Returns the storage key.
pub fn upload_annotation_sidecar(
    objects: &dyn ObjectStore,
    bucket: &str,
    ids: &UploadIds,
    recording_id: &str,
    snapshots: &[AnnotationSnapshot],
) -> InkreelResult<String> {
    let json = encode_snapshots(snapshots)?;
    let key = sidecar_key(ids, recording_id);
    objects.upload(bucket, &key, json.as_bytes(), SIDECAR_CONTENT_TYPE)?;
    Ok(key)
}

/// Submission of one reviewer's take, driving a [`RecordingSession`] through upload.
#[derive(Clone, Debug)]
pub struct ReviewSubmission {
    ids: UploadIds,
    snapshots: Vec<AnnotationSnapshot>,
    uploaded: Option<UploadedRecording>,
}

impl ReviewSubmission {
    /// Submission for `ids` carrying the captured annotation snapshots.
    pub fn new(ids: UploadIds, snapshots: Vec<AnnotationSnapshot>) -> Self {
        Self {
            ids,
            snapshots,
            uploaded: None,
        }
    }

    /// Ids this submission uploads under.
    pub fn ids(&self) -> &UploadIds {
        &self.ids
    }

    /// Set after a successful upload.
    pub fn uploaded(&self) -> Option<&UploadedRecording> {
        self.uploaded.as_ref()
    }

    /// Upload the session's clip: `Uploading`, then `Success` or `Error`.
    ///
    /// On failure the clip stays on the session so [`ReviewSubmission::retry`] can resend it.
    /// Sidecar failures are logged only.
    pub fn submit(
        &mut self,
        ctx: &ReviewContext<'_>,
        session: &mut RecordingSession,
    ) -> InkreelResult<UploadedRecording> {
        let clip = session
            .clip()
            .cloned()
            .ok_or_else(|| InkreelError::validation("no recorded clip to submit"))?;
        session.transition(RecorderState::Uploading)?;
        session.set_upload_progress(0);

        let result = upload_recording(ctx, &clip, &self.ids, &mut |pct| {
            session.set_upload_progress(pct)
        });
        let uploaded = match result {
            Ok(uploaded) => uploaded,
            Err(err) => {
                tracing::warn!(error = %err, "review upload failed");
                session.fail(err.user_message());
                return Err(err);
            }
        };

        if !self.snapshots.is_empty()
            && let Err(err) = upload_annotation_sidecar(
                ctx.objects,
                &ctx.bucket,
                &self.ids,
                &uploaded.recording_id,
                &self.snapshots,
            )
        {
            tracing::warn!(error = %err, "annotation sidecar upload failed");
        }

        session.transition(RecorderState::Success)?;
        self.uploaded = Some(uploaded.clone());
        Ok(uploaded)
    }

    /// Resend after a failed [`ReviewSubmission::submit`].
    pub fn retry(
        &mut self,
        ctx: &ReviewContext<'_>,
        session: &mut RecordingSession,
    ) -> InkreelResult<UploadedRecording> {
        if session.state() != RecorderState::Error {
            return Err(InkreelError::validation(format!(
                "nothing to retry in state {}",
                session.state().as_str()
            )));
        }
        self.submit(ctx, session)
    }
}

/// Signed playback URL for a stored recording.
pub fn signed_recording_url(
    objects: &dyn ObjectStore,
    bucket: &str,
    video_path: &str,
) -> InkreelResult<String> {
    objects.signed_url(bucket, video_path, SIGNED_URL_TTL)
}

#[cfg(test)]
#[path = "../../tests/unit/review/upload.rs"]
mod tests;
