//! Storage, record and transcription collaborators.
//!
//! The core only depends on the traits here. In-memory implementations back tests; the
//! directory-backed [`FsObjectStore`] backs the CLI.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::foundation::clock::{Clock, UnixClock};
use crate::foundation::error::{InkreelError, InkreelResult};

/// Named binary uploads with retrieval URLs.
pub trait ObjectStore {
    /// Store `bytes` under `bucket/key`. Existing objects are never overwritten.
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> InkreelResult<()>;

    /// Unauthenticated URL for a public bucket.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Time-bounded URL for a private bucket.
    fn signed_url(&self, bucket: &str, key: &str, ttl: Duration) -> InkreelResult<String>;
}

/// Lifecycle of an uploaded recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    /// Bytes are still being sent.
    Uploading,
    /// Stored; transcription not started.
    Uploaded,
    /// Transcription in progress.
    Transcribing,
    /// Transcript available.
    Complete,
    /// Transcription failed.
    Failed,
}

/// Transcript progress as written by the transcription collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    /// Requested, not picked up yet.
    Pending,
    /// Being transcribed.
    Processing,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Failed,
}

impl TranscriptStatus {
    /// `complete` or `failed`: polling can stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// A timed piece of transcript text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptSegment {
    /// Start, seconds into the recording.
    pub start: f64,
    /// End, seconds into the recording.
    pub end: f64,
    /// Spoken text.
    pub text: String,
}

/// Transcript of one recording.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transcript {
    /// Recording this transcript belongs to.
    pub recording_id: String,
    /// Progress.
    pub status: TranscriptStatus,
    /// Full text.
    #[serde(default)]
    pub text: String,
    /// Timed segments.
    #[serde(default, rename = "timestamps_json")]
    pub segments: Vec<TranscriptSegment>,
}

/// A registered reviewer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReviewerRow {
    /// Store-assigned id.
    pub id: String,
    /// Session being reviewed.
    pub session_id: String,
    /// Display name.
    pub name: String,
}

/// Recording record before the store assigns an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRecording {
    /// Session being reviewed.
    pub session_id: String,
    /// Reviewer who recorded.
    pub reviewer_id: String,
    /// Storage path of the video object. Not a URL.
    pub video_path: String,
    /// Whole seconds.
    pub duration_secs: u64,
    /// Initial status.
    pub status: RecordingStatus,
}

/// A stored recording record.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordingRow {
    /// Store-assigned id.
    pub id: String,
    /// Session being reviewed.
    pub session_id: String,
    /// Reviewer who recorded.
    pub reviewer_id: String,
    /// Storage path of the video object. Not a URL.
    pub video_path: String,
    /// Whole seconds.
    pub duration_secs: u64,
    /// Current status.
    pub status: RecordingStatus,
}

/// Relational records the core writes and reads.
pub trait RecordStore {
    /// Register a reviewer and return the new id.
    fn insert_reviewer(&self, session_id: &str, name: &str) -> InkreelResult<String>;

    /// Insert a recording record.
    fn insert_recording(&self, new: NewRecording) -> InkreelResult<RecordingRow>;

    /// Update a recording's status.
    fn set_recording_status(
        &self,
        recording_id: &str,
        status: RecordingStatus,
    ) -> InkreelResult<()>;

    /// Insert or replace the transcript of a recording.
    fn upsert_transcript(&self, transcript: Transcript) -> InkreelResult<()>;

    /// Transcript of a recording, if one exists yet.
    fn transcript_for(&self, recording_id: &str) -> InkreelResult<Option<Transcript>>;
}

/// Asynchronous transcription trigger.
pub trait Transcriber {
    /// Ask for a transcript of the video stored at `storage_path`.
    fn request(&self, recording_id: &str, storage_path: &str) -> InkreelResult<()>;
}

/// A stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Raw bytes.
    pub bytes: Vec<u8>,
    /// Content type given at upload.
    pub content_type: String,
}

/// In-memory [`ObjectStore`].
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RefCell<BTreeMap<(String, String), StoredObject>>,
    fail_next: RefCell<Option<String>>,
}

impl MemoryObjectStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next upload fail with `cause`.
    pub fn fail_next(&self, cause: impl Into<String>) {
        *self.fail_next.borrow_mut() = Some(cause.into());
    }

    /// Copy of a stored object.
    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .borrow()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .borrow()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> InkreelResult<()> {
        if let Some(cause) = self.fail_next.borrow_mut().take() {
            return Err(InkreelError::upload(cause));
        }
        let mut objects = self.objects.borrow_mut();
        let id = (bucket.to_string(), key.to_string());
        if objects.contains_key(&id) {
            return Err(InkreelError::upload(format!("{bucket}/{key} already exists")));
        }
        objects.insert(
            id,
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{bucket}/{key}")
    }

    fn signed_url(&self, bucket: &str, key: &str, ttl: Duration) -> InkreelResult<String> {
        if self.get(bucket, key).is_none() {
            return Err(InkreelError::validation(format!("no object at {bucket}/{key}")));
        }
        Ok(format!("memory://{bucket}/{key}?expires_in={}", ttl.as_secs()))
    }
}

/// Directory-backed [`ObjectStore`]: `root/<bucket>/<key>`.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Store rooted at `root`. The directory is created on first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of `bucket/key`. Keys escaping the bucket are rejected.
    pub fn object_path(&self, bucket: &str, key: &str) -> InkreelResult<PathBuf> {
        let escapes = |s: &str| {
            s.is_empty()
                || Path::new(s)
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)))
        };
        if escapes(bucket) || escapes(key) {
            return Err(InkreelError::validation(format!(
                "invalid storage path {bucket}/{key}"
            )));
        }
        Ok(self.root.join(bucket).join(key))
    }

    fn file_url(path: &Path) -> String {
        let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        format!("file://{}", abs.display())
    }
}

impl ObjectStore for FsObjectStore {
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> InkreelResult<()> {
        let path = self.object_path(bucket, key)?;
        if path.exists() {
            return Err(InkreelError::upload(format!("{bucket}/{key} already exists")));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create storage dir '{}'", parent.display()))?;
        }
        std::fs::write(&path, bytes).with_context(|| format!("write '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), content_type, len = bytes.len(), "stored object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        Self::file_url(&self.root.join(bucket).join(key))
    }

    fn signed_url(&self, bucket: &str, key: &str, ttl: Duration) -> InkreelResult<String> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(InkreelError::validation(format!("no object at {bucket}/{key}")));
        }
        let expires = UnixClock.now_ms() / 1000 + ttl.as_secs();
        Ok(format!("{}?expires={expires}", Self::file_url(&path)))
    }
}

#[derive(Debug, Default)]
struct Records {
    reviewers: Vec<ReviewerRow>,
    recordings: Vec<RecordingRow>,
    transcripts: BTreeMap<String, Transcript>,
}

/// In-memory [`RecordStore`] with sequential ids.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RefCell<Records>,
    next_id: Cell<u64>,
    fail_inserts: Cell<bool>,
}

impl MemoryRecordStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert fail until switched off.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.set(fail);
    }

    /// All recordings in insertion order.
    pub fn recordings(&self) -> Vec<RecordingRow> {
        self.records.borrow().recordings.clone()
    }

    /// All reviewers in insertion order.
    pub fn reviewers(&self) -> Vec<ReviewerRow> {
        self.records.borrow().reviewers.clone()
    }

    fn next(&self, prefix: &str) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("{prefix}-{n}")
    }

    fn check_insert(&self) -> InkreelResult<()> {
        if self.fail_inserts.get() {
            return Err(InkreelError::upload("record store rejected insert"));
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert_reviewer(&self, session_id: &str, name: &str) -> InkreelResult<String> {
        self.check_insert()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(InkreelError::validation("reviewer name is required"));
        }
        let id = self.next("reviewer");
        self.records.borrow_mut().reviewers.push(ReviewerRow {
            id: id.clone(),
            session_id: session_id.to_string(),
            name: name.to_string(),
        });
        Ok(id)
    }

    fn insert_recording(&self, new: NewRecording) -> InkreelResult<RecordingRow> {
        self.check_insert()?;
        let row = RecordingRow {
            id: self.next("recording"),
            session_id: new.session_id,
            reviewer_id: new.reviewer_id,
            video_path: new.video_path,
            duration_secs: new.duration_secs,
            status: new.status,
        };
        self.records.borrow_mut().recordings.push(row.clone());
        Ok(row)
    }

    fn set_recording_status(
        &self,
        recording_id: &str,
        status: RecordingStatus,
    ) -> InkreelResult<()> {
        let mut records = self.records.borrow_mut();
        let row = records
            .recordings
            .iter_mut()
            .find(|r| r.id == recording_id)
            .ok_or_else(|| InkreelError::validation(format!("unknown recording {recording_id}")))?;
        row.status = status;
        Ok(())
    }

    fn upsert_transcript(&self, transcript: Transcript) -> InkreelResult<()> {
        self.records
            .borrow_mut()
            .transcripts
            .insert(transcript.recording_id.clone(), transcript);
        Ok(())
    }

    fn transcript_for(&self, recording_id: &str) -> InkreelResult<Option<Transcript>> {
        Ok(self.records.borrow().transcripts.get(recording_id).cloned())
    }
}

/// [`Transcriber`] that remembers requests instead of transcribing.
#[derive(Debug, Default)]
pub struct RecordingTranscriber {
    requests: RefCell<Vec<(String, String)>>,
    fail: Cell<bool>,
}

impl RecordingTranscriber {
    /// Transcriber that accepts every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make requests fail until switched off.
    pub fn set_fail(&self, fail: bool) {
        self.fail.set(fail);
    }

    /// `(recording_id, storage_path)` pairs received so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.borrow().clone()
    }
}

impl Transcriber for RecordingTranscriber {
    fn request(&self, recording_id: &str, storage_path: &str) -> InkreelResult<()> {
        if self.fail.get() {
            return Err(InkreelError::transcription("transcription service unavailable"));
        }
        self.requests
            .borrow_mut()
            .push((recording_id.to_string(), storage_path.to_string()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/review/store.rs"]
mod tests;
