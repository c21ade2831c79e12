use super::*;
use crate::foundation::clock::ManualClock;
use crate::review::store::{MemoryObjectStore, MemoryRecordStore, RecordingTranscriber};

struct Collaborators {
    objects: MemoryObjectStore,
    records: MemoryRecordStore,
    transcriber: RecordingTranscriber,
}

impl Collaborators {
    fn new() -> Self {
        Self {
            objects: MemoryObjectStore::new(),
            records: MemoryRecordStore::new(),
            transcriber: RecordingTranscriber::new(),
        }
    }

    fn ctx(&self) -> ReviewContext<'_> {
        ReviewContext::new(&self.objects, &self.records, &self.transcriber)
            .with_clock(Rc::new(ManualClock::new(1_700_000_000_000)))
    }
}

fn clip() -> RecordedClip {
    RecordedClip {
        bytes: b"webm-bytes".to_vec(),
        mime: "video/webm".to_string(),
        duration_secs: 9,
    }
}

fn stopped_session() -> RecordingSession {
    let mut session = RecordingSession::new(None);
    session.transition(RecorderState::Recording).unwrap();
    session.transition(RecorderState::Stopped).unwrap();
    session.set_clip(Some(clip()));
    session
}

fn snapshot() -> AnnotationSnapshot {
    AnnotationSnapshot {
        timestamp: 1.5,
        canvas_json: "{\"objects\":[]}".to_string(),
    }
}

#[test]
fn keys_follow_session_and_reviewer() {
    let ids = UploadIds::new("s1", "r1");
    assert_eq!(recording_key(&ids, 42), "s1/r1/42.webm");
    assert_eq!(sidecar_key(&ids, "rec-7"), "s1/r1/rec-7.annotations.json");
}

#[test]
fn upload_reports_progress_and_triggers_transcription() {
    let c = Collaborators::new();
    let ids = UploadIds::new("s1", "r1");
    let mut seen = Vec::new();
    let uploaded = upload_recording(&c.ctx(), &clip(), &ids, &mut |p| seen.push(p)).unwrap();

    assert_eq!(seen, vec![10, 60, 80, 100]);
    assert_eq!(uploaded.video_path, "s1/r1/1700000000000.webm");
    let stored = c.objects.get(RECORDINGS_BUCKET, &uploaded.video_path).unwrap();
    assert_eq!(stored.content_type, "video/webm");
    assert_eq!(stored.bytes, b"webm-bytes");

    let rows = c.records.recordings();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, RecordingStatus::Uploaded);
    assert_eq!(rows[0].duration_secs, 9);
    assert_eq!(
        c.transcriber.requests(),
        vec![(uploaded.recording_id.clone(), uploaded.video_path.clone())]
    );
}

#[test]
fn transcription_trigger_failure_does_not_fail_upload() {
    let c = Collaborators::new();
    c.transcriber.set_fail(true);
    let mut last = 0;
    upload_recording(&c.ctx(), &clip(), &UploadIds::new("s", "r"), &mut |p| last = p).unwrap();
    assert_eq!(last, 100);
    assert_eq!(c.records.recordings().len(), 1);
}

#[test]
fn storage_failure_is_a_retryable_upload_error() {
    let c = Collaborators::new();
    c.objects.fail_next("connection reset");
    let mut seen = Vec::new();
    let err = upload_recording(&c.ctx(), &clip(), &UploadIds::new("s", "r"), &mut |p| {
        seen.push(p)
    })
    .unwrap_err();
    assert!(err.is_retryable());
    assert!(err.user_message().contains("connection reset"));
    assert_eq!(seen, vec![10]);
    assert!(c.records.recordings().is_empty());
}

#[test]
fn sidecar_is_json_next_to_the_video() {
    let c = Collaborators::new();
    let ids = UploadIds::new("s1", "r1");
    let key =
        upload_annotation_sidecar(&c.objects, RECORDINGS_BUCKET, &ids, "rec-1", &[snapshot()])
            .unwrap();
    let stored = c.objects.get(RECORDINGS_BUCKET, &key).unwrap();
    assert_eq!(stored.content_type, "application/json");
    let back = crate::annotation::snapshot::decode_snapshots(
        std::str::from_utf8(&stored.bytes).unwrap(),
    )
    .unwrap();
    assert_eq!(back, vec![snapshot()]);
}

#[test]
fn submit_moves_session_to_success() {
    let c = Collaborators::new();
    let mut session = stopped_session();
    let mut submission = ReviewSubmission::new(UploadIds::new("s1", "r1"), vec![snapshot()]);
    let uploaded = submission.submit(&c.ctx(), &mut session).unwrap();

    assert_eq!(session.state(), RecorderState::Success);
    assert_eq!(session.upload_progress(), 100);
    assert_eq!(submission.uploaded(), Some(&uploaded));
    let sidecar = sidecar_key(submission.ids(), &uploaded.recording_id);
    assert!(c.objects.get(RECORDINGS_BUCKET, &sidecar).is_some());
}

#[test]
fn failed_submit_keeps_clip_for_retry() {
    let c = Collaborators::new();
    let mut session = stopped_session();
    let mut submission = ReviewSubmission::new(UploadIds::new("s1", "r1"), Vec::new());

    c.objects.fail_next("offline");
    assert!(submission.submit(&c.ctx(), &mut session).is_err());
    assert_eq!(session.state(), RecorderState::Error);
    assert_eq!(session.clip(), Some(&clip()));
    assert!(session.error().unwrap().contains("offline"));

    submission.retry(&c.ctx(), &mut session).unwrap();
    assert_eq!(session.state(), RecorderState::Success);
    assert_eq!(c.objects.keys(RECORDINGS_BUCKET).len(), 1);
}

#[test]
fn sidecar_failure_is_not_fatal() {
    let c = Collaborators::new();
    let ids = UploadIds::new("s1", "r1");
    // Occupy the sidecar key the first recording will get.
    c.objects
        .upload(RECORDINGS_BUCKET, &sidecar_key(&ids, "recording-1"), b"x", "text/plain")
        .unwrap();
    let mut session = stopped_session();
    let mut submission = ReviewSubmission::new(ids, vec![snapshot()]);
    submission.submit(&c.ctx(), &mut session).unwrap();
    assert_eq!(session.state(), RecorderState::Success);
}

#[test]
fn submit_requires_a_clip_and_retry_requires_an_error() {
    let c = Collaborators::new();
    let mut session = RecordingSession::new(None);
    let mut submission = ReviewSubmission::new(UploadIds::new("s", "r"), Vec::new());
    assert!(submission.submit(&c.ctx(), &mut session).is_err());
    assert_eq!(session.state(), RecorderState::Idle);

    let mut session = stopped_session();
    assert!(submission.retry(&c.ctx(), &mut session).is_err());
    assert_eq!(session.state(), RecorderState::Stopped);
}

#[test]
fn signed_urls_last_an_hour() {
    let c = Collaborators::new();
    c.objects
        .upload(RECORDINGS_BUCKET, "s/r/1.webm", b"v", "video/webm")
        .unwrap();
    let url = signed_recording_url(&c.objects, RECORDINGS_BUCKET, "s/r/1.webm").unwrap();
    assert!(url.ends_with("expires_in=3600"));
}
