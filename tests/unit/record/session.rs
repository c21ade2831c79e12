use super::*;

fn clip(secs: u64) -> RecordedClip {
    RecordedClip {
        bytes: vec![1, 2, 3],
        mime: "video/webm".to_string(),
        duration_secs: secs,
    }
}

#[test]
fn transition_table() {
    use RecorderState::*;
    assert!(Idle.can_transition_to(Recording));
    assert!(Recording.can_transition_to(Paused));
    assert!(Paused.can_transition_to(Recording));
    assert!(Recording.can_transition_to(Stopped));
    assert!(Stopped.can_transition_to(Preview));
    assert!(Preview.can_transition_to(Idle));
    assert!(Uploading.can_transition_to(Success));
    assert!(Preview.can_transition_to(Error));
    assert!(Error.can_transition_to(Idle));
    assert!(Error.can_transition_to(Uploading));

    assert!(!Idle.can_transition_to(Paused));
    assert!(!Idle.can_transition_to(Stopped));
    assert!(!Stopped.can_transition_to(Recording));
    assert!(!Error.can_transition_to(Recording));
    assert!(!Error.can_transition_to(Error));
    assert!(!Success.can_transition_to(Uploading));
}

#[test]
fn illegal_transitions_are_rejected() {
    let mut s = RecordingSession::new(None);
    assert!(s.transition(RecorderState::Paused).is_err());
    assert_eq!(s.state(), RecorderState::Idle);
    s.transition(RecorderState::Recording).unwrap();
    s.transition(RecorderState::Paused).unwrap();
    s.transition(RecorderState::Stopped).unwrap();
}

#[test]
fn engine_events_fold_into_the_session() {
    let mut s = RecordingSession::new(Some(60));
    s.transition(RecorderState::Recording).unwrap();
    s.apply(RecorderEvent::Duration(4)).unwrap();
    assert_eq!(s.elapsed_secs(), 4);

    s.apply(RecorderEvent::Stopped(clip(60))).unwrap();
    assert_eq!(s.state(), RecorderState::Stopped);
    assert_eq!(s.elapsed_secs(), 60);
    assert_eq!(s.clip().map(|c| c.bytes.len()), Some(3));
    assert_eq!(s.max_duration_secs(), Some(60));
}

#[test]
fn failures_carry_a_display_message() {
    let mut s = RecordingSession::new(None);
    s.transition(RecorderState::Recording).unwrap();
    s.apply(RecorderEvent::Failed(InkreelError::encoding("boom")))
        .unwrap();
    assert_eq!(s.state(), RecorderState::Error);
    assert_eq!(s.error(), Some("Recording failed unexpectedly."));
}

#[test]
fn reset_keeps_the_device_stream() {
    let mut s = RecordingSession::new(None);
    s.set_media_stream(Some(MediaStream::default()));
    s.set_clip(Some(clip(5)));
    s.set_upload_progress(250);
    assert_eq!(s.upload_progress(), 100);
    s.fail("upload failed");

    s.reset();
    assert_eq!(s.state(), RecorderState::Idle);
    assert!(s.clip().is_none());
    assert!(s.error().is_none());
    assert_eq!(s.upload_progress(), 0);
    assert!(s.media_stream().is_some());
}

#[test]
fn states_serialize_lowercase() {
    assert_eq!(
        serde_json::to_string(&RecorderState::Uploading).unwrap(),
        "\"uploading\""
    );
}
