use super::*;
use crate::foundation::clock::ManualClock;
use crate::media::track::MediaTrack;
use crate::record::encoder::MemoryEncoder;

fn stream() -> MediaStream {
    MediaStream::new(vec![MediaTrack::audio("mic"), MediaTrack::video("cam")])
}

fn engine(supported: &[&str], opts: RecorderOpts) -> (RecordingEngine<MemoryEncoder>, ManualClock) {
    let clock = ManualClock::new(1_000);
    let engine = RecordingEngine::new(
        MemoryEncoder::new(supported.iter().copied()),
        Rc::new(clock.clone()),
        opts,
    );
    (engine, clock)
}

#[test]
fn paused_time_is_excluded_from_duration() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    assert_eq!(eng.mime(), Some(PREFERRED_MIME));

    clock.advance_ms(5_000);
    eng.pause();
    clock.advance_ms(2_000);
    assert_eq!(eng.elapsed_secs(), 5);
    clock.advance_ms(1_000);
    eng.resume();
    clock.advance_ms(4_000);

    let clip = eng.stop().unwrap();
    assert_eq!(clip.duration_secs, 9);
    assert_eq!(eng.state(), RecorderState::Stopped);
    assert_eq!(eng.elapsed_secs(), 9);
    assert!(!clip.bytes.is_empty());
    assert!(eng.stop().is_none());
}

#[test]
fn stopping_while_paused_excludes_the_open_pause() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(3_000);
    eng.pause();
    clock.advance_ms(10_000);
    assert_eq!(eng.stop().unwrap().duration_secs, 3);
}

#[test]
fn pause_and_resume_are_no_ops_out_of_order() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.pause();
    eng.resume();
    assert_eq!(eng.state(), RecorderState::Idle);

    eng.start(&stream()).unwrap();
    eng.resume();
    assert_eq!(eng.state(), RecorderState::Recording);
    eng.pause();
    clock.advance_ms(1_000);
    eng.pause();
    eng.resume();
    clock.advance_ms(2_000);
    assert_eq!(eng.elapsed_secs(), 2);
}

#[test]
fn limit_auto_stops_on_tick() {
    let opts = RecorderOpts::default().with_max_duration(Some(60));
    let (mut eng, clock) = engine(&[PREFERRED_MIME], opts);
    eng.start(&stream()).unwrap();

    let mut stopped = None;
    for _ in 0..200 {
        clock.advance_ms(500);
        for ev in eng.tick() {
            if let RecorderEvent::Stopped(clip) = ev {
                stopped = Some(clip);
            }
        }
        if stopped.is_some() {
            break;
        }
    }
    let clip = stopped.expect("auto stop");
    assert_eq!(clip.duration_secs, 60);
    assert_eq!(eng.state(), RecorderState::Stopped);
    assert!(eng.tick().is_empty());
}

#[test]
fn ticks_report_whole_seconds_only_while_recording() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(1_500);
    let events = eng.tick();
    assert!(matches!(events.as_slice(), [RecorderEvent::Duration(1)]));

    eng.pause();
    clock.advance_ms(5_000);
    assert!(eng.tick().is_empty());
}

#[test]
fn progress_bands() {
    assert_eq!(DurationProgress::new(10, 0), None);
    assert_eq!(DurationProgress::new(30, 60).unwrap().urgency, Urgency::Normal);
    assert_eq!(DurationProgress::new(46, 60).unwrap().urgency, Urgency::Warning);
    assert_eq!(DurationProgress::new(55, 60).unwrap().urgency, Urgency::Critical);
    assert_eq!(DurationProgress::new(90, 60).unwrap().ratio, 1.0);

    let opts = RecorderOpts::default().with_max_duration(Some(10));
    let (mut eng, clock) = engine(&[PREFERRED_MIME], opts);
    assert_eq!(eng.progress().unwrap().ratio, 0.0);
    eng.start(&stream()).unwrap();
    clock.advance_ms(8_000);
    assert_eq!(eng.progress().unwrap().urgency, Urgency::Warning);
}

#[test]
fn falls_back_to_secondary_format() {
    let (mut eng, _clock) = engine(&[FALLBACK_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    assert_eq!(eng.mime(), Some(FALLBACK_MIME));
    assert_eq!(eng.encoder().config().unwrap().mime, FALLBACK_MIME);
}

#[test]
fn no_supported_format_is_an_encoding_error() {
    let (mut eng, _clock) = engine(&["video/mp4"], RecorderOpts::default());
    let err = eng.start(&stream()).unwrap_err();
    assert!(matches!(err, InkreelError::Encoding(_)));
    assert_eq!(eng.state(), RecorderState::Error);
    assert_eq!(eng.error(), Some("Recording failed unexpectedly."));

    eng.reset();
    assert_eq!(eng.state(), RecorderState::Idle);
    assert!(eng.error().is_none());
}

#[test]
fn encoder_failure_mid_recording_is_reported() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(2_000);
    eng.encoder_mut().fail_next("pipe closed");

    let events = eng.tick();
    assert!(matches!(events.as_slice(), [RecorderEvent::Failed(InkreelError::Encoding(_))]));
    assert_eq!(eng.state(), RecorderState::Error);
    assert!(eng.stop().is_none());
}

#[test]
fn failure_during_stop_is_delivered_by_next_tick() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(2_000);
    eng.encoder_mut().fail_next("finalize failed");
    assert!(eng.stop().is_none());
    assert_eq!(eng.state(), RecorderState::Error);
    assert!(matches!(eng.tick().as_slice(), [RecorderEvent::Failed(_)]));
}

#[test]
fn dead_streams_are_rejected() {
    let (mut eng, _clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    let s = stream();
    s.stop_all();
    assert!(eng.start(&s).is_err());
    assert_eq!(eng.state(), RecorderState::Idle);
}

#[test]
fn destroy_stops_device_tracks_and_is_idempotent() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    let s = stream();
    eng.start(&s).unwrap();
    clock.advance_ms(1_200);
    let clip = eng.destroy(Some(&s));
    assert_eq!(clip.map(|c| c.duration_secs), Some(1));
    assert!(!s.is_active());
    assert!(eng.destroy(Some(&s)).is_none());
}

#[test]
fn preview_and_re_record() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    assert!(eng.preview().is_err());
    eng.start(&stream()).unwrap();
    clock.advance_ms(2_000);
    eng.stop().unwrap();
    eng.preview().unwrap();
    assert_eq!(eng.state(), RecorderState::Preview);
    assert!(eng.clip().is_some());

    eng.reset();
    assert!(eng.clip().is_none());
    assert!(eng.start_ms().is_none());
    eng.start(&stream()).unwrap();
    assert_eq!(eng.start_ms(), Some(3_000));
}

#[test]
fn chunks_are_concatenated_in_order() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(2_100);
    eng.pump().unwrap();
    clock.advance_ms(500);
    let clip = eng.stop().unwrap();
    assert_eq!(clip.bytes, b"chunk-0;chunk-1;chunk-2;".to_vec());
    assert_eq!(clip.mime, PREFERRED_MIME);
}

#[test]
fn start_after_failure_requires_reset() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(1_000);
    eng.encoder_mut().fail_next("boom");
    eng.tick();
    assert_eq!(eng.state(), RecorderState::Error);

    let err = eng.start(&stream()).unwrap_err();
    assert!(matches!(err, InkreelError::Validation(_)));
    assert_eq!(eng.state(), RecorderState::Error);
    assert_eq!(eng.error(), Some("Recording failed unexpectedly."));

    eng.reset();
    eng.start(&stream()).unwrap();
    assert_eq!(eng.state(), RecorderState::Recording);
}

#[test]
fn start_from_stopped_or_preview_requires_reset() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(2_000);
    eng.stop().unwrap();
    assert!(eng.start(&stream()).is_err());
    assert_eq!(eng.state(), RecorderState::Stopped);

    eng.preview().unwrap();
    assert!(eng.start(&stream()).is_err());
    assert_eq!(eng.state(), RecorderState::Preview);
    assert!(eng.clip().is_some());

    eng.reset();
    eng.start(&stream()).unwrap();
    assert_eq!(eng.state(), RecorderState::Recording);
}

#[test]
fn preview_is_rejected_from_preview_and_error() {
    let (mut eng, clock) = engine(&[PREFERRED_MIME], RecorderOpts::default());
    eng.start(&stream()).unwrap();
    clock.advance_ms(1_000);
    eng.stop().unwrap();
    eng.preview().unwrap();
    assert!(eng.preview().is_err());
    assert_eq!(eng.state(), RecorderState::Preview);

    eng.reset();
    eng.start(&stream()).unwrap();
    eng.encoder_mut().fail_next("boom");
    eng.tick();
    assert!(eng.preview().is_err());
    assert_eq!(eng.state(), RecorderState::Error);
}
