use super::*;
use crate::foundation::clock::ManualClock;
use crate::review::store::{MemoryRecordStore, TranscriptStatus};

fn transcript(status: TranscriptStatus) -> Transcript {
    Transcript {
        recording_id: "rec-1".to_string(),
        status,
        text: "looks good".to_string(),
        segments: Vec::new(),
    }
}

#[test]
fn defaults_poll_for_two_and_a_half_minutes() {
    let opts = PollOpts::default();
    assert_eq!(opts.max_attempts, 30);
    assert_eq!(opts.interval * opts.max_attempts, Duration::from_secs(150));
}

#[test]
fn ready_transcripts_return_immediately() {
    let records = MemoryRecordStore::new();
    records
        .upsert_transcript(transcript(TranscriptStatus::Complete))
        .unwrap();
    let clock = ManualClock::new(0);
    let poll = poll_transcript(&records, "rec-1", PollOpts::default(), &clock).unwrap();
    assert_eq!(poll, TranscriptPoll::Ready(transcript(TranscriptStatus::Complete)));
    assert_eq!(clock.now_ms(), 0);
}

#[test]
fn failed_transcripts_are_terminal() {
    let records = MemoryRecordStore::new();
    records
        .upsert_transcript(transcript(TranscriptStatus::Failed))
        .unwrap();
    let poll =
        poll_transcript(&records, "rec-1", PollOpts::default(), &ManualClock::new(0)).unwrap();
    assert!(matches!(poll, TranscriptPoll::Ready(t) if t.status == TranscriptStatus::Failed));
}

#[test]
fn never_finishing_is_pending_not_an_error() {
    let records = MemoryRecordStore::new();
    records
        .upsert_transcript(transcript(TranscriptStatus::Processing))
        .unwrap();
    let clock = ManualClock::new(0);
    let opts = PollOpts {
        max_attempts: 3,
        interval: Duration::from_millis(200),
    };
    let poll = poll_transcript(&records, "rec-1", opts, &clock).unwrap();
    assert_eq!(poll, TranscriptPoll::Pending);
    assert_eq!(clock.now_ms(), 600);
}

#[test]
fn empty_recording_id_is_rejected() {
    let records = MemoryRecordStore::new();
    assert!(poll_transcript(&records, "", PollOpts::default(), &ManualClock::new(0)).is_err());
}

#[test]
fn timestamps_format_as_minutes_and_seconds() {
    assert_eq!(format_timestamp(0.0), "0:00");
    assert_eq!(format_timestamp(9.9), "0:09");
    assert_eq!(format_timestamp(75.2), "1:15");
    assert_eq!(format_timestamp(3600.0), "60:00");
    assert_eq!(format_timestamp(-3.0), "0:00");
    assert_eq!(format_timestamp(f64::NAN), "0:00");
}
