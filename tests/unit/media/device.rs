use super::*;
use crate::foundation::core::Rgba8;

struct Denied;

impl DeviceProvider for Denied {
    fn acquire(&mut self, _c: &CaptureConstraints) -> Result<MediaStream, CaptureError> {
        Err(CaptureError::PermissionDenied)
    }
}

#[test]
fn default_constraints_match_capture_profile() {
    let c = CaptureConstraints::default();
    let audio = c.audio.unwrap();
    assert!(audio.echo_cancellation && audio.noise_suppression);
    assert_eq!(audio.sample_rate, 44_100);
    let video = c.video.unwrap();
    assert_eq!((video.ideal_width, video.ideal_height), (1280, 720));
    assert!(video.user_facing);
}

#[test]
fn denial_and_missing_devices_have_distinct_messages() {
    let denied = request_permissions(&mut Denied, &CaptureConstraints::default()).unwrap_err();
    assert!(matches!(denied, InkreelError::Permission(_)));
    assert_eq!(
        denied.user_message(),
        "Camera and microphone access is required to record feedback."
    );

    let missing = request_permissions(
        &mut StillFrameDevice::audio_only(),
        &CaptureConstraints::default(),
    )
    .unwrap_err();
    assert!(matches!(missing, InkreelError::Device(_)));
    assert_eq!(missing.user_message(), "Could not access camera or microphone.");
}

#[test]
fn still_device_publishes_its_frame() {
    let mut device = StillFrameDevice::new(FrameRGBA::solid(4, 3, Rgba8::BLACK));
    let stream = device.acquire(&CaptureConstraints::default()).unwrap();
    assert_eq!(stream.audio_tracks().count(), 1);
    let cam = stream.first_live_video().unwrap();
    assert_eq!(cam.current_frame().map(|f| (f.width, f.height)), Some((4, 3)));

    let audio_only = StillFrameDevice::audio_only()
        .acquire(&CaptureConstraints {
            audio: Some(AudioConstraints::default()),
            video: None,
        })
        .unwrap();
    assert_eq!(audio_only.tracks().len(), 1);
}

#[test]
fn malformed_frames_fail_acquisition() {
    let bad = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 3],
        premultiplied: true,
    };
    let err = StillFrameDevice::new(bad)
        .acquire(&CaptureConstraints::default())
        .unwrap_err();
    assert!(matches!(err, CaptureError::Failed(_)));
    assert!(!err.is_permission());
}
