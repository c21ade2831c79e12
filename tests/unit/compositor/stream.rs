use std::cell::Cell;

use super::*;
use crate::compositor::ticker::ClockTicker;
use crate::foundation::clock::ManualClock;
use crate::render::layers::SurfaceLayers;

struct FixedLayers {
    layers: Option<SurfaceLayers>,
    calls: Cell<u32>,
}

impl FixedLayers {
    fn white(width: u32, height: u32) -> Self {
        Self {
            layers: Some(SurfaceLayers {
                lower: FrameRGBA::solid(width, height, Rgba8::WHITE),
                upper: FrameRGBA::transparent(width, height),
            }),
            calls: Cell::new(0),
        }
    }
}

impl LayerSource for FixedLayers {
    fn layers(&mut self) -> InkreelResult<Option<SurfaceLayers>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.layers.clone())
    }
}

fn near_white(px: [u8; 4]) -> bool {
    px.iter().all(|&c| c >= 250)
}

fn webcam_frame() -> FrameRGBA {
    // Left half red, right half blue.
    let mut data = Vec::new();
    for _y in 0..2 {
        for x in 0..4 {
            if x < 2 {
                data.extend_from_slice(&[255, 0, 0, 255]);
            } else {
                data.extend_from_slice(&[0, 0, 255, 255]);
            }
        }
    }
    FrameRGBA {
        width: 4,
        height: 2,
        data,
        premultiplied: true,
    }
}

fn device_with_camera() -> (MediaStream, MediaTrack, MediaTrack) {
    let cam = MediaTrack::video("cam");
    cam.push_frame(webcam_frame());
    let mic = MediaTrack::audio("mic");
    (MediaStream::new(vec![cam.clone(), mic.clone()]), cam, mic)
}

#[test]
fn pip_geometry_matches_defaults() {
    let r = pip_rect(&CompositorOpts::default(), 200, 100).unwrap();
    assert_eq!(r, Rect::new(152.0, 61.0, 188.0, 88.0));

    let top_left = CompositorOpts {
        pip_corner: PipCorner::TopLeft,
        ..CompositorOpts::default()
    };
    assert_eq!(
        pip_rect(&top_left, 200, 100).unwrap(),
        Rect::new(12.0, 12.0, 48.0, 39.0)
    );
    assert!(pip_rect(&CompositorOpts::default(), 1, 1).is_none());
}

#[test]
fn letterbox_centers_uniformly() {
    let a = letterbox((100, 100), (200, 100));
    assert_eq!(a * kurbo::Point::new(0.0, 0.0), kurbo::Point::new(50.0, 0.0));
    assert_eq!(a * kurbo::Point::new(100.0, 100.0), kurbo::Point::new(150.0, 100.0));
}

#[test]
fn output_shares_device_audio_only() {
    let (device, cam, mic) = device_with_camera();
    let comp = StreamCompositor::new(&device, CompositorOpts::default());
    let out = comp.stream();
    assert_eq!(out.video_tracks().count(), 1);
    assert!(!out.video_tracks().any(|t| t.same_track(&cam)));
    assert!(out.audio_tracks().next().unwrap().same_track(&mic));
}

#[test]
fn resolution_locks_to_first_frame() {
    let device = MediaStream::new(vec![MediaTrack::audio("mic")]);
    let mut comp = StreamCompositor::new(&device, CompositorOpts::default());

    let mut empty = FixedLayers {
        layers: None,
        calls: Cell::new(0),
    };
    assert!(comp.draw_frame(&mut empty).unwrap().is_none());
    assert!(comp.locked_size().is_none());

    let frame = comp.draw_frame(&mut FixedLayers::white(200, 100)).unwrap().unwrap();
    assert_eq!((frame.width, frame.height), (200, 100));
    assert_eq!(comp.locked_size(), Some((200, 100)));

    // Square source is pillarboxed into the locked frame.
    let frame = comp.draw_frame(&mut FixedLayers::white(100, 100)).unwrap().unwrap();
    assert_eq!((frame.width, frame.height), (200, 100));
    assert_eq!(frame.pixel(10, 50).unwrap()[3], 0);
    assert!(near_white(frame.pixel(100, 50).unwrap()));
    assert_eq!(comp.video_track().frames_pushed(), 2);
}

#[test]
fn webcam_thumbnail_is_mirrored() {
    let (device, _cam, _mic) = device_with_camera();
    let mut comp = StreamCompositor::new(&device, CompositorOpts::default());
    let frame = comp.draw_frame(&mut FixedLayers::white(200, 100)).unwrap().unwrap();

    let left = frame.pixel(160, 75).unwrap();
    let right = frame.pixel(180, 75).unwrap();
    assert!(
        left[2] > 200 && left[0] < 50,
        "left of thumbnail shows the right of the camera: {left:?}"
    );
    assert!(right[0] > 200 && right[2] < 50, "{right:?}");
    // Outside the thumbnail the document is untouched.
    assert!(near_white(frame.pixel(20, 20).unwrap()));
}

#[test]
fn stopped_camera_draws_no_thumbnail() {
    let (device, cam, _mic) = device_with_camera();
    cam.stop();
    let mut comp = StreamCompositor::new(&device, CompositorOpts::default());
    let frame = comp.draw_frame(&mut FixedLayers::white(200, 100)).unwrap().unwrap();
    assert!(near_white(frame.pixel(170, 75).unwrap()));
}

#[test]
fn destroy_stops_only_synthesized_tracks() {
    let (device, cam, mic) = device_with_camera();
    let mut comp = StreamCompositor::new(&device, CompositorOpts::default());
    comp.destroy();
    comp.destroy();
    assert!(comp.is_destroyed());
    assert!(!comp.video_track().is_live());
    assert!(cam.is_live() && mic.is_live());

    let mut source = FixedLayers::white(20, 20);
    assert!(comp.draw_frame(&mut source).unwrap().is_none());
    assert_eq!(source.calls.get(), 0);
}

#[test]
fn run_draws_one_frame_per_tick() {
    let device = MediaStream::default();
    let mut comp = StreamCompositor::new(&device, CompositorOpts::default());
    let clock = ManualClock::new(0);
    let mut ticker = ClockTicker::new(clock, 30, 5);
    let mut source = FixedLayers::white(20, 20);

    let mut seen = 0;
    let produced = comp
        .run(&mut source, &mut ticker, |_frame| {
            seen += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!((produced, seen), (5, 5));

    let mut ticker = ClockTicker::new(ManualClock::new(0), 30, 5);
    let produced = comp
        .run(&mut source, &mut ticker, |_frame| ControlFlow::Break(()))
        .unwrap();
    assert_eq!(produced, 1);
    assert_eq!(comp.frames_drawn(), 6);
}
