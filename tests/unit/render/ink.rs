use super::*;
use crate::annotation::model::{ObjectId, Style};

fn obj(id: u64, shape: Shape, width: f64) -> AnnotationObject {
    AnnotationObject {
        id: ObjectId(id),
        shape,
        style: Style {
            color: Rgba8::rgba(255, 0, 0, 255),
            width,
        },
        interactive: false,
    }
}

fn alpha(bytes: &[u8], width: u32, x: u32, y: u32) -> u8 {
    bytes[((y * width + x) * 4 + 3) as usize]
}

#[test]
fn erase_removes_only_overlapped_ink() {
    let pen = obj(
        1,
        Shape::Stroke {
            points: vec![Point::new(2.0, 20.0), Point::new(38.0, 20.0)],
        },
        6.0,
    );
    let elsewhere = obj(
        2,
        Shape::Stroke {
            points: vec![Point::new(2.0, 5.0), Point::new(38.0, 5.0)],
        },
        4.0,
    );
    let eraser = obj(
        3,
        Shape::Erase {
            points: vec![Point::new(20.0, 12.0), Point::new(20.0, 38.0)],
        },
        8.0,
    );
    let out = render_ink_layer(&[pen, elsewhere, eraser], Affine::IDENTITY, 40, 40).unwrap();
    assert_eq!(alpha(&out, 40, 20, 20), 0);
    assert_eq!(alpha(&out, 40, 8, 20), 255);
    assert_eq!(alpha(&out, 40, 32, 20), 255);
    assert_eq!(alpha(&out, 40, 20, 5), 255);
}

#[test]
fn ink_after_an_eraser_is_kept() {
    let eraser = obj(
        1,
        Shape::Erase {
            points: vec![Point::new(0.0, 10.0), Point::new(20.0, 10.0)],
        },
        10.0,
    );
    let pen = obj(
        2,
        Shape::Stroke {
            points: vec![Point::new(10.0, 0.0), Point::new(10.0, 20.0)],
        },
        4.0,
    );
    let out = render_ink_layer(&[eraser, pen], Affine::IDENTITY, 20, 20).unwrap();
    assert_eq!(alpha(&out, 20, 10, 10), 255);
}

#[test]
fn viewport_transform_scales_ink() {
    let dot = obj(
        1,
        Shape::Stroke {
            points: vec![Point::new(5.0, 5.0)],
        },
        2.0,
    );
    let out = render_ink_layer(&[dot], Affine::scale(4.0), 40, 40).unwrap();
    assert_eq!(alpha(&out, 40, 20, 20), 255);
    assert_eq!(alpha(&out, 40, 5, 5), 0);
}

#[test]
fn outlines_cover_shape_edges() {
    let rect = obj(
        1,
        Shape::Rectangle {
            rect: kurbo::Rect::new(10.0, 10.0, 30.0, 30.0),
        },
        4.0,
    );
    let out = render_ink_layer(&[rect], Affine::IDENTITY, 40, 40).unwrap();
    assert_eq!(alpha(&out, 40, 10, 20), 255);
    assert_eq!(alpha(&out, 40, 20, 20), 0);

    let circle = obj(
        2,
        Shape::Circle {
            center: Point::new(20.0, 20.0),
            radius: 10.0,
        },
        4.0,
    );
    let out = render_ink_layer(&[circle], Affine::IDENTITY, 40, 40).unwrap();
    assert_eq!(alpha(&out, 40, 30, 20), 255);
    assert_eq!(alpha(&out, 40, 20, 20), 0);
}

#[test]
fn empty_scene_is_transparent() {
    let out = render_ink_layer(&[], Affine::IDENTITY, 4, 4).unwrap();
    assert!(out.iter().all(|&b| b == 0));
}
