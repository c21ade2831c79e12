use kurbo::Shape as _;

use super::*;
use crate::foundation::core::Rect;

fn px(bytes: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]
}

#[test]
fn fill_rect_path_paints_interior_only() {
    let mut layer = CpuLayer::new(16, 16).unwrap();
    layer.fill_path(
        &Rect::new(4.0, 4.0, 12.0, 12.0).to_path(0.1),
        Affine::IDENTITY,
        Rgba8::rgba(255, 0, 0, 255),
    );
    let out = layer.render();
    assert_eq!(out.len(), 16 * 16 * 4);
    assert_eq!(px(&out, 16, 8, 8), [255, 0, 0, 255]);
    assert_eq!(px(&out, 16, 1, 1), [0, 0, 0, 0]);
}

#[test]
fn render_resets_between_batches() {
    let mut layer = CpuLayer::new(8, 8).unwrap();
    layer.fill_path(
        &Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1),
        Affine::IDENTITY,
        Rgba8::WHITE,
    );
    let first = layer.render();
    assert_eq!(px(&first, 8, 3, 3), [255, 255, 255, 255]);
    let second = layer.render();
    assert!(second.iter().all(|&b| b == 0));
}

#[test]
fn draw_image_honors_transform() {
    let frame = FrameRGBA::solid(2, 2, Rgba8::rgba(0, 255, 0, 255));
    let image = CpuImage::from_frame(&frame).unwrap();
    let mut layer = CpuLayer::new(10, 10).unwrap();
    layer.draw_image(&image, Affine::translate((4.0, 4.0)) * Affine::scale(2.0));
    let out = layer.render();
    assert_eq!(px(&out, 10, 5, 5), [0, 255, 0, 255]);
    assert_eq!(px(&out, 10, 1, 1), [0, 0, 0, 0]);
}

#[test]
fn zero_sized_layers_are_rejected() {
    assert!(CpuLayer::new(0, 10).is_err());
    assert!(CpuLayer::new(70_000, 10).is_err());
}
