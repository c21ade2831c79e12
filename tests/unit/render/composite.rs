use super::*;

#[test]
fn over_opaque_src_replaces_dst() {
    assert_eq!(over([0, 0, 255, 255], [255, 0, 0, 255], 1.0), [255, 0, 0, 255]);
}

#[test]
fn over_transparent_src_keeps_dst() {
    assert_eq!(over([1, 2, 3, 4], [0, 0, 0, 0], 1.0), [1, 2, 3, 4]);
    assert_eq!(over([1, 2, 3, 4], [255, 0, 0, 255], 0.0), [1, 2, 3, 4]);
}

#[test]
fn over_half_alpha_blends() {
    let out = over([0, 0, 255, 255], [128, 0, 0, 128], 1.0);
    assert_eq!(out, [128, 0, 127, 255]);
}

#[test]
fn dest_out_removes_covered_pixels() {
    assert_eq!(dest_out([200, 10, 10, 255], 255), [0, 0, 0, 0]);
    assert_eq!(dest_out([200, 10, 10, 255], 0), [200, 10, 10, 255]);
    let half = dest_out([200, 0, 0, 200], 128);
    assert_eq!(half, [100, 0, 0, 100]);
}

#[test]
fn in_place_ops_check_lengths() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
    assert!(dest_out_in_place(&mut dst, &[0u8; 12]).is_err());
    assert!(over_in_place(&mut dst, &[255u8; 8], 1.0).is_ok());
    assert_eq!(dst, vec![255u8; 8]);
    dest_out_in_place(&mut dst, &[0, 0, 0, 255, 0, 0, 0, 0]).unwrap();
    assert_eq!(dst, vec![0, 0, 0, 0, 255, 255, 255, 255]);
}

#[test]
fn flatten_composites_over_background() {
    let out = flatten_onto(&[0, 0, 0, 0, 255, 0, 0, 255], [255, 255, 255]);
    assert_eq!(out, vec![255, 255, 255, 255, 255, 0, 0, 255]);
}
