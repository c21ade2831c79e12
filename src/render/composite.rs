use crate::foundation::error::{InkreelError, InkreelResult};
use crate::foundation::math::mul_div255_u8;

/// Premultiplied RGBA8 pixel.
pub(crate) type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over with an extra opacity multiplier.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Porter-Duff destination-out: keep `dst` where `mask` is transparent.
pub(crate) fn dest_out(dst: PremulRgba8, mask_alpha: u8) -> PremulRgba8 {
    if mask_alpha == 0 {
        return dst;
    }
    let keep = 255u16 - u16::from(mask_alpha);
    [
        mul_div255_u8(u16::from(dst[0]), keep),
        mul_div255_u8(u16::from(dst[1]), keep),
        mul_div255_u8(u16::from(dst[2]), keep),
        mul_div255_u8(u16::from(dst[3]), keep),
    ]
}

pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> InkreelResult<()> {
    check_buffers(dst, src, "over_in_place")?;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Erase `dst` wherever `mask` has coverage. Only the mask alpha is read.
pub(crate) fn dest_out_in_place(dst: &mut [u8], mask: &[u8]) -> InkreelResult<()> {
    check_buffers(dst, mask, "dest_out_in_place")?;
    for (d, m) in dst.chunks_exact_mut(4).zip(mask.chunks_exact(4)) {
        let out = dest_out([d[0], d[1], d[2], d[3]], m[3]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Convert premultiplied pixels over an opaque background into straight opaque RGBA8.
pub(crate) fn flatten_onto(rgba8_premul: &[u8], bg: [u8; 3]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgba8_premul.len());
    for px in rgba8_premul.chunks_exact(4) {
        let inv = 255u16 - u16::from(px[3]);
        for c in 0..3 {
            out.push(add_sat_u8(px[c], mul_div255_u8(u16::from(bg[c]), inv)));
        }
        out.push(255);
    }
    out
}

fn check_buffers(dst: &[u8], src: &[u8], what: &str) -> InkreelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(InkreelError::render(format!(
            "{what} expects equal-length rgba8 buffers"
        )));
    }
    Ok(())
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
