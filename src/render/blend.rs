use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u8};

/// Source-over composite of premultiplied `src` onto `dst`.
pub(crate) fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> ReelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::render(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - sa;
        d[3] = add_sat_u8(s[3], mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            let dc = mul_div255_u8(u16::from(d[c]), inv);
            d[c] = add_sat_u8(s[c], dc);
        }
    }
    Ok(())
}

/// Write `a * (1 - t) + b * t` into `dst`.
///
/// Both inputs are premultiplied; `t` is the incoming layer's weight and is clamped to `[0, 1]`.
pub(crate) fn crossfade_rgba8_premul(dst: &mut [u8], a: &[u8], b: &[u8], t: f32) -> ReelResult<()> {
    if dst.len() != a.len() || dst.len() != b.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::render(
            "crossfade_rgba8_premul expects equal-length rgba8 buffers",
        ));
    }
    let tt = ((t.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;
    for ((d, ap), bp) in dst
        .chunks_exact_mut(4)
        .zip(a.chunks_exact(4))
        .zip(b.chunks_exact(4))
    {
        for c in 0..4 {
            let av = mul_div255_u8(u16::from(ap[c]), it);
            let bv = mul_div255_u8(u16::from(bp[c]), tt);
            d[c] = add_sat_u8(av, bv);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
