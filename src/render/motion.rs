use crate::foundation::core::{Affine, Canvas, Vec2};
use crate::scene::model::{Animation, AnimationDirection, AnimationKind};

/// Scale added at the end of a full-intensity zoom.
pub const ZOOM_RANGE: f64 = 0.3;
/// Horizontal travel of a full-intensity pan, as a fraction of canvas width.
pub const PAN_RANGE: f64 = 0.1;

/// Camera state at one instant of a scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    /// Uniform scale about the canvas center.
    pub scale: f64,
    /// Horizontal offset as a fraction of canvas width (negative moves left).
    pub offset_x_frac: f64,
}

impl MotionState {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset_x_frac: 0.0,
    };

    /// Canvas-space transform: scale about the center, then shift horizontally.
    pub fn to_affine(self, canvas: Canvas) -> Affine {
        let c = Vec2::new(f64::from(canvas.width) / 2.0, f64::from(canvas.height) / 2.0);
        let dx = self.offset_x_frac * f64::from(canvas.width);
        Affine::translate(c + Vec2::new(dx, 0.0))
            * Affine::scale(self.scale)
            * Affine::translate(-c)
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn zoom_scale(direction: AnimationDirection, intensity: f64, t: f64) -> f64 {
    let end = 1.0 + ZOOM_RANGE * intensity;
    match direction {
        AnimationDirection::Out => lerp(end, 1.0, t),
        _ => lerp(1.0, end, t),
    }
}

/// Base scale that keeps a cover-fit image covering the canvas through a pan of `intensity`.
fn pan_cover_scale(intensity: f64) -> f64 {
    1.0 + 2.0 * PAN_RANGE * intensity
}

/// Evaluate `anim` at normalized scene progress `t`.
///
/// Zoom runs from identity to `1 + 0.3 * intensity` (reversed for `out`). Pans drift from center to
/// `intensity * 0.1 * width` in their direction over a slightly enlarged image so no edge is
/// exposed. `pan_zoom` combines the zoom of its in/out direction with a rightward pan.
pub fn motion_at(anim: &Animation, t: f64) -> MotionState {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let intensity = if anim.intensity.is_finite() {
        anim.intensity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let pan_end = PAN_RANGE * intensity;

    match anim.kind {
        AnimationKind::None => MotionState::IDENTITY,
        AnimationKind::Zoom => MotionState {
            scale: zoom_scale(anim.direction, intensity, t),
            offset_x_frac: 0.0,
        },
        AnimationKind::Pan => {
            let sign = if anim.direction == AnimationDirection::Left {
                -1.0
            } else {
                1.0
            };
            MotionState {
                scale: pan_cover_scale(intensity),
                offset_x_frac: lerp(0.0, sign * pan_end, t),
            }
        }
        AnimationKind::PanZoom => MotionState {
            scale: pan_cover_scale(intensity) * zoom_scale(anim.direction, intensity, t),
            offset_x_frac: lerp(0.0, pan_end, t),
        },
    }
}

/// Transform placing a `w x h` image cover-fit into `canvas`: aspect kept, centered, overflow
/// cropped.
pub fn cover_fit(image_w: u32, image_h: u32, canvas: Canvas) -> Affine {
    if image_w == 0 || image_h == 0 {
        return Affine::IDENTITY;
    }
    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));
    let (iw, ih) = (f64::from(image_w), f64::from(image_h));
    let s = (cw / iw).max(ch / ih);
    let tx = (cw - iw * s) / 2.0;
    let ty = (ch - ih * s) / 2.0;
    Affine::translate((tx, ty)) * Affine::scale(s)
}

#[cfg(test)]
#[path = "../../tests/unit/render/motion.rs"]
mod tests;
