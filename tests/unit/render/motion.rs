use super::*;
use kurbo::Point;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn zoom_in_reaches_intensity_scale() {
    let anim = Animation::zoom(AnimationDirection::In, 0.3);
    assert_eq!(motion_at(&anim, 0.0), MotionState::IDENTITY);
    let end = motion_at(&anim, 1.0);
    assert!(approx(end.scale, 1.09));
    assert!(approx(motion_at(&anim, 0.5).scale, 1.045));
}

#[test]
fn zoom_out_runs_backwards() {
    let anim = Animation::zoom(AnimationDirection::Out, 1.0);
    assert!(approx(motion_at(&anim, 0.0).scale, 1.3));
    assert!(approx(motion_at(&anim, 1.0).scale, 1.0));
}

#[test]
fn pan_direction_sets_offset_sign() {
    let left = motion_at(&Animation::pan(AnimationDirection::Left, 1.0), 1.0);
    let right = motion_at(&Animation::pan(AnimationDirection::Right, 1.0), 1.0);
    assert!(approx(left.offset_x_frac, -0.1));
    assert!(approx(right.offset_x_frac, 0.1));
    // Enlarged enough that a full pan never exposes the background.
    assert!(left.scale >= 1.0 + 2.0 * 0.1);
}

#[test]
fn intensity_and_progress_are_clamped() {
    let anim = Animation::zoom(AnimationDirection::In, 7.0);
    assert!(approx(motion_at(&anim, 2.0).scale, 1.3));
    assert_eq!(motion_at(&anim, f64::NAN), MotionState::IDENTITY);
    assert_eq!(motion_at(&Animation::default(), 0.7), MotionState::IDENTITY);
}

#[test]
fn scaling_happens_about_canvas_center() {
    let canvas = Canvas {
        width: 200,
        height: 100,
    };
    let m = MotionState {
        scale: 2.0,
        offset_x_frac: 0.0,
    }
    .to_affine(canvas);
    let c = m * Point::new(100.0, 50.0);
    assert!(approx(c.x, 100.0) && approx(c.y, 50.0));
    let corner = m * Point::new(0.0, 0.0);
    assert!(approx(corner.x, -100.0) && approx(corner.y, -50.0));
}

#[test]
fn cover_fit_crops_the_long_side() {
    let canvas = Canvas {
        width: 160,
        height: 90,
    };
    // Square image: scaled to width, cropped top and bottom.
    let a = cover_fit(100, 100, canvas);
    let tl = a * Point::new(0.0, 0.0);
    let br = a * Point::new(100.0, 100.0);
    assert!(approx(tl.x, 0.0) && approx(br.x, 160.0));
    assert!(approx(tl.y, -35.0) && approx(br.y, 125.0));
}
