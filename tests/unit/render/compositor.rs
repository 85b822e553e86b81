use std::io::Cursor;

use super::*;
use crate::assets::preload::preload_images;
use crate::config::Pacing;
use crate::foundation::core::Fps;
use crate::scene::model::{MediaPayload, SceneId};

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(16, 8, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn scene(id: &str, idx: u32, image: Vec<u8>) -> SceneDescriptor {
    SceneDescriptor {
        id: SceneId::new(id),
        sequence_index: idx,
        duration_secs: 1.0,
        image: MediaPayload::new(image, "image/png"),
        narration_audio: None,
        caption_text: None,
        animation: Animation::default(),
    }
}

fn config() -> RenderConfig {
    RenderConfig {
        canvas: Canvas {
            width: 64,
            height: 36,
        },
        fps: Fps::new(30, 1).unwrap(),
        transition_frames: 10,
        ..RenderConfig::default()
    }
    .with_pacing(Pacing::Offline)
}

fn compositor(scenes: &[SceneDescriptor], cfg: &RenderConfig) -> FrameCompositor {
    let images = preload_images(scenes, cfg.canvas);
    FrameCompositor::new(cfg, scenes, &images).unwrap()
}

fn pos(scene_index: usize, frame_in_scene: u64) -> ScenePosition {
    ScenePosition {
        scene_index,
        frame_in_scene,
        scene_frames: 30,
    }
}

#[test]
fn image_is_cover_fit_over_whole_canvas() {
    let cfg = config();
    let scenes = vec![scene("a", 0, png([255, 0, 0, 255]))];
    let mut comp = compositor(&scenes, &cfg);
    let frame = comp.compose(pos(0, 0)).unwrap();
    assert_eq!((frame.width, frame.height), (64, 36));
    assert_eq!(frame.data.len(), 64 * 36 * 4);
    assert_eq!(frame.pixel(32, 18), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(32, 2), Some([255, 0, 0, 255]));
}

#[test]
fn missing_image_draws_background() {
    let mut cfg = config();
    cfg.background_rgba = [0, 0, 0, 255];
    let scenes = vec![scene("a", 0, b"broken".to_vec())];
    let mut comp = compositor(&scenes, &cfg);
    let frame = comp.compose(pos(0, 5)).unwrap();
    assert!(frame.data.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
}

#[test]
fn dissolve_blends_into_next_scene_at_the_end() {
    let cfg = config();
    let scenes = vec![
        scene("a", 0, png([255, 0, 0, 255])),
        scene("b", 1, png([0, 0, 255, 255])),
    ];
    let mut comp = compositor(&scenes, &cfg);

    assert_eq!(comp.dissolve_weight(pos(0, 19)), None);
    let w_first = comp.dissolve_weight(pos(0, 20)).unwrap();
    let w_last = comp.dissolve_weight(pos(0, 29)).unwrap();
    assert!(w_first > 0.0 && w_first < w_last && w_last < 1.0);
    // The final scene never dissolves.
    assert_eq!(comp.dissolve_weight(pos(1, 29)), None);

    let px = comp.compose(pos(0, 19)).unwrap().pixel(32, 18).unwrap();
    assert_eq!(px, [255, 0, 0, 255]);
    let px = comp.compose(pos(0, 29)).unwrap().pixel(32, 18).unwrap();
    assert!(px[2] > px[0], "expected mostly blue, got {px:?}");
    assert_eq!(px[3], 255);
}

#[test]
fn dissolve_is_skipped_when_next_image_is_missing() {
    let cfg = config();
    let scenes = vec![
        scene("a", 0, png([255, 0, 0, 255])),
        scene("b", 1, Vec::new()),
    ];
    let mut comp = compositor(&scenes, &cfg);
    assert_eq!(comp.dissolve_weight(pos(0, 29)), None);
    let px = comp.compose(pos(0, 29)).unwrap().pixel(32, 18).unwrap();
    assert_eq!(px, [255, 0, 0, 255]);
}

#[test]
fn scene_without_image_stays_blank_through_its_dissolve_window() {
    let cfg = config();
    let scenes = vec![
        scene("a", 0, b"not an image".to_vec()),
        scene("b", 1, png([0, 255, 0, 255])),
    ];
    let mut comp = compositor(&scenes, &cfg);
    for f in 20..30 {
        assert_eq!(comp.dissolve_weight(pos(0, f)), None);
        let px = comp.compose(pos(0, f)).unwrap().pixel(32, 18).unwrap();
        assert_eq!(px, [0, 0, 0, 255], "frame {f}");
    }
    let px = comp.compose(pos(1, 0)).unwrap().pixel(32, 18).unwrap();
    assert_eq!(px, [0, 255, 0, 255]);
}

#[test]
fn dissolve_window_is_capped_at_half_the_scene() {
    let cfg = config();
    let scenes = vec![
        scene("a", 0, png([255, 0, 0, 255])),
        scene("b", 1, png([0, 0, 255, 255])),
    ];
    let comp = compositor(&scenes, &cfg);
    let short = |f| ScenePosition {
        scene_index: 0,
        frame_in_scene: f,
        scene_frames: 6,
    };
    assert_eq!(comp.dissolve_weight(short(2)), None);
    assert!(comp.dissolve_weight(short(3)).is_some());
}

#[test]
fn captions_without_font_are_skipped() {
    let cfg = config();
    let mut s = scene("a", 0, png([255, 0, 0, 255]));
    s.caption_text = Some("hello there".to_owned());
    let mut comp = compositor(std::slice::from_ref(&s), &cfg);
    let frame = comp.compose(pos(0, 0)).unwrap();
    assert!(frame.data.chunks_exact(4).all(|px| px == [255, 0, 0, 255]));
}

#[test]
fn caption_panel_darkens_bottom_center() {
    let Some(font) = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok()) else {
        eprintln!("skipping: no system font found");
        return;
    };

    let mut cfg = config();
    cfg.canvas = Canvas {
        width: 320,
        height: 180,
    };
    cfg.caption.font_size_px = 16.0;
    cfg.caption_font = Some(Arc::new(font));

    let mut s = scene("a", 0, png([255, 255, 255, 255]));
    s.caption_text = Some("Caption".to_owned());
    let mut comp = compositor(std::slice::from_ref(&s), &cfg);
    let frame = comp.compose(pos(0, 0)).unwrap();

    // Panel edge (inside padding) is darkened white; top of the frame is untouched.
    let panel_px = frame.pixel(160, 180 - 15 - 3).unwrap();
    assert!(panel_px[0] < 200, "panel not drawn: {panel_px:?}");
    assert_eq!(frame.pixel(160, 5), Some([255, 255, 255, 255]));
}

#[test]
fn render_still_rejects_frames_past_the_end() {
    let cfg = config();
    let scenes = vec![scene("a", 0, png([0, 255, 0, 255]))];
    assert!(render_still(&scenes, &cfg, FrameIndex(30)).is_err());
    let f = render_still(&scenes, &cfg, FrameIndex(29)).unwrap();
    assert_eq!(f.pixel(10, 10), Some([0, 255, 0, 255]));
}
