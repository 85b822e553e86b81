use std::io::Cursor;

use super::*;
use crate::scene::model::{Animation, MediaPayload};

fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([200, 10, 10, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn scene(id: &str, idx: u32, bytes: Vec<u8>) -> SceneDescriptor {
    SceneDescriptor {
        id: SceneId::new(id),
        sequence_index: idx,
        duration_secs: 1.0,
        image: MediaPayload::new(bytes, "image/png"),
        narration_audio: None,
        caption_text: None,
        animation: Animation::default(),
    }
}

#[test]
fn corrupt_image_resolves_to_missing_without_failing_batch() {
    let scenes = vec![
        scene("a", 0, png(4, 4)),
        scene("b", 1, b"garbage".to_vec()),
        scene("c", 2, png(8, 2)),
    ];
    let images = preload_images(&scenes, Canvas::default());

    assert_eq!(images.len(), 3);
    assert_eq!(images.missing_count(), 1);
    assert!(images.get(&SceneId::new("a")).is_some());
    assert!(images.get(&SceneId::new("b")).is_none());
    assert!(images.slot(&SceneId::new("b")).unwrap().is_missing());
    let c = images.get(&SceneId::new("c")).unwrap();
    assert_eq!((c.width, c.height), (8, 2));
}

#[test]
fn max_side_tracks_canvas() {
    assert_eq!(
        max_image_side(Canvas {
            width: 1280,
            height: 720
        }),
        2560
    );
    assert_eq!(
        max_image_side(Canvas {
            width: 60_000,
            height: 2
        }),
        u32::from(u16::MAX)
    );
}
