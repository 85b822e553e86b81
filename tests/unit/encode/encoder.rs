use super::*;

fn cfg(w: u32, h: u32) -> EncoderConfig {
    EncoderConfig {
        width: w,
        height: h,
        fps: Fps::new(30, 1).unwrap(),
        audio: None,
        settings: OutputSettings::default(),
    }
}

fn frame(w: u32, h: u32, px: [u8; 4]) -> FrameRGBA {
    FrameRGBA {
        width: w,
        height: h,
        data: px.repeat((w * h) as usize),
        premultiplied: true,
    }
}

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn in_memory_encoder_concatenates_flattened_frames() {
    let mut enc = InMemoryEncoder::new();
    enc.begin(cfg(2, 2)).unwrap();
    enc.push_frame(FrameIndex(0), &frame(2, 2, [0, 0, 0, 0])).unwrap();
    enc.push_frame(FrameIndex(1), &frame(2, 2, [9, 8, 7, 255])).unwrap();
    assert_eq!(enc.frame_indices(), &[FrameIndex(0), FrameIndex(1)]);

    let out = enc.end().unwrap();
    assert_eq!(out.frame_count, 2);
    assert!(!out.has_audio);
    assert_eq!(out.container, Container::Mp4);
    assert_eq!(out.blob.len(), 2 * 2 * 2 * 4);
    // Transparent frame flattened over the default black background.
    assert_eq!(&out.blob[0..4], &[0, 0, 0, 255]);
    assert_eq!(&out.blob[16..20], &[9, 8, 7, 255]);
}

#[test]
fn gaps_and_reordering_are_rejected() {
    let mut enc = InMemoryEncoder::indices_only();
    enc.begin(cfg(2, 2)).unwrap();
    let f = frame(2, 2, [0, 0, 0, 255]);
    assert!(enc.push_frame(FrameIndex(1), &f).is_err());
    enc.push_frame(FrameIndex(0), &f).unwrap();
    assert!(enc.push_frame(FrameIndex(0), &f).is_err());
    assert!(enc.push_frame(FrameIndex(2), &f).is_err());
    enc.push_frame(FrameIndex(1), &f).unwrap();
    let out = enc.end().unwrap();
    assert_eq!(out.frame_count, 2);
    assert!(out.blob.is_empty());
}

#[test]
fn size_mismatch_and_unstarted_use_fail() {
    let mut enc = InMemoryEncoder::new();
    assert!(enc.push_frame(FrameIndex(0), &frame(2, 2, [0; 4])).is_err());
    assert!(enc.end().is_err());

    enc.begin(cfg(4, 2)).unwrap();
    assert!(enc.push_frame(FrameIndex(0), &frame(2, 2, [0; 4])).is_err());
    enc.abort();
    assert!(enc.was_aborted());
    assert!(enc.end().is_err());
}
