use std::io::Cursor;

use super::*;
use crate::scene::model::{Animation, MediaPayload};

fn wav(sample_rate: u32, channels: u16, frames: usize, value: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut w = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for _ in 0..frames * usize::from(channels) {
            w.write_sample(value).unwrap();
        }
        w.finalize().unwrap();
    }
    buf
}

#[test]
fn decodes_wav_at_native_rate() {
    let bytes = wav(48_000, 2, 4_800, 16_384);
    let pcm = decode_audio(&bytes, "audio/wav", 48_000).unwrap();
    assert_eq!(pcm.sample_rate, 48_000);
    assert_eq!(pcm.channels, 2);
    assert_eq!(pcm.frames(), 4_800);
    assert!((pcm.duration_secs() - 0.1).abs() < 1e-9);
    assert!((pcm.interleaved_f32[0] - 0.5).abs() < 1e-3);
}

#[test]
fn mono_stays_mono_and_is_resampled() {
    let bytes = wav(24_000, 1, 24_000, 8_192);
    let pcm = decode_audio(&bytes, "audio/x-wav", 48_000).unwrap();
    assert_eq!(pcm.channels, 1);
    assert_eq!(pcm.sample_rate, 48_000);
    assert_eq!(pcm.frames(), 48_000);
    assert!((pcm.interleaved_f32[1_000] - 0.25).abs() < 1e-3);
}

#[test]
fn unknown_mime_falls_back_to_probing() {
    let bytes = wav(16_000, 1, 160, 0);
    let pcm = decode_audio(&bytes, "application/octet-stream", 16_000).unwrap();
    assert_eq!(pcm.frames(), 160);
}

#[test]
fn garbage_and_empty_bytes_fail() {
    assert!(decode_audio(b"", "audio/wav", 48_000).is_err());
    assert!(decode_audio(b"definitely not audio", "audio/mpeg", 48_000).is_err());
    assert!(decode_audio(&wav(8_000, 1, 8, 0), "audio/wav", 0).is_err());
}

#[test]
fn multichannel_folds_to_stereo() {
    let pcm = AudioPcm {
        sample_rate: 8_000,
        channels: 4,
        interleaved_f32: vec![0.2, 0.4, 0.6, 0.8],
    };
    let folded = fold_to_stereo(pcm);
    assert_eq!(folded.channels, 2);
    assert!((folded.interleaved_f32[0] - 0.4).abs() < 1e-6);
    assert!((folded.interleaved_f32[1] - 0.6).abs() < 1e-6);
}

#[test]
fn linear_resample_interpolates_between_frames() {
    let pcm = AudioPcm {
        sample_rate: 1,
        channels: 1,
        interleaved_f32: vec![0.0, 1.0],
    };
    let up = resample_linear(&pcm, 2);
    assert_eq!(up.interleaved_f32, vec![0.0, 0.5, 1.0, 1.0]);
}

#[test]
fn narration_failures_are_isolated_per_scene() {
    let mk = |id: &str, idx: u32, audio: Option<MediaPayload>| SceneDescriptor {
        id: SceneId::new(id),
        sequence_index: idx,
        duration_secs: 1.0,
        image: MediaPayload::new(Vec::new(), "image/png"),
        narration_audio: audio,
        caption_text: None,
        animation: Animation::default(),
    };
    let scenes = vec![
        mk(
            "a",
            0,
            Some(MediaPayload::new(wav(48_000, 1, 480, 100), "audio/wav")),
        ),
        mk("b", 1, Some(MediaPayload::new(b"nope".to_vec(), "audio/wav"))),
        mk("c", 2, None),
    ];

    let decoded = decode_narrations(&scenes, 48_000);
    assert_eq!(decoded.len(), 2);
    assert!(decoded[&SceneId::new("a")].ready().is_some());
    assert!(decoded[&SceneId::new("b")].is_missing());
    assert!(!decoded.contains_key(&SceneId::new("c")));
}
