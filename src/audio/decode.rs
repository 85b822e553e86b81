use std::collections::HashMap;
use std::io::Cursor;

use rayon::prelude::*;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::assets::preload::Preloaded;
use crate::foundation::error::{ReelError, ReelResult};
use crate::scene::model::{SceneDescriptor, SceneId};

/// Decoded PCM, interleaved `f32`, one or two channels.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Per-scene narration decode results. Scenes without narration have no entry.
pub type DecodedNarrations = HashMap<SceneId, Preloaded<AudioPcm>>;

/// Decode in-memory audio bytes to PCM at `target_rate`.
///
/// Mono stays mono (the mixdown duplicates it), more than two channels are folded to stereo, and
/// the result is resampled by linear interpolation when the source rate differs.
pub fn decode_audio(bytes: &[u8], mime_type: &str, target_rate: u32) -> ReelResult<AudioPcm> {
    if target_rate == 0 {
        return Err(ReelError::validation("target sample rate must be non-zero"));
    }
    let native = decode_native(bytes, mime_type)?;
    let folded = fold_to_stereo(native);
    Ok(resample_linear(&folded, target_rate))
}

/// Decode every scene's narration concurrently.
///
/// A scene whose audio fails to decode is logged and recorded as `Missing`; the render continues
/// with silence over that scene.
#[tracing::instrument(skip_all, fields(scenes = scenes.len(), target_rate))]
pub fn decode_narrations(scenes: &[SceneDescriptor], target_rate: u32) -> DecodedNarrations {
    scenes
        .par_iter()
        .filter_map(|scene| {
            let audio = scene.narration_audio.as_ref()?;
            let slot = match decode_audio(&audio.bytes, &audio.mime_type, target_rate) {
                Ok(pcm) => {
                    tracing::debug!(
                        scene = %scene.id,
                        secs = pcm.duration_secs(),
                        channels = pcm.channels,
                        "narration decoded"
                    );
                    Preloaded::Ready(pcm)
                }
                Err(e) => {
                    tracing::warn!(scene = %scene.id, error = %e, "narration decode failed; scene will be silent");
                    Preloaded::Missing {
                        reason: e.to_string(),
                    }
                }
            };
            Some((scene.id.clone(), slot))
        })
        .collect()
}

fn probe_hint(mime_type: &str) -> Hint {
    let mut hint = Hint::new();
    let mime = mime_type.trim().to_ascii_lowercase();
    if !mime.is_empty() && mime != "application/octet-stream" {
        hint.mime_type(&mime);
    }
    let ext = match mime.as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some("wav"),
        "audio/ogg" | "audio/vorbis" => Some("ogg"),
        "audio/mp4" | "audio/aac" | "audio/x-m4a" => Some("m4a"),
        _ => None,
    };
    if let Some(ext) = ext {
        hint.with_extension(ext);
    }
    hint
}

fn decode_native(bytes: &[u8], mime_type: &str) -> ReelResult<AudioPcm> {
    if bytes.is_empty() {
        return Err(ReelError::decode("audio payload is empty"));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(
            &probe_hint(mime_type),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ReelError::decode(format!("probe audio ({mime_type}): {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ReelError::decode("no decodable audio track"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ReelError::decode(format!("unsupported audio codec: {e}")))?;

    let mut samples = Vec::<f32>::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(ReelError::decode(format!("read audio packet: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            // Corrupt packets are skipped; the rest of the stream is still usable.
            Err(SymphoniaError::DecodeError(msg)) => {
                tracing::debug!(error = msg, "skipping undecodable audio packet");
            }
            Err(e) => return Err(ReelError::decode(format!("decode audio packet: {e}"))),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(ReelError::decode("audio stream has no sample rate or channels"));
    }
    if samples.is_empty() {
        return Err(ReelError::decode("audio stream decoded to zero samples"));
    }

    Ok(AudioPcm {
        sample_rate,
        channels,
        interleaved_f32: samples,
    })
}

/// Fold more than two channels down to stereo: even channels feed left, odd channels feed right.
pub(crate) fn fold_to_stereo(pcm: AudioPcm) -> AudioPcm {
    let ch = usize::from(pcm.channels);
    if ch <= 2 {
        return pcm;
    }

    let frames = pcm.frames();
    let left_n = ch.div_ceil(2) as f32;
    let right_n = (ch / 2) as f32;
    let mut out = Vec::with_capacity(frames * 2);
    for frame in pcm.interleaved_f32.chunks_exact(ch) {
        let mut l = 0.0f32;
        let mut r = 0.0f32;
        for (i, &s) in frame.iter().enumerate() {
            if i % 2 == 0 {
                l += s;
            } else {
                r += s;
            }
        }
        out.push(l / left_n);
        out.push(r / right_n);
    }

    AudioPcm {
        sample_rate: pcm.sample_rate,
        channels: 2,
        interleaved_f32: out,
    }
}

/// Linear-interpolation resample to `target_rate`.
pub(crate) fn resample_linear(pcm: &AudioPcm, target_rate: u32) -> AudioPcm {
    if pcm.sample_rate == target_rate || pcm.frames() == 0 {
        return AudioPcm {
            sample_rate: target_rate,
            ..pcm.clone()
        };
    }

    let ch = usize::from(pcm.channels);
    let src_frames = pcm.frames();
    let ratio = f64::from(pcm.sample_rate) / f64::from(target_rate);
    let out_frames =
        ((src_frames as u64 * u64::from(target_rate)).div_ceil(u64::from(pcm.sample_rate))) as usize;

    let src = &pcm.interleaved_f32;
    let mut out = Vec::with_capacity(out_frames * ch);
    for i in 0..out_frames {
        let pos = i as f64 * ratio;
        let f0 = (pos.floor() as usize).min(src_frames - 1);
        let f1 = (f0 + 1).min(src_frames - 1);
        let frac = (pos - f0 as f64) as f32;
        for c in 0..ch {
            let v0 = src[f0 * ch + c];
            let v1 = src[f1 * ch + c];
            out.push(v0 + (v1 - v0) * frac);
        }
    }

    AudioPcm {
        sample_rate: target_rate,
        channels: pcm.channels,
        interleaved_f32: out,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/decode.rs"]
mod tests;
