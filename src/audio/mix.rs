use std::path::Path;

use anyhow::Context as _;

use crate::audio::decode::{AudioPcm, DecodedNarrations};
use crate::foundation::error::{ReelError, ReelResult};
use crate::scene::model::SceneDescriptor;
use crate::timeline::Timeline;

/// Channel count of every mixed track.
pub const MIX_CHANNELS: u16 = 2;

/// One interleaved stereo buffer spanning the whole render.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedAudioTrack {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
    /// Narrations summed into the buffer.
    pub narrated_segments: usize,
}

impl MixedAudioTrack {
    /// No narration was mixed in; the render is encoded video-only.
    pub fn is_silent(&self) -> bool {
        self.narrated_segments == 0
    }

    /// Length in sample frames.
    pub fn frames(&self) -> u64 {
        (self.interleaved_f32.len() / usize::from(self.channels.max(1))) as u64
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Sample `(frame, channel)`, or `None` when out of range.
    pub fn sample(&self, frame: u64, channel: u16) -> Option<f32> {
        if channel >= self.channels {
            return None;
        }
        let idx = usize::try_from(frame).ok()? * usize::from(self.channels) + usize::from(channel);
        self.interleaved_f32.get(idx).copied()
    }
}

/// Mixed track length for a render of `total_secs`: `ceil(total_secs * sample_rate)` frames.
pub fn track_len_frames(total_secs: f64, sample_rate: u32) -> u64 {
    (total_secs * f64::from(sample_rate)).ceil().max(0.0) as u64
}

/// Sum every decoded narration into one track at its scene's start offset.
///
/// The buffer always spans `track_len_frames(total, rate)` frames, silent where no narration
/// plays. Narrations run past their own scene into the next one but are cut at the end of the
/// render.
#[tracing::instrument(skip_all, fields(scenes = scenes.len(), sample_rate))]
pub fn mixdown(
    timeline: &Timeline,
    scenes: &[SceneDescriptor],
    narrations: &DecodedNarrations,
    sample_rate: u32,
) -> MixedAudioTrack {
    let frames = track_len_frames(timeline.total_duration_secs(), sample_rate);
    let channels = usize::from(MIX_CHANNELS);
    let mut out = vec![0.0f32; frames as usize * channels];
    let mut narrated_segments = 0usize;

    for (i, scene) in scenes.iter().enumerate() {
        let Some(pcm) = narrations.get(&scene.id).and_then(|slot| slot.ready()) else {
            continue;
        };
        let Some(start) = timeline.scene_start_sample(i, sample_rate) else {
            continue;
        };
        if pcm.sample_rate != sample_rate {
            tracing::warn!(
                scene = %scene.id,
                expected = sample_rate,
                got = pcm.sample_rate,
                "narration at unexpected sample rate; skipping"
            );
            continue;
        }
        mix_into(&mut out, start as usize, pcm);
        narrated_segments += 1;
    }

    if narrated_segments == 0 {
        tracing::debug!(frames, "no narration decoded; output will be video-only");
    } else {
        for s in &mut out {
            *s = s.clamp(-1.0, 1.0);
        }
        tracing::debug!(segments = narrated_segments, frames, "mixdown complete");
    }

    MixedAudioTrack {
        sample_rate,
        channels: MIX_CHANNELS,
        interleaved_f32: out,
        narrated_segments,
    }
}

fn mix_into(out: &mut [f32], start_frame: usize, pcm: &AudioPcm) {
    let dst_frames = out.len() / usize::from(MIX_CHANNELS);
    let src_ch = usize::from(pcm.channels);
    if src_ch == 0 || start_frame >= dst_frames {
        return;
    }

    for (i, frame) in pcm.interleaved_f32.chunks_exact(src_ch).enumerate() {
        let dst = start_frame + i;
        if dst >= dst_frames {
            break;
        }
        let (l, r) = match frame {
            [m] => (*m, *m),
            [l, r, ..] => (*l, *r),
            [] => continue,
        };
        out[dst * 2] += l;
        out[dst * 2 + 1] += r;
    }
}

/// Write interleaved `f32` PCM to a raw little-endian `.f32le` file.
pub fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create audio mix directory '{}'",
                parent.display()
            )
        })?;
    }

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::encode(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
