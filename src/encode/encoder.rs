use std::path::PathBuf;

use crate::config::{Container, OutputSettings};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;

/// Configuration provided to a [`StreamEncoder`] before the first frame.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Mixed narration track, absent for video-only output.
    pub audio: Option<AudioInputConfig>,
    pub settings: OutputSettings,
}

/// Raw PCM audio input for encoders that mux audio.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Finalized encoder output.
#[derive(Debug, Clone)]
pub struct EncodedOutput {
    pub blob: Vec<u8>,
    pub frame_count: u64,
    pub has_audio: bool,
    pub container: Container,
}

/// Encoder contract.
///
/// Ordering contract: `push_frame` is called with indices `0, 1, 2, ...` in order, without gaps;
/// encoders reject anything else. After `end` or `abort` the encoder holds no child process and
/// no open files.
pub trait StreamEncoder: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: EncoderConfig) -> ReelResult<()>;
    /// Push the next frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Finalize and return the encoded blob.
    fn end(&mut self) -> ReelResult<EncodedOutput>;
    /// Tear down after a failure; never fails.
    fn abort(&mut self);
}

/// Gap-free ordering guard shared by encoders.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FrameOrder {
    last: Option<FrameIndex>,
}

impl FrameOrder {
    pub(crate) fn accept(&mut self, idx: FrameIndex) -> ReelResult<()> {
        let expected = self.last.map(FrameIndex::next).unwrap_or(FrameIndex(0));
        if idx != expected {
            return Err(ReelError::encode(format!(
                "out-of-order frame index {} (expected {})",
                idx.0, expected.0
            )));
        }
        self.last = Some(idx);
        Ok(())
    }

    pub(crate) fn count(&self) -> u64 {
        self.last.map(|f| f.0 + 1).unwrap_or(0)
    }
}

/// Check `frame` against the configured size.
pub(crate) fn check_frame_size(cfg: &EncoderConfig, frame: &FrameRGBA) -> ReelResult<()> {
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(ReelError::encode(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    if frame.data.len() != (cfg.width as usize) * (cfg.height as usize) * 4 {
        return Err(ReelError::encode(
            "frame.data size mismatch with width*height*4",
        ));
    }
    Ok(())
}

/// Flatten premultiplied RGBA8 over `bg_rgba` into opaque RGBA8.
pub(crate) fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::encode(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let [bg_r, bg_g, bg_b, _] = bg_rgba.map(u16::from);
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }
    Ok(())
}

/// Encoder that keeps flattened frames in memory, for tests and dry runs.
///
/// The "blob" is the concatenation of opaque RGBA8 frames.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    cfg: Option<EncoderConfig>,
    order: FrameOrder,
    indices: Vec<FrameIndex>,
    chunks: Vec<Vec<u8>>,
    keep_pixels: bool,
    aborted: bool,
}

impl InMemoryEncoder {
    /// Encoder that keeps every frame's pixels.
    pub fn new() -> Self {
        Self {
            keep_pixels: true,
            ..Self::default()
        }
    }

    /// Encoder that records indices only; the blob stays empty.
    pub fn indices_only() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&EncoderConfig> {
        self.cfg.as_ref()
    }

    /// Indices received so far, in arrival order.
    pub fn frame_indices(&self) -> &[FrameIndex] {
        &self.indices
    }

    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

impl StreamEncoder for InMemoryEncoder {
    fn begin(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::encode("encoder width/height must be non-zero"));
        }
        self.cfg = Some(cfg);
        self.order = FrameOrder::default();
        self.indices.clear();
        self.chunks.clear();
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encode("encoder not started"))?;
        check_frame_size(cfg, frame)?;
        self.order.accept(idx)?;
        self.indices.push(idx);

        if self.keep_pixels {
            let mut flat = vec![0u8; frame.data.len()];
            flatten_premul_over_bg_to_opaque_rgba8(&mut flat, &frame.data, cfg.settings.bg_rgba)?;
            self.chunks.push(flat);
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<EncodedOutput> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ReelError::encode("encoder not started"))?;
        Ok(EncodedOutput {
            blob: std::mem::take(&mut self.chunks).concat(),
            frame_count: self.order.count(),
            has_audio: cfg.audio.is_some(),
            container: cfg.settings.container,
        })
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.chunks.clear();
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
