use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Default mixdown sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// How the render scheduler's clock advances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// Frames are paced against the audio clock (or a wall clock when there is no audio), so a
    /// render takes as long as the output plays.
    #[default]
    Realtime,
    /// A virtual clock jumps straight to each frame's due time.
    Offline,
}

/// Output container handed to `ffmpeg`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// Fragmented MP4 (required when muxing to a pipe).
    #[default]
    Mp4,
    /// Matroska.
    Matroska,
    /// WebM (VP9/Opus codecs expected).
    Webm,
}

impl Container {
    /// `ffmpeg -f` muxer name.
    pub fn muxer(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Matroska => "matroska",
            Self::Webm => "webm",
        }
    }

    /// Conventional file extension (without dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Matroska => "mkv",
            Self::Webm => "webm",
        }
    }
}

/// Encoded output format, kept in one place rather than inline at the encoder call site.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Container muxer.
    pub container: Container,
    /// `ffmpeg` video encoder name.
    pub video_codec: String,
    /// `ffmpeg` audio encoder name, used only when a mixed track exists.
    pub audio_codec: String,
    /// Target video bitrate in kbit/s.
    pub video_bitrate_kbps: u32,
    /// Target audio bitrate in kbit/s.
    pub audio_bitrate_kbps: u32,
    /// Background color used to flatten alpha before encoding (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            container: Container::Mp4,
            video_codec: "libx264".to_owned(),
            audio_codec: "aac".to_owned(),
            video_bitrate_kbps: 5_000,
            audio_bitrate_kbps: 128,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Subtitle panel styling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Maximum wrapped line width as a fraction of the canvas width.
    pub max_width_frac: f32,
    /// Distance between the panel bottom and the canvas bottom, as a fraction of canvas height.
    pub bottom_margin_frac: f32,
    /// Padding between text block and panel edge.
    pub padding_px: f32,
    /// Panel corner radius.
    pub corner_radius_px: f64,
    /// Panel fill (RGBA8, straight alpha).
    pub panel_rgba: [u8; 4],
    /// Text fill (RGBA8, straight alpha).
    pub text_rgba: [u8; 4],
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size_px: 36.0,
            max_width_frac: 0.8,
            bottom_margin_frac: 0.08,
            padding_px: 18.0,
            corner_radius_px: 12.0,
            panel_rgba: [0, 0, 0, 166],
            text_rgba: [255, 255, 255, 255],
        }
    }
}

/// Per-invocation render configuration.
///
/// Two renders may run back to back with different values; nothing here is cached globally.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output frame size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Mixdown sample rate in Hz.
    pub sample_rate: u32,
    /// Cross-dissolve length at each scene boundary, in frames. `0` disables dissolves.
    pub transition_frames: u32,
    /// Fill for frames (or parts of frames) with no image, RGBA8 straight alpha.
    pub background_rgba: [u8; 4],
    /// Clock pacing.
    pub pacing: Pacing,
    /// Caption panel styling.
    pub caption: CaptionStyle,
    /// Encoded output format.
    pub output: OutputSettings,
    /// Font bytes used for captions. Without a font, captions are skipped.
    #[serde(skip)]
    pub caption_font: Option<Arc<Vec<u8>>>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fps: Fps::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            transition_frames: 15,
            background_rgba: [0, 0, 0, 255],
            pacing: Pacing::default(),
            caption: CaptionStyle::default(),
            output: OutputSettings::default(),
            caption_font: None,
        }
    }
}

impl RenderConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ReelError::serde(format!("invalid config '{}': {e}", path.display()))
        })
    }

    /// Attach caption font bytes read from `path`.
    pub fn with_caption_font_file(mut self, path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read caption font '{}'", path.display()))?;
        self.caption_font = Some(Arc::new(bytes));
        Ok(self)
    }

    /// Return a copy with the given pacing.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn validate(&self) -> ReelResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ReelError::validation("canvas width/height must be non-zero"));
        }
        if self.canvas.width > u32::from(u16::MAX) || self.canvas.height > u32::from(u16::MAX) {
            return Err(ReelError::validation(format!(
                "canvas {}x{} exceeds the {} px raster limit",
                self.canvas.width,
                self.canvas.height,
                u16::MAX
            )));
        }
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            // yuv420p output needs even dimensions.
            return Err(ReelError::validation(
                "canvas width/height must be even (required for yuv420p output)",
            ));
        }
        if self.sample_rate == 0 {
            return Err(ReelError::validation("sample_rate must be non-zero"));
        }

        let c = &self.caption;
        if !c.font_size_px.is_finite() || c.font_size_px <= 0.0 {
            return Err(ReelError::validation(
                "caption font_size_px must be finite and > 0",
            ));
        }
        if !(c.max_width_frac > 0.0 && c.max_width_frac <= 1.0) {
            return Err(ReelError::validation(
                "caption max_width_frac must be in (0, 1]",
            ));
        }
        if !(0.0..1.0).contains(&c.bottom_margin_frac) {
            return Err(ReelError::validation(
                "caption bottom_margin_frac must be in [0, 1)",
            ));
        }
        if !c.padding_px.is_finite() || c.padding_px < 0.0 {
            return Err(ReelError::validation("caption padding_px must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
