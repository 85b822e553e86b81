use std::ops::Range;

use crate::config::RenderConfig;
use crate::encode::encoder::{InMemoryEncoder, StreamEncoder};
use crate::encode::ffmpeg::FfmpegEncoder;
use crate::foundation::error::{ReelError, ReelResult};
use crate::progress::ProgressEvent;
use crate::render::scheduler::{RenderResult, RenderScheduler};
use crate::scene::model::{SceneDescriptor, reindexed};

/// Contiguous scene index range `[start, end)` of one export part.
pub type SubRange = Range<usize>;

/// Which half gets the extra scene when halving an odd count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalfRounding {
    /// First half is larger: 29 scenes split as 15 + 14.
    #[default]
    Ceil,
    /// Second half is larger: 29 scenes split as 14 + 15.
    Floor,
}

/// How an export divides its scenes into separately rendered parts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitRule {
    /// One part with every scene.
    #[default]
    Whole,
    /// Two parts.
    Halves { first: HalfRounding },
    /// Parts of at most `n` scenes, in order; the last part may be shorter.
    MaxScenesPerPart(usize),
    /// `n` near-equal parts; earlier parts take the remainder.
    Parts(usize),
}

impl SplitRule {
    /// Halves with the default rounding.
    pub fn halves() -> Self {
        Self::Halves {
            first: HalfRounding::default(),
        }
    }
}

/// Split `items` into ordered, contiguous, non-empty sub-ranges whose lengths sum to `items.len()`.
///
/// A zero count in `MaxScenesPerPart` or `Parts` is treated as one. `Parts(n)` with more parts than
/// items yields one item per part. An empty slice yields no sub-ranges.
pub fn split_scenes<T>(items: &[T], rule: &SplitRule) -> Vec<SubRange> {
    let n = items.len();
    if n == 0 {
        return Vec::new();
    }

    let lengths: Vec<usize> = match *rule {
        SplitRule::Whole => vec![n],
        SplitRule::Halves { first } => {
            let a = match first {
                HalfRounding::Ceil => n.div_ceil(2),
                HalfRounding::Floor => n / 2,
            };
            vec![a, n - a]
        }
        SplitRule::MaxScenesPerPart(max) => {
            let max = max.max(1);
            (0..n.div_ceil(max))
                .map(|i| max.min(n - i * max))
                .collect()
        }
        SplitRule::Parts(parts) => {
            let parts = parts.clamp(1, n);
            let (base, rem) = (n / parts, n % parts);
            (0..parts).map(|i| base + usize::from(i < rem)).collect()
        }
    };

    let mut start = 0;
    lengths
        .into_iter()
        .filter(|&len| len > 0)
        .map(|len| {
            let r = start..start + len;
            start += len;
            r
        })
        .collect()
}

/// Identifies which export part a progress event or result belongs to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubRangeLabel {
    /// 0-based part number.
    pub part_index: usize,
    pub part_count: usize,
    /// Scene indices of this part in the original list.
    pub scene_range: SubRange,
}

/// Builds a fresh encoder for each export part.
pub trait EncoderFactory {
    fn create(&self, label: &SubRangeLabel) -> ReelResult<Box<dyn StreamEncoder>>;
}

/// Factory for [`FfmpegEncoder`].
#[derive(Clone, Debug)]
pub struct FfmpegEncoderFactory {
    program: String,
}

impl Default for FfmpegEncoderFactory {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_owned(),
        }
    }
}

impl FfmpegEncoderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn create(&self, _label: &SubRangeLabel) -> ReelResult<Box<dyn StreamEncoder>> {
        Ok(Box::new(FfmpegEncoder::with_program(self.program.clone())))
    }
}

/// Factory for [`InMemoryEncoder`]; used for dry runs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct InMemoryEncoderFactory {
    pub keep_pixels: bool,
}

impl EncoderFactory for InMemoryEncoderFactory {
    fn create(&self, _label: &SubRangeLabel) -> ReelResult<Box<dyn StreamEncoder>> {
        Ok(Box::new(if self.keep_pixels {
            InMemoryEncoder::new()
        } else {
            InMemoryEncoder::indices_only()
        }))
    }
}

/// Result of one export part.
#[derive(Clone, Debug)]
pub struct ExportPart {
    pub label: SubRangeLabel,
    pub result: RenderResult,
}

/// Aggregated export results.
///
/// When a part fails, `parts` holds every part attempted so far (the failed one last) and `error`
/// repeats its message.
#[derive(Clone, Debug, Default)]
pub struct ExportOutcome {
    pub parts: Vec<ExportPart>,
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Entry point for callers: splits scenes and renders each part in sequence.
pub struct ExportController {
    config: RenderConfig,
}

impl ExportController {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render every part of `scenes` under `rule`, one after another.
    ///
    /// Each part runs a full scheduler lifecycle with its own encoder and with `sequence_index`
    /// renumbered from zero. Progress events are relayed with their part label. The export stops at
    /// the first failed part.
    #[tracing::instrument(skip_all, fields(scenes = scenes.len(), rule = ?rule))]
    pub fn export(
        &self,
        scenes: &[SceneDescriptor],
        rule: &SplitRule,
        factory: &dyn EncoderFactory,
        on_progress: &mut dyn FnMut(&SubRangeLabel, ProgressEvent),
    ) -> ExportOutcome {
        let ranges = split_scenes(scenes, rule);
        let mut outcome = ExportOutcome::default();
        if ranges.is_empty() {
            outcome.error =
                Some(ReelError::validation("export requires at least one scene").to_string());
            return outcome;
        }

        let part_count = ranges.len();
        for (part_index, scene_range) in ranges.into_iter().enumerate() {
            let label = SubRangeLabel {
                part_index,
                part_count,
                scene_range: scene_range.clone(),
            };
            let part_scenes = reindexed(&scenes[scene_range]);
            tracing::info!(
                part = part_index + 1,
                of = part_count,
                scenes = part_scenes.len(),
                "exporting part"
            );

            let result = match factory.create(&label) {
                Ok(mut encoder) => {
                    let mut scheduler = RenderScheduler::new(self.config.clone());
                    scheduler.render(&part_scenes, encoder.as_mut(), &mut |ev| {
                        on_progress(&label, ev)
                    })
                }
                Err(e) => {
                    let message = e.to_string();
                    on_progress(&label, ProgressEvent::error(0, message.clone()));
                    RenderResult {
                        success: false,
                        blob: None,
                        duration_secs: part_scenes.iter().map(|s| s.duration_secs).sum(),
                        scene_count: part_scenes.len(),
                        frame_count: 0,
                        has_audio: false,
                        error: Some(message),
                    }
                }
            };

            let failed = result.error.clone();
            outcome.parts.push(ExportPart { label, result });
            if let Some(message) = failed {
                tracing::warn!(part = part_index + 1, error = %message, "export stopped");
                outcome.error = Some(message);
                break;
            }
        }
        outcome
    }
}

#[cfg(test)]
#[path = "../tests/unit/export.rs"]
mod tests;
