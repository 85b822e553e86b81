use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::assets::preload::preload_images;
use crate::audio::decode::decode_narrations;
use crate::audio::mix::{MixedAudioTrack, mixdown, write_mix_to_f32le_file};
use crate::config::RenderConfig;
use crate::encode::encoder::{AudioInputConfig, EncoderConfig, StreamEncoder};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::progress::{ProgressEvent, ProgressReporter, milestones, rendering_percent};
use crate::render::clock::{RenderClock, clock_for};
use crate::render::compositor::FrameCompositor;
use crate::scene::model::{SceneDescriptor, validate_scenes};
use crate::timeline::Timeline;

/// Tolerance when comparing clock time against a frame's due time.
const DUE_EPSILON_SECS: f64 = 1e-9;

/// Lifecycle of one render invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Preparing,
    Rendering,
    Complete,
    Error,
}

/// Loop-owned clock bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderClockState {
    pub elapsed_secs: f64,
    /// Never decreases.
    pub last_emitted_frame: Option<FrameIndex>,
}

impl RenderClockState {
    /// The frame after the last emitted one, or `None` once `total_frames` are out.
    pub fn next_frame(&self, total_frames: u64) -> Option<FrameIndex> {
        let next = self
            .last_emitted_frame
            .map(FrameIndex::next)
            .unwrap_or(FrameIndex(0));
        (next.0 < total_frames).then_some(next)
    }

    /// Whether `frame` is due at the current `elapsed_secs`.
    pub fn is_due(&self, frame: FrameIndex, fps: Fps) -> bool {
        self.elapsed_secs + DUE_EPSILON_SECS >= fps.frames_to_secs(frame.0)
    }
}

/// Outcome of one render invocation. Produced exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderResult {
    pub success: bool,
    /// Encoded container bytes; `None` on failure.
    pub blob: Option<Vec<u8>>,
    /// Sum of the declared scene durations.
    pub duration_secs: f64,
    pub scene_count: usize,
    /// Frames handed to the encoder.
    pub frame_count: u64,
    pub has_audio: bool,
    pub error: Option<String>,
}

/// Drives one render: prepare assets, pace frames against a clock, composite, encode.
///
/// The scheduler is reusable; every call to [`RenderScheduler::render`] starts from `Idle` and
/// keeps nothing from the previous call.
pub struct RenderScheduler {
    config: RenderConfig,
    state: RenderState,
    clock: Option<Box<dyn RenderClock>>,
}

impl RenderScheduler {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            state: RenderState::Idle,
            clock: None,
        }
    }

    /// Use `clock` for the next render instead of the one chosen from the pacing mode.
    pub fn with_clock(mut self, clock: Box<dyn RenderClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// State reached by the most recent render.
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Render `scenes` into `encoder`, reporting progress to `on_progress`.
    ///
    /// Per-scene asset failures degrade the output (blank frames, silence) but never fail the
    /// render. Surface or encoder failures abort the encoder and are reported verbatim in both the
    /// final `error` progress event and [`RenderResult::error`].
    #[tracing::instrument(skip_all, fields(scenes = scenes.len()))]
    pub fn render(
        &mut self,
        scenes: &[SceneDescriptor],
        encoder: &mut dyn StreamEncoder,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> RenderResult {
        self.state = RenderState::Idle;
        let mut progress = ProgressReporter::new(on_progress);
        let mut result = RenderResult {
            success: false,
            blob: None,
            duration_secs: scenes
                .iter()
                .map(|s| s.duration_secs)
                .filter(|d| d.is_finite())
                .sum(),
            scene_count: scenes.len(),
            frame_count: 0,
            has_audio: false,
            error: None,
        };

        let started = Instant::now();
        match self.run(scenes, encoder, &mut progress, &mut result) {
            Ok(blob) => {
                self.state = RenderState::Complete;
                tracing::info!(
                    frames = result.frame_count,
                    bytes = blob.len(),
                    has_audio = result.has_audio,
                    wall_secs = started.elapsed().as_secs_f64(),
                    "render complete"
                );
                progress.emit(ProgressEvent::complete(result.frame_count));
                result.success = true;
                result.blob = Some(blob);
            }
            Err(e) => {
                encoder.abort();
                self.state = RenderState::Error;
                let message = e.to_string();
                tracing::error!(error = %message, frames = result.frame_count, "render failed");
                progress.emit(ProgressEvent::error(progress.last_percent(), message.clone()));
                result.error = Some(message);
            }
        }
        result
    }

    fn run(
        &mut self,
        scenes: &[SceneDescriptor],
        encoder: &mut dyn StreamEncoder,
        progress: &mut ProgressReporter<'_>,
        result: &mut RenderResult,
    ) -> ReelResult<Vec<u8>> {
        self.state = RenderState::Preparing;
        progress.emit(ProgressEvent::preparing(milestones::STARTED));

        self.config.validate()?;
        validate_scenes(scenes)?;
        let timeline = Timeline::new(scenes, self.config.fps)?;
        progress.emit(ProgressEvent::preparing(milestones::VALIDATED));

        let images = preload_images(scenes, self.config.canvas);
        progress.emit(ProgressEvent::preparing(milestones::IMAGES_READY));

        let narrations = decode_narrations(scenes, self.config.sample_rate);
        let mix = mixdown(&timeline, scenes, &narrations, self.config.sample_rate);
        drop(narrations);
        result.has_audio = !mix.is_silent();
        progress.emit(ProgressEvent::preparing(milestones::AUDIO_READY));

        let mut compositor = FrameCompositor::new(&self.config, scenes, &images)?;
        drop(images);

        let audio_tmp = if mix.is_silent() {
            None
        } else {
            Some(write_temp_mix(&mix)?)
        };
        encoder.begin(EncoderConfig {
            width: self.config.canvas.width,
            height: self.config.canvas.height,
            fps: timeline.fps(),
            audio: audio_tmp.as_ref().map(|tmp| AudioInputConfig {
                path: tmp.path.clone(),
                sample_rate: tmp.sample_rate,
                channels: tmp.channels,
            }),
            settings: self.config.output.clone(),
        })?;
        drop(mix);

        let mut clock = self.clock.take().unwrap_or_else(|| {
            clock_for(
                self.config.pacing,
                result.has_audio.then_some(self.config.sample_rate),
            )
        });
        self.state = RenderState::Rendering;
        let total = timeline.total_frames();
        let fps = timeline.fps();
        tracing::info!(
            frames = total,
            secs = timeline.total_duration_secs(),
            has_audio = result.has_audio,
            clock = clock.name(),
            "rendering"
        );

        let mut cs = RenderClockState::default();
        clock.start();
        while let Some(next) = cs.next_frame(total) {
            cs.elapsed_secs = clock.elapsed_secs();
            if !cs.is_due(next, fps) {
                clock.sleep_until(fps.frames_to_secs(next.0));
                continue;
            }

            let pos = timeline.locate(next).ok_or_else(|| {
                ReelError::render(format!("frame {} has no scene", next.0))
            })?;
            let frame = compositor.compose(pos)?;
            encoder.push_frame(next, frame)?;
            cs.last_emitted_frame = Some(next);
            result.frame_count += 1;

            let done = next.0 + 1;
            progress.emit(ProgressEvent::rendering(
                rendering_percent(done, total),
                done,
                total,
            ));
        }

        // Let the output play out to its full length before finalizing.
        let end_secs = timeline
            .total_duration_secs()
            .max(fps.frames_to_secs(total));
        clock.sleep_until(end_secs);

        let output = encoder.end()?;
        drop(audio_tmp);
        Ok(output.blob)
    }
}

/// Temporary raw mix file handed to the encoder; deleted on drop.
struct TempMixFile {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
}

impl Drop for TempMixFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn write_temp_mix(track: &MixedAudioTrack) -> ReelResult<TempMixFile> {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let path = std::env::temp_dir().join(format!(
        "storyreel_mix_{}_{}_{}.f32le",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));
    let tmp = TempMixFile {
        path,
        sample_rate: track.sample_rate,
        channels: track.channels,
    };
    write_mix_to_f32le_file(&track.interleaved_f32, &tmp.path)?;
    Ok(tmp)
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
