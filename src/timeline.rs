use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::scene::model::SceneDescriptor;

/// Where a timeline frame falls inside the scene list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScenePosition {
    pub scene_index: usize,
    /// 0-based frame offset inside the scene.
    pub frame_in_scene: u64,
    /// Total frames the scene occupies.
    pub scene_frames: u64,
}

impl ScenePosition {
    /// Normalized progress through the scene, `frame_in_scene / scene_frames`.
    pub fn progress(self) -> f64 {
        if self.scene_frames == 0 {
            0.0
        } else {
            self.frame_in_scene as f64 / self.scene_frames as f64
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneSpan {
    start_frame: u64,
    frames: u64,
    start_secs: f64,
    duration_secs: f64,
}

/// Frame layout of one render invocation: per-scene frame counts and cumulative offsets.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    fps: Fps,
    spans: Vec<SceneSpan>,
    total_frames: u64,
    total_secs: f64,
}

impl Timeline {
    /// Lay out `scenes` back to back at `fps`.
    ///
    /// Scene boundaries sit at `round(cumulative_secs * fps)`, so the frame grid never drifts more
    /// than half a frame from the declared durations (and from narration offsets, which use the
    /// same cumulative seconds). A scene always keeps at least one frame; when that pushes a
    /// boundary forward, the next boundary snaps back onto the grid.
    pub fn new(scenes: &[SceneDescriptor], fps: Fps) -> ReelResult<Self> {
        Self::from_durations(scenes.iter().map(|s| s.duration_secs), fps)
    }

    pub fn from_durations(durations: impl IntoIterator<Item = f64>, fps: Fps) -> ReelResult<Self> {
        let fps = Fps::new(fps.num, fps.den)?;
        let mut spans = Vec::new();
        let mut frame_cursor = 0u64;
        let mut secs_cursor = 0.0f64;

        for (i, duration_secs) in durations.into_iter().enumerate() {
            if !duration_secs.is_finite() || duration_secs <= 0.0 {
                return Err(ReelError::validation(format!(
                    "scene {i} duration_secs must be finite and > 0 (got {duration_secs})"
                )));
            }
            let end_secs = secs_cursor + duration_secs;
            let end_frame = fps
                .secs_to_frames_round(end_secs)
                .max(frame_cursor.saturating_add(1));
            spans.push(SceneSpan {
                start_frame: frame_cursor,
                frames: end_frame - frame_cursor,
                start_secs: secs_cursor,
                duration_secs,
            });
            frame_cursor = end_frame;
            secs_cursor = end_secs;
        }

        if spans.is_empty() {
            return Err(ReelError::validation("timeline requires at least one scene"));
        }

        Ok(Self {
            fps,
            spans,
            total_frames: frame_cursor,
            total_secs: secs_cursor,
        })
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn scene_count(&self) -> usize {
        self.spans.len()
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Sum of the declared scene durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.total_secs
    }

    pub fn frame_range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames),
        }
    }

    /// Frames occupied by scene `i`.
    pub fn scene_frames(&self, i: usize) -> Option<u64> {
        self.spans.get(i).map(|s| s.frames)
    }

    /// Frame range of scene `i` in timeline space.
    pub fn scene_range(&self, i: usize) -> Option<FrameRange> {
        self.spans.get(i).map(|s| FrameRange {
            start: FrameIndex(s.start_frame),
            end: FrameIndex(s.start_frame + s.frames),
        })
    }

    /// Sum of the declared durations of scenes before `i`.
    pub fn scene_start_secs(&self, i: usize) -> Option<f64> {
        self.spans.get(i).map(|s| s.start_secs)
    }

    pub fn scene_duration_secs(&self, i: usize) -> Option<f64> {
        self.spans.get(i).map(|s| s.duration_secs)
    }

    /// Sample offset where scene `i`'s narration begins: `round(start_secs * rate)`.
    pub fn scene_start_sample(&self, i: usize, sample_rate: u32) -> Option<u64> {
        self.scene_start_secs(i)
            .map(|secs| (secs * f64::from(sample_rate)).round().max(0.0) as u64)
    }

    /// Map a timeline frame to its scene. `None` at or past the end.
    pub fn locate(&self, frame: FrameIndex) -> Option<ScenePosition> {
        self.spans
            .iter()
            .enumerate()
            .find(|(_, s)| frame.0 >= s.start_frame && frame.0 < s.start_frame + s.frames)
            .map(|(scene_index, s)| ScenePosition {
                scene_index,
                frame_in_scene: frame.0 - s.start_frame,
                scene_frames: s.frames,
            })
    }
}

#[cfg(test)]
#[path = "../tests/unit/timeline.rs"]
mod tests;
