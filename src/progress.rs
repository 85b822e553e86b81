//! Progress events emitted by one render invocation.

/// Coarse lifecycle status reported to progress listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Preparing,
    Rendering,
    Complete,
    Error,
}

/// One progress update. Serializes to JSON for UI bridges.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProgressEvent {
    pub status: RenderStatus,
    /// `0..=100`, never decreasing within one render.
    pub progress_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_frame: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn preparing(percent: u8) -> Self {
        Self {
            status: RenderStatus::Preparing,
            progress_percent: percent,
            current_frame: None,
            total_frames: None,
            error: None,
        }
    }

    pub fn rendering(percent: u8, current_frame: u64, total_frames: u64) -> Self {
        Self {
            status: RenderStatus::Rendering,
            progress_percent: percent,
            current_frame: Some(current_frame),
            total_frames: Some(total_frames),
            error: None,
        }
    }

    pub fn complete(total_frames: u64) -> Self {
        Self {
            status: RenderStatus::Complete,
            progress_percent: 100,
            current_frame: Some(total_frames),
            total_frames: Some(total_frames),
            error: None,
        }
    }

    pub fn error(percent: u8, message: impl Into<String>) -> Self {
        Self {
            status: RenderStatus::Error,
            progress_percent: percent,
            current_frame: None,
            total_frames: None,
            error: Some(message.into()),
        }
    }
}

/// Percent milestones of the preparing phase.
pub mod milestones {
    pub const STARTED: u8 = 0;
    pub const VALIDATED: u8 = 5;
    pub const IMAGES_READY: u8 = 10;
    pub const AUDIO_READY: u8 = 15;
    /// Last percent reported while frames are still being drawn.
    pub const RENDERING_END: u8 = 99;
}

/// Map `frames_done` of `total` onto the rendering band `[AUDIO_READY, RENDERING_END]`.
pub fn rendering_percent(frames_done: u64, total: u64) -> u8 {
    let lo = u64::from(milestones::AUDIO_READY);
    let hi = u64::from(milestones::RENDERING_END);
    if total == 0 {
        return milestones::RENDERING_END;
    }
    let done = frames_done.min(total);
    (lo + (hi - lo) * done / total) as u8
}

/// Wraps a progress callback and keeps the reported percent monotonic.
///
/// `rendering` events are forwarded only when the percent advances.
pub(crate) struct ProgressReporter<'a> {
    sink: &'a mut dyn FnMut(ProgressEvent),
    last_percent: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(ProgressEvent)) -> Self {
        Self {
            sink,
            last_percent: None,
        }
    }

    pub(crate) fn last_percent(&self) -> u8 {
        self.last_percent.unwrap_or(0)
    }

    pub(crate) fn emit(&mut self, mut ev: ProgressEvent) {
        let floor = self.last_percent();
        if ev.status == RenderStatus::Rendering
            && self.last_percent.is_some()
            && ev.progress_percent <= floor
        {
            return;
        }
        ev.progress_percent = ev.progress_percent.max(floor);
        self.last_percent = Some(ev.progress_percent);
        (self.sink)(ev);
    }
}

#[cfg(test)]
#[path = "../tests/unit/progress.rs"]
mod tests;
