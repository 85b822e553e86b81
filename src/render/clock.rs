use std::time::{Duration, Instant};

use crate::config::Pacing;

/// Time source driving the render loop.
///
/// The loop never polls: it asks for the current time, and when the next frame is not yet due it
/// calls [`RenderClock::sleep_until`] once with the computed due time.
pub trait RenderClock: Send {
    /// Anchor `t = 0` at the current instant.
    fn start(&mut self);

    /// Seconds since [`RenderClock::start`].
    fn elapsed_secs(&self) -> f64;

    /// Block until `elapsed_secs() >= secs`.
    fn sleep_until(&mut self, secs: f64);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Monotonic wall clock.
#[derive(Debug, Default)]
pub struct WallClock {
    origin: Option<Instant>,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderClock for WallClock {
    fn start(&mut self) {
        self.origin = Some(Instant::now());
    }

    fn elapsed_secs(&self) -> f64 {
        self.origin
            .map(|o| o.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn sleep_until(&mut self, secs: f64) {
        let Some(origin) = self.origin else {
            return;
        };
        if !secs.is_finite() || secs <= 0.0 {
            return;
        }
        let deadline = origin + Duration::from_secs_f64(secs);
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }

    fn name(&self) -> &'static str {
        "wall"
    }
}

/// Wall time rounded down to whole samples at the mix rate.
///
/// Nothing is played back; the clock only puts frame deadlines on the same sample grid as the
/// narration offsets. Keeps running past the end of the track so the trailing wait after the
/// last frame completes.
#[derive(Debug)]
pub struct AudioClock {
    sample_rate: u32,
    wall: WallClock,
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            wall: WallClock::new(),
        }
    }

    /// Samples played since start.
    pub fn position_samples(&self) -> u64 {
        (self.wall.elapsed_secs() * f64::from(self.sample_rate)).floor() as u64
    }
}

impl RenderClock for AudioClock {
    fn start(&mut self) {
        self.wall.start();
    }

    fn elapsed_secs(&self) -> f64 {
        self.position_samples() as f64 / f64::from(self.sample_rate)
    }

    fn sleep_until(&mut self, secs: f64) {
        // Round up to the sample that makes `elapsed_secs() >= secs`.
        let rate = f64::from(self.sample_rate);
        let target = (secs * rate).ceil() / rate;
        self.wall.sleep_until(target);
    }

    fn name(&self) -> &'static str {
        "audio"
    }
}

/// Offline clock: time only moves when the loop asks to wait, and then jumps to the deadline.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now_secs: f64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderClock for VirtualClock {
    fn start(&mut self) {
        self.now_secs = 0.0;
    }

    fn elapsed_secs(&self) -> f64 {
        self.now_secs
    }

    fn sleep_until(&mut self, secs: f64) {
        if secs.is_finite() {
            self.now_secs = self.now_secs.max(secs);
        }
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}

/// Pick the clock for one render: virtual when offline, otherwise the audio clock when a mixed
/// track exists and the wall clock when it does not.
pub fn clock_for(pacing: Pacing, audio_sample_rate: Option<u32>) -> Box<dyn RenderClock> {
    match (pacing, audio_sample_rate) {
        (Pacing::Offline, _) => Box::new(VirtualClock::new()),
        (Pacing::Realtime, Some(rate)) => Box::new(AudioClock::new(rate)),
        (Pacing::Realtime, None) => Box::new(WallClock::new()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/clock.rs"]
mod tests;
