//! Progress clocks
//!
//! A [`ProgressClock`] turns elapsed time into progress over a fixed
//! duration: `elapsed / duration`, clamped to `[0, 1]` and never moving
//! backwards. Reaching 1 completes the clock; a completed clock reports
//! nothing further.

/// One clock reading
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockSample {
    pub progress: f32,
    /// True only on the sample that reached 1
    pub completed: bool,
}

#[derive(Clone, Debug)]
pub struct ProgressClock {
    duration_ms: f64,
    started_at: Option<f64>,
    progress: f32,
    completed: bool,
}

impl ProgressClock {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            started_at: None,
            progress: 0.0,
            completed: false,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Sample at `elapsed_ms` since the clock started
    ///
    /// Returns `None` once the clock has completed.
    pub fn sample(&mut self, elapsed_ms: f64) -> Option<ClockSample> {
        if self.completed {
            return None;
        }

        let raw = if self.duration_ms > 0.0 {
            elapsed_ms / self.duration_ms
        } else {
            1.0
        };
        let raw = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };

        self.progress = self.progress.max(raw as f32);
        if self.progress >= 1.0 {
            self.completed = true;
        }

        Some(ClockSample {
            progress: self.progress,
            completed: self.completed,
        })
    }

    /// Sample at an absolute frame time
    ///
    /// The first call starts the clock, so it always reads progress 0 unless
    /// the duration is zero.
    pub fn tick(&mut self, now_ms: f64) -> Option<ClockSample> {
        let started_at = *self.started_at.get_or_insert(now_ms);
        self.sample(now_ms - started_at)
    }
}
