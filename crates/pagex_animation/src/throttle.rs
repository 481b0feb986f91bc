//! Leading + trailing throttle
//!
//! Rate-limits a stream of values to one delivery per window. The first value
//! of a burst is delivered immediately (leading edge); the latest value seen
//! during the window is delivered when the window closes (trailing edge).
//! Values in between are collapsed.
//!
//! Time is passed in explicitly, in milliseconds, so the throttle can be
//! driven by a frame scheduler or a test clock.

/// Throttle over explicit timestamps
#[derive(Clone, Debug)]
pub struct Throttle<T> {
    window_ms: f64,
    /// Time of the last delivery, if a window is open
    last_delivery: Option<f64>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms: window_ms.max(0.0),
            last_delivery: None,
            pending: None,
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.window_ms
    }

    /// Offer a value at `now`
    ///
    /// Returns the value to apply immediately, if any. Otherwise the value is
    /// held as the trailing delivery of the current window, replacing any
    /// earlier held value.
    pub fn push(&mut self, now: f64, value: T) -> Option<T> {
        match self.last_delivery {
            Some(last) if now - last < self.window_ms => {
                self.pending = Some(value);
                None
            }
            _ => {
                self.pending = None;
                self.last_delivery = Some(now);
                Some(value)
            }
        }
    }

    /// Release the trailing value once its window has closed
    pub fn poll(&mut self, now: f64) -> Option<T> {
        let last = self.last_delivery?;
        if now - last < self.window_ms {
            return None;
        }
        match self.pending.take() {
            Some(value) => {
                // The trailing delivery opens the next window
                self.last_delivery = Some(now);
                Some(value)
            }
            None => {
                self.last_delivery = None;
                None
            }
        }
    }

    /// Release the held value immediately, if any
    pub fn flush(&mut self, now: f64) -> Option<T> {
        let value = self.pending.take()?;
        self.last_delivery = Some(now);
        Some(value)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any held value and close the window
    pub fn cancel(&mut self) {
        self.pending = None;
        self.last_delivery = None;
    }
}
