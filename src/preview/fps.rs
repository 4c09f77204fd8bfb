// SPDX-License-Identifier: GPL-3.0-only

//! Windowed frame rate estimator driven by the producer

use crate::constants::timing::FPS_WINDOW_MS;
use std::time::{Duration, Instant};

/// Counts completed frames and reports a rate once per window
#[derive(Debug, Clone)]
pub struct FpsCounter {
    count: u32,
    window_start: Option<Instant>,
    window: Duration,
    last_rate: Option<f64>,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    /// Counter with the default window; the window opens on the first tick
    pub fn new() -> Self {
        Self::with_window(Duration::from_millis(FPS_WINDOW_MS))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            count: 0,
            window_start: None,
            window,
            last_rate: None,
        }
    }

    /// Counter whose window is already open at `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            window_start: Some(start),
            ..Self::new()
        }
    }

    /// Record one completed frame now
    pub fn tick(&mut self) -> Option<f64> {
        self.tick_at(Instant::now())
    }

    /// Record one completed frame at `now`
    ///
    /// Returns the rate when this tick closes a window. The first tick of a
    /// counter without an open window only opens it.
    pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
        self.count += 1;

        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window {
            return None;
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let rate = f64::from(self.count) * 1000.0 / elapsed_ms;
        self.count = 0;
        self.window_start = Some(now);
        self.last_rate = Some(rate);
        Some(rate)
    }

    /// Frames counted in the current window
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Rate reported by the most recently closed window
    pub fn last_rate(&self) -> Option<f64> {
        self.last_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_opens_window() {
        let mut counter = FpsCounter::new();
        let t0 = Instant::now();
        assert_eq!(counter.tick_at(t0), None);
        assert_eq!(counter.count(), 1);
        assert_eq!(counter.tick_at(t0 + Duration::from_millis(500)), None);
        let rate = counter.tick_at(t0 + Duration::from_millis(1000)).unwrap();
        assert!((rate - 3.0).abs() < 1e-9);
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_late_tick_divides_by_actual_elapsed() {
        let t0 = Instant::now();
        let mut counter = FpsCounter::starting_at(t0);
        for _ in 0..4 {
            counter.tick_at(t0 + Duration::from_millis(100));
        }
        let rate = counter.tick_at(t0 + Duration::from_millis(2000)).unwrap();
        assert!((rate - 2.5).abs() < 1e-9);
        assert_eq!(counter.last_rate(), Some(rate));
    }
}
