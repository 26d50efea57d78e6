//! Time management utilities

use std::time::{Duration, Instant};

/// High-precision frame timer with pause support
///
/// Tracks per-frame delta time and total running time. Time spans spent
/// stopped (e.g. while the window is minimized or being dragged) are
/// excluded from [`FrameTimer::total_time`].
pub struct FrameTimer {
    base: Instant,
    prev: Instant,
    stop_time: Option<Instant>,
    paused: Duration,
    delta_time: f32,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new running timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            base: now,
            prev: now,
            stop_time: None,
            paused: Duration::ZERO,
            delta_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance the timer (should be called once per frame)
    ///
    /// While stopped the delta time is pinned to zero so a paused
    /// simulation does not integrate the pause as one giant step.
    pub fn tick(&mut self) {
        if self.stop_time.is_some() {
            self.delta_time = 0.0;
            return;
        }
        let now = Instant::now();
        self.delta_time = now.duration_since(self.prev).as_secs_f32();
        self.prev = now;
        self.frame_count += 1;
    }

    /// Stop the timer; subsequent ticks report zero delta
    pub fn stop(&mut self) {
        if self.stop_time.is_none() {
            self.stop_time = Some(Instant::now());
        }
    }

    /// Resume a stopped timer, accumulating the paused span
    pub fn start(&mut self) {
        if let Some(stopped_at) = self.stop_time.take() {
            let now = Instant::now();
            self.paused += now.duration_since(stopped_at);
            self.prev = now;
        }
    }

    /// Reset the timer to zero total time and restart it
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.base = now;
        self.prev = now;
        self.stop_time = None;
        self.paused = Duration::ZERO;
        self.delta_time = 0.0;
        self.frame_count = 0;
    }

    /// Whether the timer is currently stopped
    pub fn is_stopped(&self) -> bool {
        self.stop_time.is_some()
    }

    /// Time since the last tick in seconds (zero while stopped)
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total running time in seconds, excluding stopped spans
    pub fn total_time(&self) -> f32 {
        let end = self.stop_time.unwrap_or_else(Instant::now);
        (end.duration_since(self.base) - self.paused).as_secs_f32()
    }

    /// Number of ticks since creation or the last reset
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since creation or the last reset
    pub fn average_fps(&self) -> f32 {
        let total = self.total_time();
        if total > 0.0 {
            self.frame_count as f32 / total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_tick_advances_frame_count() {
        let mut timer = FrameTimer::new();
        timer.tick();
        timer.tick();
        assert_eq!(timer.frame_count(), 2);
    }

    #[test]
    fn test_stopped_timer_has_zero_delta() {
        let mut timer = FrameTimer::new();
        timer.stop();
        sleep(Duration::from_millis(5));
        timer.tick();
        assert_eq!(timer.delta_time(), 0.0);
        assert_eq!(timer.frame_count(), 0);
    }

    #[test]
    fn test_total_time_frozen_while_stopped() {
        let mut timer = FrameTimer::new();
        timer.stop();
        let before = timer.total_time();
        sleep(Duration::from_millis(5));
        let after = timer.total_time();
        assert_eq!(before, after);
    }

    #[test]
    fn test_paused_span_excluded_from_total() {
        let mut timer = FrameTimer::new();
        sleep(Duration::from_millis(2));
        timer.stop();
        sleep(Duration::from_millis(20));
        timer.start();
        // The 20ms pause must not count towards total time.
        assert!(timer.total_time() < 0.015);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut timer = FrameTimer::new();
        timer.tick();
        timer.stop();
        timer.reset();
        assert!(!timer.is_stopped());
        assert_eq!(timer.frame_count(), 0);
        assert!(timer.total_time() < 0.01);
    }
}
