//! Elapsed-time and size accounting for a recording.
//!
//! Pure state, no timers: the display ticker owned by the service polls
//! `elapsed()` and `bytes()`.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct ClockAccumulator {
    anchor: Option<Instant>,
    paused_at: Option<Instant>,
    frozen_at: Option<Instant>,
    total_paused: Duration,
    bytes: u64,
}

impl ClockAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor the clock at now and clear pause bookkeeping.
    pub fn start(&mut self) {
        self.anchor = Some(Instant::now());
        self.paused_at = None;
        self.frozen_at = None;
        self.total_paused = Duration::ZERO;
    }

    pub fn on_pause(&mut self) {
        if self.anchor.is_some() && self.paused_at.is_none() && self.frozen_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    pub fn on_resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused += Instant::now().saturating_duration_since(paused_at);
        }
    }

    /// Pin elapsed time at the current value; used when recording stops.
    pub fn freeze(&mut self) {
        if self.anchor.is_some() && self.frozen_at.is_none() {
            self.frozen_at = Some(self.paused_at.unwrap_or_else(Instant::now));
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        let Some(anchor) = self.anchor else {
            return Duration::ZERO;
        };
        let until = self
            .frozen_at
            .or(self.paused_at)
            .unwrap_or_else(Instant::now);
        until
            .saturating_duration_since(anchor)
            .saturating_sub(self.total_paused)
    }

    pub fn add_bytes(&mut self, n: u64) {
        self.bytes = self.bytes.saturating_add(n);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// `mm:ss`, minutes not wrapped at the hour.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[test]
    fn test_elapsed_before_start_is_zero() {
        let clock = ClockAccumulator::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        assert_eq!(clock.bytes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_advances_while_recording() {
        let mut clock = ClockAccumulator::new();
        clock.start();
        advance(Duration::from_secs(3)).await;
        assert_eq!(clock.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_frozen_during_pause() {
        let mut clock = ClockAccumulator::new();
        clock.start();
        advance(Duration::from_secs(2)).await;
        clock.on_pause();
        let at_pause = clock.elapsed();

        advance(Duration::from_secs(10)).await;
        assert_eq!(clock.elapsed(), at_pause);

        clock.on_resume();
        assert_eq!(clock.elapsed(), at_pause);

        advance(Duration::from_secs(4)).await;
        assert_eq!(clock.elapsed(), at_pause + Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_never_decreases_over_pause_cycles() {
        let mut clock = ClockAccumulator::new();
        clock.start();
        let mut last = clock.elapsed();
        let mut recorded = Duration::ZERO;

        for round in 1..=5u64 {
            advance(Duration::from_millis(700 * round)).await;
            recorded += Duration::from_millis(700 * round);
            clock.on_pause();
            assert!(clock.elapsed() >= last);
            last = clock.elapsed();

            advance(Duration::from_secs(round)).await;
            assert_eq!(clock.elapsed(), last);
            clock.on_resume();
        }

        assert_eq!(clock.elapsed(), recorded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_pause_keeps_first_boundary() {
        let mut clock = ClockAccumulator::new();
        clock.start();
        advance(Duration::from_secs(1)).await;
        clock.on_pause();
        advance(Duration::from_secs(1)).await;
        clock.on_pause();
        clock.on_resume();
        clock.on_resume();
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_freeze_pins_elapsed() {
        let mut clock = ClockAccumulator::new();
        clock.start();
        advance(Duration::from_secs(5)).await;
        clock.freeze();
        advance(Duration::from_secs(5)).await;
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
    }

    #[test]
    fn test_bytes_accumulate() {
        let mut clock = ClockAccumulator::new();
        clock.add_bytes(1000);
        clock.add_bytes(2000);
        assert_eq!(clock.bytes(), 3000);
        clock.reset();
        assert_eq!(clock.bytes(), 0);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_elapsed(Duration::from_millis(65_900)), "01:05");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "60:00");
        assert_eq!(format_size(0), "0.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.50 MB");
    }
}
