//! Pointer history for throw velocity estimation.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::geometry::Point;

/// Time-windowed pointer position history.
#[derive(Debug)]
pub struct VelocityHistory {
    samples: VecDeque<Sample>,
    window: Duration,
}

#[derive(Copy, Clone, Debug)]
struct Sample {
    time: Instant,
    position: Point,
}

impl VelocityHistory {
    pub fn new(window: Duration) -> Self {
        Self { samples: VecDeque::new(), window }
    }

    /// Update the smoothing window used by future trims.
    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Append a new pointer sample.
    pub fn record(&mut self, time: Instant, position: Point) {
        // Timestamps should always increase monotonically.
        if let Some(last) = self.samples.back() {
            if time < last.time {
                trace!("Ignoring sample at {time:?} earlier than last {:?}", last.time);
                return;
            }
        }

        self.samples.push_back(Sample { time, position });
        self.trim();
    }

    /// Estimate the pointer velocity in pixels per tick.
    ///
    /// Both components are clamped to `[-max_velocity, max_velocity]`.
    pub fn estimate_velocity(&self, tick_interval: Duration, max_velocity: f64) -> Point<f64> {
        if self.samples.len() < 2 {
            return Point::default();
        }
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return Point::default();
        };

        let elapsed_ms = (newest.time - oldest.time).as_secs_f64() * 1000.;
        if elapsed_ms <= 0. {
            return Point::default();
        }

        let delta = Point::<f64>::from(newest.position - oldest.position);
        let tick_ms = tick_interval.as_secs_f64() * 1000.;
        let velocity = delta * (tick_ms / elapsed_ms);

        velocity.clamp_components(max_velocity)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all samples older than the smoothing window.
    fn trim(&mut self) {
        let Some(&Sample { time: newest, .. }) = self.samples.back() else {
            return;
        };

        while let Some(oldest) = self.samples.front() {
            if newest - oldest.time <= self.window {
                break;
            }

            self.samples.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(8);

    #[test]
    fn velocity_in_pixels_per_tick() {
        let start = Instant::now();
        let mut history = VelocityHistory::new(Duration::from_millis(150));
        history.record(start, Point::new(0, 0));
        history.record(start + Duration::from_millis(100), Point::new(50, 0));

        let velocity = history.estimate_velocity(TICK, 80.);
        assert!((velocity.x - 4.).abs() < 1e-9);
        assert_eq!(velocity.y, 0.);
    }

    #[test]
    fn trim_keeps_only_recent_samples() {
        let start = Instant::now();
        let window = Duration::from_millis(14);
        let mut history = VelocityHistory::new(window);

        for i in 0..20 {
            let time = start + Duration::from_millis(i * 5);
            history.record(time, Point::new(i as i32, 0));

            let newest = time;
            for sample in &history.samples {
                assert!(newest - sample.time <= window);
            }
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn single_sample_has_no_velocity() {
        let mut history = VelocityHistory::new(Duration::from_millis(14));
        history.record(Instant::now(), Point::new(10, 10));
        assert_eq!(history.estimate_velocity(TICK, 80.), Point::default());
    }

    #[test]
    fn zero_duration_has_no_velocity() {
        let now = Instant::now();
        let mut history = VelocityHistory::new(Duration::from_millis(14));
        history.record(now, Point::new(0, 0));
        history.record(now, Point::new(400, 400));
        assert_eq!(history.estimate_velocity(TICK, 80.), Point::default());
    }

    #[test]
    fn velocity_is_clamped_per_axis() {
        let start = Instant::now();
        for (dx, dy) in [(1_000_000, -1_000_000), (-7_000, 3), (i32::MAX / 2, 0)] {
            let mut history = VelocityHistory::new(Duration::from_millis(14));
            history.record(start, Point::new(0, 0));
            history.record(start + Duration::from_millis(1), Point::new(dx, dy));

            let velocity = history.estimate_velocity(TICK, 80.);
            assert!(velocity.x.abs() <= 80.);
            assert!(velocity.y.abs() <= 80.);
        }
    }

    #[test]
    fn out_of_order_samples_are_ignored() {
        let start = Instant::now();
        let mut history = VelocityHistory::new(Duration::from_millis(14));
        history.record(start + Duration::from_millis(5), Point::new(0, 0));
        history.record(start, Point::new(100, 0));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn clear_empties_history() {
        let mut history = VelocityHistory::new(Duration::from_millis(14));
        history.record(Instant::now(), Point::new(1, 1));
        history.clear();
        assert!(history.is_empty());
    }
}
