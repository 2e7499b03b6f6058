use std::time::{Duration, Instant};

/// Timing of one redraw.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped seconds since the previous tick; the simulation step.
    pub dt: f32,
    pub now: Instant,
    /// Seconds since the clock started. Shader animation (radiation bands,
    /// particle drift, pulses) is a function of this value.
    pub elapsed: f32,
    pub frame_index: u64,
}

/// Per-window frame clock.
///
/// `dt` is clamped so a stall (debugger, minimised window) advances bullets
/// and creeps by at most `dt_max` instead of teleporting them.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(100))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        Self::starting_at(Instant::now(), dt_min, dt_max)
    }

    fn starting_at(start: Instant, dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self { start, last: start, frame_index: 0, dt_min, dt_max }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now.saturating_duration_since(self.last).clamp(self.dt_min, self.dt_max);
        self.last = now;

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn stalls_are_clamped_but_elapsed_is_not() {
        let t0 = Instant::now();
        let mut clock = FrameClock::starting_at(t0, ms(1), ms(100));

        let first = clock.tick_at(t0 + ms(16));
        assert_relative_eq!(first.dt, 0.016, epsilon = 1e-6);
        assert_eq!(first.frame_index, 0);

        let stalled = clock.tick_at(t0 + ms(2016));
        assert_relative_eq!(stalled.dt, 0.1, epsilon = 1e-6);
        assert_relative_eq!(stalled.elapsed, 2.016, epsilon = 1e-4);
        assert_eq!(stalled.frame_index, 1);
    }

    #[test]
    fn back_to_back_ticks_get_the_minimum_step() {
        let t0 = Instant::now();
        let mut clock = FrameClock::starting_at(t0, ms(5), ms(10));
        assert_relative_eq!(clock.tick_at(t0).dt, 0.005, epsilon = 1e-6);
    }
}
