//! Renderer telemetry.
//!
//! [`DebugStats`] is a plain counter block threaded through the frame by
//! `&mut`; [`StatsOverlay`] samples it at a fixed interval for display.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters written by the rendering core each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebugStats {
    /// Current size of the dynamic vertex buffer.
    pub vbo_bytes: u64,
    /// Times the dynamic vertex buffer has been reallocated.
    pub vbo_reallocs: u64,
    /// Particles reserved across all cached emitter configs.
    pub particle_capacity: u32,
    pub particle_emitters: u32,
    pub live_bullets: u32,
    /// Draw calls issued in the last frame.
    pub draw_calls: u32,
    pub textures_cached: u32,
    pub scene_objects: u32,
}

impl DebugStats {
    /// Clears per-frame counters. Cumulative ones are kept.
    pub fn begin_frame(&mut self) {
        self.draw_calls = 0;
    }
}

/// A sampled copy of [`DebugStats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub at: Instant,
    pub stats: DebugStats,
}

/// Rate-limited reader over [`DebugStats`].
#[derive(Debug, Clone)]
pub struct StatsOverlay {
    poll_interval: Duration,
    last: Option<Instant>,
    latest: Option<StatsSnapshot>,
}

impl StatsOverlay {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval, last: None, latest: None }
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns a snapshot when at least `poll_interval` has passed since the
    /// previous one (always on the first call).
    pub fn poll(&mut self, now: Instant, stats: &DebugStats) -> Option<StatsSnapshot> {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.poll_interval {
                return None;
            }
        }
        self.last = Some(now);
        let snapshot = StatsSnapshot { at: now, stats: *stats };
        self.latest = Some(snapshot);

        log::debug!(
            "vbo {} B ({} reallocs), particles {}/{} emitters, bullets {}, draws {}, textures {}, objects {}",
            stats.vbo_bytes,
            stats.vbo_reallocs,
            stats.particle_capacity,
            stats.particle_emitters,
            stats.live_bullets,
            stats.draw_calls,
            stats.textures_cached,
            stats.scene_objects,
        );
        Some(snapshot)
    }

    /// Most recent snapshot, for display between polls.
    pub fn latest(&self) -> Option<&StatsSnapshot> {
        self.latest.as_ref()
    }
}

impl Default for StatsOverlay {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polls_at_most_once_per_interval() {
        let mut overlay = StatsOverlay::new(Duration::from_millis(250));
        let t0 = Instant::now();
        let mut stats = DebugStats { live_bullets: 3, ..Default::default() };

        assert!(overlay.poll(t0, &stats).is_some());
        stats.live_bullets = 5;
        assert!(overlay.poll(t0 + Duration::from_millis(100), &stats).is_none());
        assert_eq!(overlay.latest().map(|s| s.stats.live_bullets), Some(3));

        let snap = overlay.poll(t0 + Duration::from_millis(250), &stats).unwrap();
        assert_eq!(snap.stats.live_bullets, 5);
    }

    #[test]
    fn begin_frame_keeps_cumulative_counters() {
        let mut stats = DebugStats { draw_calls: 4, vbo_reallocs: 2, ..Default::default() };
        stats.begin_frame();
        assert_eq!(stats.draw_calls, 0);
        assert_eq!(stats.vbo_reallocs, 2);
    }
}
