use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Sum of all clamped deltas since the clock started, in seconds.
    pub elapsed: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped to avoid pathological values when the application is paused
/// by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Creates a new clock with default clamps (0.1 ms to 250 ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the delta baseline, e.g. when resuming after focus loss.
    ///
    /// Elapsed time and the frame counter are kept.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.elapsed += dt.as_secs_f64();

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed as f32,
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Averages the frame rate over a fixed number of frames.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    interval: u32,
    frames: u32,
    window_start: Option<Instant>,
}

impl FpsCounter {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            frames: 0,
            window_start: None,
        }
    }

    /// Counts one frame presented at `now`. Every `interval` frames, returns the average
    /// rate over that window.
    pub fn frame(&mut self, now: Instant) -> Option<f32> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };

        self.frames += 1;
        if self.frames < self.interval {
            return None;
        }

        let secs = now.saturating_duration_since(start).as_secs_f32();
        let fps = if secs > 0.0 { self.frames as f32 / secs } else { 0.0 };

        self.frames = 0;
        self.window_start = Some(now);
        Some(fps)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_stall_is_clamped() {
        let mut clock = FrameClock::new();
        let start = clock.last;
        let ft = clock.tick_at(start + Duration::from_secs(3));
        assert_eq!(ft.dt, 0.25);
        assert_eq!(ft.frame_index, 0);
    }

    #[test]
    fn elapsed_accumulates_clamped_deltas() {
        let mut clock = FrameClock::new();
        let start = clock.last;
        clock.tick_at(start + Duration::from_millis(100));
        let ft = clock.tick_at(start + Duration::from_millis(300));
        assert!((ft.elapsed - 0.3).abs() < 1e-4);
        assert_eq!(ft.frame_index, 1);
    }

    #[test]
    fn zero_delta_is_raised_to_minimum() {
        let mut clock = FrameClock::new();
        let start = clock.last;
        let ft = clock.tick_at(start);
        assert!(ft.dt > 0.0);
    }

    #[test]
    fn fps_reported_once_per_interval() {
        let mut fps = FpsCounter::new(4);
        let t0 = Instant::now();
        assert_eq!(fps.frame(t0), None);

        let reports: Vec<_> = (1..=8)
            .filter_map(|i| fps.frame(t0 + Duration::from_millis(10 * i)))
            .collect();

        assert_eq!(reports.len(), 2);
        assert!((reports[0] - 100.0).abs() < 0.5);
    }
}
