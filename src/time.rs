use std::time::{Duration, Instant};

/// Frame timer that keeps running totals while excluding time spent paused
/// (for example while the window is minimised).
#[derive(Debug, Clone)]
pub struct GameTimer {
    base_time: Instant,
    paused_time: Duration,
    stop_time: Option<Instant>,
    prev_time: Instant,
    curr_time: Instant,
    delta_time: f64,
}

impl GameTimer {
    pub fn new() -> Self {
        Self::new_at(Instant::now())
    }

    pub fn new_at(now: Instant) -> Self {
        Self {
            base_time: now,
            paused_time: Duration::ZERO,
            stop_time: None,
            prev_time: now,
            curr_time: now,
            delta_time: 0.0,
        }
    }

    /// Seconds elapsed since `reset`, not counting paused time.
    pub fn total_time(&self) -> f64 {
        let end = self.stop_time.unwrap_or(self.curr_time);
        end.saturating_duration_since(self.base_time)
            .saturating_sub(self.paused_time)
            .as_secs_f64()
    }

    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_time.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::new_at(Instant::now());
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn start_at(&mut self, now: Instant) {
        if let Some(stopped) = self.stop_time.take() {
            self.paused_time += now.saturating_duration_since(stopped);
            self.prev_time = now;
        }
    }

    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub fn stop_at(&mut self, now: Instant) {
        if self.stop_time.is_none() {
            self.stop_time = Some(now);
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        if self.stop_time.is_some() {
            self.delta_time = 0.0;
            return;
        }

        self.curr_time = now;
        // saturating: an earlier `now` than the last tick yields zero, never negative
        self.delta_time = now.saturating_duration_since(self.prev_time).as_secs_f64();
        self.prev_time = now;
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame counter that produces an FPS report once per second of timer time.
#[derive(Debug, Default, Clone)]
pub struct FrameStats {
    frame_count: u32,
    window_start: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub fps: f64,
    pub ms_per_frame: f64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, total_time: f64) -> Option<FrameReport> {
        self.frame_count += 1;

        let elapsed = total_time - self.window_start;
        if elapsed < 1.0 {
            return None;
        }

        let fps = self.frame_count as f64 / elapsed;
        self.frame_count = 0;
        self.window_start = total_time;

        Some(FrameReport {
            fps,
            ms_per_frame: 1000.0 / fps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_time_between_ticks() {
        let t0 = Instant::now();
        let mut timer = GameTimer::new_at(t0);
        timer.tick_at(t0 + Duration::from_millis(16));
        assert!((timer.delta_time() - 0.016).abs() < 1e-9);
        timer.tick_at(t0 + Duration::from_millis(40));
        assert!((timer.delta_time() - 0.024).abs() < 1e-9);
    }

    #[test]
    fn paused_time_is_excluded_from_total() {
        let t0 = Instant::now();
        let mut timer = GameTimer::new_at(t0);
        timer.tick_at(t0 + Duration::from_secs(1));
        timer.stop_at(t0 + Duration::from_secs(1));
        assert!(timer.is_stopped());

        timer.tick_at(t0 + Duration::from_secs(3));
        assert_eq!(timer.delta_time(), 0.0);

        timer.start_at(t0 + Duration::from_secs(5));
        timer.tick_at(t0 + Duration::from_secs(6));

        assert!((timer.total_time() - 2.0).abs() < 1e-9);
        assert!((timer.delta_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn backwards_tick_clamps_to_zero() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let mut timer = GameTimer::new_at(t0);
        timer.tick_at(t0 - Duration::from_secs(1));
        assert_eq!(timer.delta_time(), 0.0);
    }

    #[test]
    fn frame_stats_report_once_per_second() {
        let mut stats = FrameStats::new();
        for i in 1..60 {
            assert!(stats.frame(i as f64 / 60.0).is_none());
        }
        let report = stats.frame(1.0).expect("report after one second");
        assert!((report.fps - 60.0).abs() < 1e-6);
        assert!((report.ms_per_frame - 1000.0 / 60.0).abs() < 1e-6);
    }
}
