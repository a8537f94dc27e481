//! # Frame Timing
//!
//! Delta-time measurement, frame-rate pacing and per-frame statistics.
//!
//! - [`FrameClock`] produces clamped delta times for frame-rate independent
//!   camera movement.
//! - [`FramePacer`] spaces frame starts at `1 / target_fps`. The windowed loop
//!   turns its deadline into `ControlFlow::WaitUntil` so window events keep
//!   flowing while it waits; [`FramePacer::wait`] is the blocking variant for
//!   loops without an event source.
//! - [`PerformanceMonitor`] keeps a window of recent frame times and logs an
//!   FPS estimate at debug level.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous frame tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing [`FrameTime`] snapshots.
///
/// Delta time is clamped so a stall (debugger, minimized window) does not
/// teleport the camera on the next frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min: Duration::from_micros(100), // 0.0001s
            dt_max: Duration::from_millis(250), // 0.25s
        }
    }

    /// Resets the clock baseline, e.g. after the window was hidden.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
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

/// Time between frame starts at `target_fps`.
///
/// `None` for a target of 0 (unlimited) and for rates so low the interval
/// does not fit a [`Duration`]; `AppConfig::validate` rejects the latter.
pub fn frame_interval(target_fps: f32) -> Option<Duration> {
    if target_fps > 0.0 {
        Duration::try_from_secs_f64(1.0 / target_fps as f64).ok()
    } else {
        None
    }
}

/// Spaces frame starts to a target rate. A target of 0 disables pacing.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Option<Duration>,
    last_start: Option<Instant>,
}

impl FramePacer {
    /// `target_fps` must be finite and non-negative (see `AppConfig::validate`).
    pub fn new(target_fps: f32) -> Self {
        let interval = frame_interval(target_fps);
        Self {
            interval,
            last_start: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn is_unlimited(&self) -> bool {
        self.interval.is_none()
    }

    /// Earliest start of the next frame, or `None` when no wait is needed.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_start?.checked_add(self.interval?)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().map_or(true, |deadline| now >= deadline)
    }

    /// Records the start of a frame.
    pub fn begin_frame(&mut self, now: Instant) {
        self.last_start = Some(now);
    }

    /// Sleeps until the next frame is due. Returns immediately when unlimited.
    pub fn wait(&self) {
        if let Some(deadline) = self.deadline() {
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
    }
}

/// Counters gathered while rendering one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub draw_calls: u32,
    pub triangles: usize,
    /// Objects drawn with an identity normal matrix because their transform
    /// was degenerate.
    pub degenerate_transforms: u32,
    /// Objects whose scale is zero or negative on some axis.
    pub invalid_scales: u32,
}

impl FrameStats {
    pub fn new(frame_index: u64) -> Self {
        Self {
            frame_index,
            ..Default::default()
        }
    }

    pub fn record_draw(&mut self, triangles: usize) {
        self.draw_calls += 1;
        self.triangles += triangles;
    }
}

/// Rolling frame-time window with periodic debug logging
pub struct PerformanceMonitor {
    /// Ring buffer of recent frame times for averaging
    frame_times: VecDeque<Duration>,
    /// Maximum number of frame times to keep for averaging
    max_samples: usize,
    last_report: Instant,
    report_interval: Duration,
    last_frame_start: Option<Instant>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(120), // ~2 seconds at 60fps
            max_samples: 120,
            last_report: Instant::now(),
            report_interval: Duration::from_secs(1),
            last_frame_start: None,
        }
    }

    /// Records the interval since the previous frame start, so the FPS
    /// estimate includes pacing waits and not just the frame body.
    pub fn frame_started(&mut self, now: Instant) {
        if let Some(previous) = self.last_frame_start.replace(now) {
            self.record(now.saturating_duration_since(previous));
        }
    }

    /// Adds a frame time sample
    pub fn record(&mut self, frame_time: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);
    }

    /// Average FPS over the sample window
    pub fn fps(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let total: Duration = self.frame_times.iter().sum();
        let average = total.as_secs_f32() / self.frame_times.len() as f32;
        if average > 0.0 {
            1.0 / average
        } else {
            0.0
        }
    }

    /// Logs FPS and the last frame's stats once per report interval
    pub fn report(&mut self, stats: &FrameStats) {
        if self.last_report.elapsed() < self.report_interval {
            return;
        }
        self.last_report = Instant::now();
        log::debug!(
            "{:.1} fps | frame {} | {} draws, {} triangles",
            self.fps(),
            stats.frame_index,
            stats.draw_calls,
            stats.triangles
        );
    }

    pub fn reset(&mut self) {
        self.frame_times.clear();
        self.last_frame_start = None;
        self.last_report = Instant::now();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}
