//! Frame timing and memory statistics, sampled once per interval.

use std::time::{Duration, Instant};

use sysinfo::{Pid, System};

/// One published statistics sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub fps: f32,
    /// Average frame time over the sampling interval
    pub frame_time_ms: f32,
    /// Estimated GPU memory held by the renderer
    pub video_memory_kb: u64,
    /// Resident memory of this process
    pub ram_kb: u64,
}

/// Reads this process's resident memory.
struct HostMemory {
    system: System,
    pid: Option<Pid>,
}

impl HostMemory {
    fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(err) => {
                tracing::warn!(err, "Process memory unavailable");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }

    fn resident_kb(&mut self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        self.system.refresh_process(pid);
        self.system.process(pid).map_or(0, |p| p.memory() / 1024)
    }
}

/// Counts frames and publishes a [`FrameStats`] sample every `interval`.
///
/// Time is passed in by the caller, so sampling is independent of pass
/// execution and deterministic under test.
pub struct FrameStatsCollector {
    interval: Duration,
    window_start: Option<Instant>,
    frames: u32,
    latest: Option<FrameStats>,
    host: HostMemory,
}

impl FrameStatsCollector {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            window_start: None,
            frames: 0,
            latest: None,
            host: HostMemory::new(),
        }
    }

    /// Records a finished frame at `now`.
    ///
    /// Returns the new sample when the interval has elapsed.
    pub fn tick(&mut self, now: Instant, video_memory_kb: u64) -> Option<FrameStats> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };

        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.interval {
            return None;
        }

        let seconds = elapsed.as_secs_f32();
        let stats = FrameStats {
            fps: self.frames as f32 / seconds,
            frame_time_ms: seconds * 1000.0 / self.frames as f32,
            video_memory_kb,
            ram_kb: self.host.resident_kb(),
        };
        tracing::debug!(
            fps = stats.fps,
            frame_time_ms = stats.frame_time_ms,
            video_memory_kb,
            ram_kb = stats.ram_kb,
            "Frame stats"
        );

        self.window_start = Some(now);
        self.frames = 0;
        self.latest = Some(stats);
        Some(stats)
    }

    /// Last published sample.
    pub fn latest(&self) -> Option<FrameStats> {
        self.latest
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FrameStatsCollector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_publishes_once_per_interval() {
        let mut stats = FrameStatsCollector::default();
        let start = Instant::now();
        assert!(stats.tick(start, 0).is_none());

        // 60 frames at ~16.7 ms
        let mut published = Vec::new();
        for i in 1..=60 {
            let now = start + Duration::from_micros(16_667 * i);
            if let Some(sample) = stats.tick(now, 2048) {
                published.push(sample);
            }
        }

        assert_eq!(published.len(), 1);
        let sample = published[0];
        assert_relative_eq!(sample.fps, 60.0, epsilon = 0.1);
        assert_relative_eq!(sample.frame_time_ms, 16.667, epsilon = 0.01);
        assert_eq!(sample.video_memory_kb, 2048);
        assert_eq!(stats.latest(), Some(sample));
    }

    #[test]
    fn test_no_sample_before_interval() {
        let mut stats = FrameStatsCollector::new(Duration::from_secs(2));
        let start = Instant::now();
        stats.tick(start, 0);
        assert!(stats.tick(start + Duration::from_secs(1), 0).is_none());
        assert!(stats.latest().is_none());
        assert!(stats.tick(start + Duration::from_secs(2), 0).is_some());
    }

    #[test]
    fn test_window_resets_after_sample() {
        let mut stats = FrameStatsCollector::new(Duration::from_millis(100));
        let start = Instant::now();
        stats.tick(start, 0);
        let first = stats.tick(start + Duration::from_millis(100), 0);
        assert_relative_eq!(first.map_or(0.0, |s| s.fps), 10.0, epsilon = 1e-3);

        for i in 1..=4 {
            stats.tick(start + Duration::from_millis(100 + 25 * i), 0);
        }
        assert_relative_eq!(stats.latest().map_or(0.0, |s| s.fps), 40.0, epsilon = 1e-2);
    }
}
