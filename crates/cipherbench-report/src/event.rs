//! Timing events and the clocks that produce them.

use std::sync::OnceLock;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// One recorded timing event.
///
/// Start/end timestamps are expressed in the scale given by the interval
/// ratio: a timestamp times `num / den` is seconds. The recorder uses a
/// nanosecond scale (`1 / 1_000_000_000`); loaded reports may carry any
/// non-zero ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEvent {
    pub event_type_id: u32,
    pub cpu_time_start: f64,
    pub cpu_time_end: f64,
    pub wall_time_start: f64,
    pub wall_time_end: f64,
    pub time_interval_ratio_num: i64,
    pub time_interval_ratio_den: i64,
    /// Number of input samples this event covers; statistics divide the
    /// elapsed time by this count.
    pub input_sample_count: u64,
    pub description: String,
}

impl TimingEvent {
    /// Elapsed wall time in seconds.
    #[must_use]
    pub fn elapsed_wall_secs(&self) -> f64 {
        (self.wall_time_end - self.wall_time_start).abs() * self.time_interval_ratio_num as f64
            / self.time_interval_ratio_den as f64
    }

    /// Elapsed CPU time in seconds.
    #[must_use]
    pub fn elapsed_cpu_secs(&self) -> f64 {
        (self.cpu_time_end - self.cpu_time_start).abs() * self.time_interval_ratio_num as f64
            / self.time_interval_ratio_den as f64
    }

    /// Elapsed wall time in milliseconds.
    #[must_use]
    pub fn elapsed_wall_ms(&self) -> f64 {
        self.elapsed_wall_secs() * 1_000.0
    }
}

fn process_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

fn wall_now_ns() -> f64 {
    process_epoch().elapsed().as_nanos() as f64
}

#[cfg(unix)]
fn cpu_now_ns() -> f64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return wall_now_ns();
    }
    ts.tv_sec as f64 * 1_000_000_000.0 + ts.tv_nsec as f64
}

#[cfg(not(unix))]
fn cpu_now_ns() -> f64 {
    wall_now_ns()
}

/// High-resolution bracketing timer for pipeline stages.
///
/// `start` snapshots the wall and process-CPU clocks; `stop` produces the
/// finished event at nanosecond scale.
#[derive(Debug, Clone, Copy)]
pub struct EventTimer {
    wall_start: f64,
    cpu_start: f64,
}

impl EventTimer {
    #[must_use]
    pub fn start() -> Self {
        Self {
            cpu_start: cpu_now_ns(),
            wall_start: wall_now_ns(),
        }
    }

    #[must_use]
    pub fn stop(
        self,
        event_type_id: u32,
        input_sample_count: u64,
        description: impl Into<String>,
    ) -> TimingEvent {
        let wall_end = wall_now_ns();
        let cpu_end = cpu_now_ns();
        TimingEvent {
            event_type_id,
            cpu_time_start: self.cpu_start,
            cpu_time_end: cpu_end,
            wall_time_start: self.wall_start,
            wall_time_end: wall_end,
            time_interval_ratio_num: 1,
            time_interval_ratio_den: 1_000_000_000,
            input_sample_count,
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_applies_interval_ratio() {
        let event = TimingEvent {
            event_type_id: 1,
            cpu_time_start: 0.0,
            cpu_time_end: 500.0,
            wall_time_start: 1_000.0,
            wall_time_end: 3_000.0,
            time_interval_ratio_num: 1,
            time_interval_ratio_den: 1_000,
            input_sample_count: 1,
            description: String::new(),
        };
        assert!((event.elapsed_wall_secs() - 2.0).abs() < 1e-12);
        assert!((event.elapsed_cpu_secs() - 0.5).abs() < 1e-12);
        assert!((event.elapsed_wall_ms() - 2_000.0).abs() < 1e-9);
    }

    #[test]
    fn elapsed_is_absolute_difference() {
        let event = TimingEvent {
            event_type_id: 1,
            cpu_time_start: 10.0,
            cpu_time_end: 4.0,
            wall_time_start: 9.0,
            wall_time_end: 3.0,
            time_interval_ratio_num: 1,
            time_interval_ratio_den: 1,
            input_sample_count: 1,
            description: String::new(),
        };
        assert!((event.elapsed_wall_secs() - 6.0).abs() < 1e-12);
        assert!((event.elapsed_cpu_secs() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn timer_measures_nonnegative_interval() {
        let timer = EventTimer::start();
        let mut acc = 0u64;
        for i in 0..1_000u64 {
            acc = acc.wrapping_add(i);
        }
        std::hint::black_box(acc);
        let event = timer.stop(3, 2, "spin");
        assert_eq!(event.event_type_id, 3);
        assert_eq!(event.input_sample_count, 2);
        assert!(event.wall_time_end >= event.wall_time_start);
        assert!(event.elapsed_wall_secs() >= 0.0);
        assert_eq!(event.time_interval_ratio_den, 1_000_000_000);
    }
}
