//! Clock-skew tracking.
//!
//! There can be skew between the jiffy-based trace-time monotonic clock and
//! the POSIX monotonic clock some payloads embed. FPS records carry both (the
//! trace timestamp on the log line, the system timestamp inside the payload),
//! which makes them the skew surrogate: every FPS record yields a fresh
//! offset, and a [`TimeSyncMark`] is emitted whenever it moves.

use jankscope_common::NS_PER_SEC_F;
use jankscope_log_model::surfaceflinger::SfFpsRecord;

use crate::events::TimeSyncMark;

/// Tracks `trace - sys` clock skew across a single source.
#[derive(Debug, Default)]
pub struct ClockSkewTracker {
    current_offset_ns: i64,
}

impl ClockSkewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe an FPS record. Returns a mark iff the offset changed.
    pub fn observe(&mut self, trace_time: f64, fps: &SfFpsRecord) -> Option<TimeSyncMark> {
        let trace_time_ns = (trace_time * NS_PER_SEC_F) as i64;
        let new_offset = trace_time_ns - fps.cur_time;
        if new_offset == self.current_offset_ns {
            return None;
        }

        self.current_offset_ns = new_offset;
        Some(TimeSyncMark {
            offset_ns: new_offset,
            trace_time_ns,
            sys_time_ns: fps.cur_time,
        })
    }

    /// The latest offset; 0 until the first FPS record arrives, which leaves
    /// downstream timestamps uncalibrated rather than broken.
    pub fn current_offset_ns(&self) -> i64 {
        self.current_offset_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps_at(cur_time: i64) -> SfFpsRecord {
        SfFpsRecord {
            fps: 60.0,
            tot_frames: 100,
            prev_frames: 40,
            cur_time,
            prev_time: 0,
        }
    }

    #[test]
    fn test_first_observation_emits_mark() {
        let mut tracker = ClockSkewTracker::new();
        let mark = tracker.observe(2.0, &fps_at(1_930_000_000)).unwrap();
        assert_eq!(mark.offset_ns, 70_000_000);
        assert_eq!(mark.trace_time_ns, 2_000_000_000);
        assert_eq!(mark.sys_time_ns, 1_930_000_000);
    }

    #[test]
    fn test_unchanged_offset_is_silent() {
        let mut tracker = ClockSkewTracker::new();
        assert!(tracker.observe(2.0, &fps_at(1_930_000_000)).is_some());
        // Same skew one second later: no mark.
        assert!(tracker.observe(3.0, &fps_at(2_930_000_000)).is_none());
        assert_eq!(tracker.current_offset_ns(), 70_000_000);
    }

    #[test]
    fn test_changed_offset_emits_again() {
        let mut tracker = ClockSkewTracker::new();
        tracker.observe(2.0, &fps_at(1_930_000_000));
        let mark = tracker.observe(3.0, &fps_at(2_920_000_000)).unwrap();
        assert_eq!(mark.offset_ns, 80_000_000);
    }

    #[test]
    fn test_replaying_marks_is_idempotent() {
        // Two trackers fed the same records produce the same mark sequence,
        // and feeding the offsets a second time adds nothing.
        let records = [(2.0, 1_930_000_000), (2.5, 2_430_000_000), (3.0, 2_920_000_000)];

        let mut first = ClockSkewTracker::new();
        let marks: Vec<_> = records
            .iter()
            .filter_map(|(t, sys)| first.observe(*t, &fps_at(*sys)))
            .collect();

        let mut second = ClockSkewTracker::new();
        let replayed: Vec<_> = records
            .iter()
            .filter_map(|(t, sys)| second.observe(*t, &fps_at(*sys)))
            .collect();

        assert_eq!(marks, replayed);
        assert_eq!(marks.len(), 2); // initial offset, then one change
    }
}
