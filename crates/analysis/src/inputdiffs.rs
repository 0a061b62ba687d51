//! Input-diff windowing.
//!
//! For each qualifying gesture, opens a window over the diff stream and
//! records the diff localized around the gesture under all three
//! connectivity policies. Scroll windows stay open past the configured
//! duration until the scroll ends.

use jankscope_common::{Connectivity, InputDiffConfig, JankscopeResult, NS_PER_MS};
use serde::Serialize;

use crate::diffs::FrameDiffSample;
use crate::events::{TouchKind, TouchScreenEvent};
use crate::grid::GridProfile;

/// One localized-diff measurement within a sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalDiffSample {
    /// Mean area-corrected value over the neighborhood.
    pub diff: f64,
    /// The same sum normalized to a whole-screen percent.
    pub global_diff: f64,
}

/// One diff sample recorded inside a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDiffSample {
    /// Producer timestamp (ms).
    pub timestamp: i64,
    pub local_diff1: LocalDiffSample,
    pub local_diff4: LocalDiffSample,
    pub local_diff8: LocalDiffSample,
    /// Whole-screen percent diff of the sample.
    pub global_diff: f64,
    /// Number of changed regions.
    pub num_changes: usize,
}

/// One gesture window: the gesture's events in order plus the diff samples
/// observed inside it.
#[derive(Debug, Clone, Serialize)]
pub struct InputDiffEvent {
    pub event_detail: Vec<TouchScreenEvent>,
    /// True when the window was closed early by the next gesture.
    pub eclipsed: bool,
    pub diffs: Vec<InputDiffSample>,

    #[serde(skip)]
    complete: bool,
}

/// Tracks the single open window; only one can be active at a time.
pub struct InputDiffTracker {
    config: InputDiffConfig,
    profile: GridProfile,
    cur: Option<InputDiffEvent>,
}

impl InputDiffTracker {
    pub fn new(config: InputDiffConfig, profile: GridProfile) -> Self {
        Self {
            config,
            profile,
            cur: None,
        }
    }

    fn qualifies(&self, kind: TouchKind) -> bool {
        match kind {
            TouchKind::Tap => self.config.do_taps,
            TouchKind::Key => self.config.do_keys,
            TouchKind::ScrollStart => self.config.do_scrolls,
            _ => false,
        }
    }

    /// Feed a gesture; possibly emits the eclipsed previous window.
    pub fn on_touch_event(&mut self, event: &TouchScreenEvent) -> Option<InputDiffEvent> {
        let mut emitted = None;

        if let Some(cur) = self.cur.as_mut() {
            if cur.complete {
                // Any new input cuts the window short.
                cur.eclipsed = true;
                emitted = self.cur.take();
            } else {
                // An incomplete window is always a scroll in progress.
                match event.kind {
                    TouchKind::Scroll => {
                        cur.event_detail.push(event.clone());
                    }
                    TouchKind::ScrollEnd => {
                        cur.event_detail.push(event.clone());
                        cur.complete = true;
                    }
                    _ => {
                        // A non-scroll event inside an unfinished scroll:
                        // the gesture stream is off the rails, drop the
                        // window.
                        tracing::warn!(kind = ?event.kind, "Discarding unfinished scroll window");
                        self.cur = None;
                    }
                }
            }
        }

        if self.cur.is_none() && self.qualifies(event.kind) {
            self.cur = Some(InputDiffEvent {
                event_detail: vec![event.clone()],
                eclipsed: false,
                diffs: Vec::new(),
                complete: event.kind != TouchKind::ScrollStart,
            });
        }

        emitted
    }

    /// Feed a diff sample; possibly emits the expired window.
    pub fn on_frame_diff(
        &mut self,
        sample: &mut FrameDiffSample,
    ) -> JankscopeResult<Option<InputDiffEvent>> {
        let Some(cur) = self.cur.as_mut() else {
            return Ok(None);
        };

        let detail = cur
            .event_detail
            .last()
            .expect("windows always hold their opening event");
        let (x, y) = (detail.x, detail.y);
        let diff_ts_ms = sample.diff.timestamp_ms;
        let event_ts_ms = detail.timestamp_ns / NS_PER_MS;

        if diff_ts_ms - event_ts_ms > self.config.diff_duration_ms && cur.complete {
            return Ok(self.cur.take());
        }
        let mut at = |conn: Connectivity| -> JankscopeResult<LocalDiffSample> {
            let (diff, global_diff) = sample.local_diff(&self.profile, conn, x, y)?;
            Ok(LocalDiffSample { diff, global_diff })
        };

        let record = InputDiffSample {
            timestamp: diff_ts_ms,
            local_diff1: at(Connectivity::One)?,
            local_diff4: at(Connectivity::Four)?,
            local_diff8: at(Connectivity::Eight)?,
            global_diff: sample.diff.pct_diff,
            num_changes: sample.diff.grid_entries.len(),
        };
        cur.diffs.push(record);
        Ok(None)
    }

    /// End of stream: emit the window still in flight, if any.
    pub fn finish(&mut self) -> Option<InputDiffEvent> {
        self.cur.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::QUAD_HD_PROFILE;
    use jankscope_log_model::surfaceflinger::{FrameDiff, GridEntry};

    fn event(kind: TouchKind, ts_ms: i64, x: f64, y: f64) -> TouchScreenEvent {
        TouchScreenEvent {
            kind,
            timestamp_ns: ts_ms * NS_PER_MS,
            trace_time: 0.0,
            x,
            y,
            code: 0,
        }
    }

    fn sample(ts_ms: i64, pct: f64, entries: &[(i32, f64)]) -> FrameDiffSample {
        FrameDiffSample::new(
            FrameDiff {
                timestamp_ms: ts_ms,
                pct_diff: pct,
                mode: 0,
                has_color: 0,
                grid_wh: 8,
                grid_entries: entries
                    .iter()
                    .map(|&(position, value)| GridEntry { position, value })
                    .collect(),
            },
            false,
            0.0,
        )
    }

    fn tap_tracker() -> InputDiffTracker {
        InputDiffTracker::new(
            InputDiffConfig {
                do_taps: true,
                ..Default::default()
            },
            QUAD_HD_PROFILE,
        )
    }

    #[test]
    fn test_tap_window_collects_samples_then_expires() {
        let mut tracker = tap_tracker();
        assert!(tracker
            .on_touch_event(&event(TouchKind::Tap, 100, 0.0, 0.0))
            .is_none());

        let mut inside = sample(2000, 1.0, &[(56, 50.0)]);
        assert!(tracker.on_frame_diff(&mut inside).unwrap().is_none());

        // Past the 5000 ms window: the window is emitted un-eclipsed.
        let mut outside = sample(5200, 1.0, &[(56, 50.0)]);
        let window = tracker.on_frame_diff(&mut outside).unwrap().unwrap();
        assert!(!window.eclipsed);
        assert_eq!(window.diffs.len(), 1);
        assert_eq!(window.diffs[0].timestamp, 2000);
        assert_eq!(window.diffs[0].num_changes, 1);
        // One-connected at the tap point sees the full cell value.
        assert_eq!(window.diffs[0].local_diff1.diff, 50.0);
        assert!((window.diffs[0].local_diff4.diff - 50.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_new_tap_eclipses_open_window() {
        let mut tracker = tap_tracker();
        tracker.on_touch_event(&event(TouchKind::Tap, 100, 0.0, 0.0));

        let window = tracker
            .on_touch_event(&event(TouchKind::Tap, 600, 0.0, 0.0))
            .unwrap();
        assert!(window.eclipsed);
        assert!(window.diffs.is_empty());

        // The second tap opened a fresh window.
        assert!(tracker.finish().is_some());
    }

    #[test]
    fn test_scroll_window_stays_open_until_scroll_end() {
        let mut tracker = InputDiffTracker::new(
            InputDiffConfig {
                do_scrolls: true,
                diff_duration_ms: 1000,
                ..Default::default()
            },
            QUAD_HD_PROFILE,
        );

        tracker.on_touch_event(&event(TouchKind::ScrollStart, 100, 0.0, 0.0));
        tracker.on_touch_event(&event(TouchKind::Scroll, 400, 0.0, 300.0));

        // Way past diff_duration, but the scroll hasn't ended: keep
        // collecting (localized against the latest gesture position).
        let mut inside = sample(4000, 1.0, &[(40, 25.0)]);
        assert!(tracker.on_frame_diff(&mut inside).unwrap().is_none());

        tracker.on_touch_event(&event(TouchKind::ScrollEnd, 4500, 0.0, 600.0));

        // Now the duration clock runs from the scroll end.
        let mut late = sample(6000, 1.0, &[(40, 25.0)]);
        let window = tracker.on_frame_diff(&mut late).unwrap().unwrap();
        assert_eq!(window.event_detail.len(), 3);
        assert_eq!(window.diffs.len(), 1);
        assert_eq!(window.diffs[0].timestamp, 4000);
    }

    #[test]
    fn test_non_scroll_event_discards_unfinished_scroll_window() {
        let mut tracker = InputDiffTracker::new(
            InputDiffConfig {
                do_scrolls: true,
                do_taps: true,
                ..Default::default()
            },
            QUAD_HD_PROFILE,
        );

        tracker.on_touch_event(&event(TouchKind::ScrollStart, 100, 0.0, 0.0));
        // A tap arriving mid-scroll is a broken sequence: the scroll window
        // is discarded, and the tap opens its own.
        assert!(tracker
            .on_touch_event(&event(TouchKind::Tap, 300, 0.0, 0.0))
            .is_none());

        let window = tracker.finish().unwrap();
        assert_eq!(window.event_detail[0].kind, TouchKind::Tap);
    }

    #[test]
    fn test_non_qualifying_events_do_not_open_windows() {
        let mut tracker = tap_tracker();
        tracker.on_touch_event(&event(TouchKind::ScrollStart, 100, 0.0, 0.0));
        assert!(tracker.finish().is_none());
    }

    #[test]
    fn test_finish_flushes_open_window() {
        let mut tracker = tap_tracker();
        tracker.on_touch_event(&event(TouchKind::Tap, 100, 0.0, 0.0));
        let mut inside = sample(300, 1.0, &[(56, 10.0)]);
        tracker.on_frame_diff(&mut inside).unwrap();

        let window = tracker.finish().unwrap();
        assert!(!window.eclipsed);
        assert_eq!(window.diffs.len(), 1);
        assert!(tracker.finish().is_none());
    }
}
