//! Frame-diff sample emission.
//!
//! Unpacks batched diff records into a flat sample stream. SurfaceFlinger
//! doesn't swap buffers while the screen is static, so the producer emits
//! nothing during idle stretches; the optional interlacer closes those gaps
//! with synthetic 0.00% samples so downstream algorithms can tell "no
//! response" from "no data".

use jankscope_common::{
    adjust_timestamp_ms_to_s, JankscopeResult, TimeBase, MS_PER_SEC_F, NS_PER_MS,
};
use jankscope_log_model::surfaceflinger::{FrameDiff, FrameDiffRecord};
use serde::Serialize;

use crate::events::TimeSyncMark;
use crate::grid::{GridProfile, ScreenGrid};

/// One frame-diff flowing through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct FrameDiffSample {
    #[serde(flatten)]
    pub diff: FrameDiff,

    /// True for synthetic zero samples added by the interlacer.
    pub inserted: bool,

    /// Skew-adjusted trace-clock timestamp (s).
    pub trace_time_adj: f64,

    #[serde(skip)]
    grid: Option<ScreenGrid>,
}

impl FrameDiffSample {
    pub fn new(diff: FrameDiff, inserted: bool, trace_time_adj: f64) -> Self {
        Self {
            diff,
            inserted,
            trace_time_adj,
            grid: None,
        }
    }

    /// Producer timestamp in nanoseconds.
    pub fn timestamp_ns(&self) -> i64 {
        self.diff.timestamp_ms * NS_PER_MS
    }

    pub fn monotonic_timestamp(&self, time_base: TimeBase) -> f64 {
        match time_base {
            TimeBase::SysTime => self.diff.timestamp_ms as f64 / MS_PER_SEC_F,
            TimeBase::TraceTime => self.trace_time_adj,
        }
    }

    /// The sample's entries projected onto the profile grid, bound on first
    /// use.
    pub fn screen_grid(&mut self, profile: &GridProfile) -> JankscopeResult<&ScreenGrid> {
        if self.grid.is_none() {
            self.grid = Some(ScreenGrid::from_entries(profile, &self.diff.grid_entries)?);
        }
        Ok(self.grid.as_ref().expect("grid just bound"))
    }

    /// Localized diff around `(x, y)`; see [`ScreenGrid::local_diff`].
    pub fn local_diff(
        &mut self,
        profile: &GridProfile,
        connectivity: jankscope_common::Connectivity,
        x: f64,
        y: f64,
    ) -> JankscopeResult<(f64, f64)> {
        self.screen_grid(profile)?.local_diff(connectivity, x, y)
    }
}

/// Unpacks batched diff records into [`FrameDiffSample`]s.
#[derive(Debug)]
pub struct FrameDiffEmitter {
    interlace_zeros_ms: i64,

    cur_offset_ms: i64,
    prev_token: i64,
    last_ts_ms: i64,
    prev_diff: Option<FrameDiff>,
}

impl FrameDiffEmitter {
    /// `interlace_zeros_ms = 0` disables interlacing, making this an
    /// identity unpacker (modulo trace-time adjustment).
    pub fn new(interlace_zeros_ms: i64) -> Self {
        Self {
            interlace_zeros_ms,
            cur_offset_ms: 0,
            prev_token: -1,
            last_ts_ms: 0,
            prev_diff: None,
        }
    }

    /// Pick up a new clock-skew offset.
    pub fn on_time_sync(&mut self, mark: &TimeSyncMark) {
        self.cur_offset_ms = mark.offset_ns / NS_PER_MS;
    }

    /// Unpack one record into samples, in timeline order.
    pub fn on_record(&mut self, record: &FrameDiffRecord) -> Vec<FrameDiffSample> {
        if self.prev_token >= 0 && self.prev_token + 1 != record.token {
            tracing::warn!(
                prev = self.prev_token,
                new = record.token,
                "Missing frame-diff tokens"
            );
        }
        self.prev_token = record.token;

        let mut out = Vec::with_capacity(record.diffs.len());
        for diff in &record.diffs {
            if self.interlace_zeros_ms > 0 {
                self.interlace_gap(diff.timestamp_ms, &mut out);
            }

            self.last_ts_ms = diff.timestamp_ms;
            out.push(FrameDiffSample::new(
                diff.clone(),
                false,
                adjust_timestamp_ms_to_s(diff.timestamp_ms, self.cur_offset_ms),
            ));
            self.prev_diff = Some(diff.clone());
        }
        out
    }

    /// Fill a gap before `next_ts_ms` with synthetic zero samples. Each
    /// inherits mode/color from the last real diff and carries no grid
    /// entries.
    fn interlace_gap(&mut self, next_ts_ms: i64, out: &mut Vec<FrameDiffSample>) {
        let Some(prev) = self.prev_diff.as_ref() else {
            return;
        };

        while self.last_ts_ms > 0 && next_ts_ms - self.last_ts_ms > 2 * self.interlace_zeros_ms {
            let ts_ms = self.last_ts_ms + self.interlace_zeros_ms;
            out.push(FrameDiffSample::new(
                FrameDiff {
                    timestamp_ms: ts_ms,
                    pct_diff: 0.0,
                    mode: prev.mode,
                    has_color: prev.has_color,
                    grid_wh: 0,
                    grid_entries: Vec::new(),
                },
                true,
                adjust_timestamp_ms_to_s(ts_ms, self.cur_offset_ms),
            ));
            self.last_ts_ms = ts_ms;
        }
    }
}
