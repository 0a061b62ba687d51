//! Event types shared across the analysis stages.

use jankscope_common::{TimeBase, NS_PER_SEC_F};
use serde::{Deserialize, Serialize};

use crate::diffs::FrameDiffSample;

/// High-level touch-screen gesture kind.
///
/// Taps and scrolls only for now; no distinction between short and long
/// taps, and no fling or pinch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchKind {
    Key,
    Tap,
    ScrollStart,
    Scroll,
    ScrollEnd,
}

/// One detected gesture (or lifted hard-key press).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchScreenEvent {
    pub kind: TouchKind,
    /// Input-subsystem timestamp (ns).
    pub timestamp_ns: i64,
    /// Trace-clock timestamp of the carrying log line (s).
    pub trace_time: f64,
    /// Gesture focus (multi-pointer centroid) at emission.
    pub x: f64,
    pub y: f64,
    /// Key code for `Key` events, 0 otherwise.
    pub code: i32,
}

impl TouchScreenEvent {
    pub fn monotonic_timestamp(&self) -> f64 {
        self.trace_time
    }
}

/// One screen refresh (buffer swap).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRefreshEvent {
    /// System-monotonic refresh timestamp (ns).
    pub sys_time_ns: i64,
    /// Skew-adjusted trace-clock timestamp (s).
    pub trace_time_adj: f64,
}

impl FrameRefreshEvent {
    pub fn monotonic_timestamp(&self, time_base: TimeBase) -> f64 {
        match time_base {
            TimeBase::SysTime => self.sys_time_ns as f64 / NS_PER_SEC_F,
            TimeBase::TraceTime => self.trace_time_adj,
        }
    }
}

/// Clock-skew observation between the trace clock and the system clock.
///
/// `offset_ns = trace_time_ns - sys_time_ns`; add it to a system timestamp
/// to land on the trace clock. Emitted only when the offset changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSyncMark {
    pub offset_ns: i64,
    pub trace_time_ns: i64,
    pub sys_time_ns: i64,
}

/// The causally-merged stream the measurement sinks consume.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Touch(TouchScreenEvent),
    Diff(FrameDiffSample),
    Refresh(FrameRefreshEvent),
}
