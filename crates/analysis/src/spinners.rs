//! Spinner classification.
//!
//! A spinner is a sustained interval of small-amplitude animation, used as a
//! proxy for loading. Two classifiers run over the diff stream: a naive
//! per-sample one and a voting one that needs N consecutive agreeing samples
//! to change its mind. A stitcher can coalesce spinners separated by short
//! gaps, and a collector buffers everything a source produced.

use jankscope_common::{JankscopeError, JankscopeResult, SpinnerConfig, TimeBase};
use serde::{Deserialize, Serialize};

use crate::diffs::FrameDiffSample;

/// One confirmed spinner interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spinner {
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub duration_ms: i64,

    pub trace_time_start: f64,
    pub trace_time_end: f64,
}

impl Spinner {
    pub fn monotonic_timestamp(&self) -> f64 {
        self.trace_time_start
    }

    /// Extend this spinner through the end of `other`.
    pub fn append(&mut self, other: &Spinner) {
        self.end_time_ms = other.end_time_ms;
        self.trace_time_end = other.trace_time_end;
        self.duration_ms = self.end_time_ms - self.start_time_ms;
    }
}

/// A spinner classifier over the diff stream.
pub trait SpinnerAlgo: Send {
    /// Feed one sample; emits a spinner when one just ended.
    fn on_frame_diff(&mut self, sample: &FrameDiffSample) -> Option<Spinner>;

    /// Classifier name for logging and the collector output.
    fn name(&self) -> &'static str;
}

/// Build the classifier named in the config.
pub fn make_classifier(
    conf: &SpinnerConfig,
    time_base: TimeBase,
) -> JankscopeResult<Box<dyn SpinnerAlgo>> {
    match conf.algo.as_str() {
        "naive" => Ok(Box::new(NaiveSpinnerAlgo::new(conf.clone(), time_base))),
        "voting" => Ok(Box::new(VotingSpinnerAlgo::new(conf.clone(), time_base))),
        other => Err(JankscopeError::config(format!(
            "unknown spinner algorithm '{other}'"
        ))),
    }
}

/// Common classifier state: whether we're inside a spinner and where it
/// started.
#[derive(Debug, Default)]
struct SpinnerState {
    is_spinner: bool,
    start_ms: i64,
    start_trace: f64,
}

impl SpinnerState {
    fn mark_start(&mut self, sample: &FrameDiffSample, time_base: TimeBase) {
        self.start_ms = sample.diff.timestamp_ms;
        self.start_trace = sample.monotonic_timestamp(time_base);
    }

    fn end_spinner(&self, sample: &FrameDiffSample, time_base: TimeBase) -> Spinner {
        Spinner {
            start_time_ms: self.start_ms,
            end_time_ms: sample.diff.timestamp_ms,
            duration_ms: sample.diff.timestamp_ms - self.start_ms,
            trace_time_start: self.start_trace,
            trace_time_end: sample.monotonic_timestamp(time_base),
        }
    }
}

/// Classifies each sample on its own: inside the (min, max) band means
/// spinning. No memory beyond the current edge.
pub struct NaiveSpinnerAlgo {
    conf: SpinnerConfig,
    time_base: TimeBase,
    state: SpinnerState,
}

impl NaiveSpinnerAlgo {
    pub fn new(conf: SpinnerConfig, time_base: TimeBase) -> Self {
        Self {
            conf,
            time_base,
            state: SpinnerState::default(),
        }
    }
}

impl SpinnerAlgo for NaiveSpinnerAlgo {
    fn on_frame_diff(&mut self, sample: &FrameDiffSample) -> Option<Spinner> {
        let diff = sample.diff.pct_diff;

        // With ignore_zeros, an exactly-0.0 sample freezes the state: the
        // producer skipping frames is not evidence the spinner stopped.
        if diff == 0.0 && self.conf.ignore_zeros {
            return None;
        }

        let is_spinner = diff > self.conf.min && diff < self.conf.max;
        if is_spinner && !self.state.is_spinner {
            self.state.is_spinner = true;
            self.state.mark_start(sample, self.time_base);
            None
        } else if !is_spinner && self.state.is_spinner {
            self.state.is_spinner = false;
            Some(self.state.end_spinner(sample, self.time_base))
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        "naive"
    }
}

/// Needs `votes_in` consecutive in-band samples to call a spinner and
/// `votes_out` consecutive out-of-band samples to call it done.
pub struct VotingSpinnerAlgo {
    conf: SpinnerConfig,
    time_base: TimeBase,
    state: SpinnerState,
    votes_needed: i32,
}

impl VotingSpinnerAlgo {
    pub fn new(conf: SpinnerConfig, time_base: TimeBase) -> Self {
        let votes_needed = conf.votes_in;
        Self {
            conf,
            time_base,
            state: SpinnerState::default(),
            votes_needed,
        }
    }

    fn vote_for(&mut self, sample: &FrameDiffSample) {
        if self.state.is_spinner {
            // Positive reinforcement, reset the exit counter.
            self.votes_needed = self.conf.votes_out;
            return;
        }

        if self.votes_needed == self.conf.votes_in {
            // First accumulating vote: the spinner provisionally starts here.
            self.state.mark_start(sample, self.time_base);
        }

        self.votes_needed -= 1;
        if self.votes_needed <= 0 {
            self.state.is_spinner = true;
            self.votes_needed = self.conf.votes_out;
        }
    }

    fn vote_against(&mut self, sample: &FrameDiffSample) -> Option<Spinner> {
        if !self.state.is_spinner {
            // Negative reinforcement, reset the entry counter.
            self.votes_needed = self.conf.votes_in;
            return None;
        }

        self.votes_needed -= 1;
        if self.votes_needed <= 0 {
            self.state.is_spinner = false;
            self.votes_needed = self.conf.votes_in;
            return Some(self.state.end_spinner(sample, self.time_base));
        }
        None
    }
}

impl SpinnerAlgo for VotingSpinnerAlgo {
    fn on_frame_diff(&mut self, sample: &FrameDiffSample) -> Option<Spinner> {
        let diff = sample.diff.pct_diff;
        if diff > self.conf.min && diff < self.conf.max {
            self.vote_for(sample);
            None
        } else {
            self.vote_against(sample)
        }
    }

    fn name(&self) -> &'static str {
        "voting"
    }
}

/// Merges consecutive spinners separated by less than the stitch interval.
pub struct SpinnerStitcher {
    stitch_interval_ms: i64,
    pending: Option<Spinner>,
}

impl SpinnerStitcher {
    /// `stitch_interval_ms <= 0` makes this a passthrough.
    pub fn new(stitch_interval_ms: i64) -> Self {
        Self {
            stitch_interval_ms,
            pending: None,
        }
    }

    /// Feed one spinner; returns whatever is ready to go downstream.
    pub fn on_spinner(&mut self, spinner: Spinner) -> Vec<Spinner> {
        if self.stitch_interval_ms <= 0 {
            return vec![spinner];
        }

        // Short blips don't participate in stitching; they also flush the
        // pending spinner so ordering is preserved.
        if spinner.duration_ms <= 1000 {
            let mut out = Vec::with_capacity(2);
            if let Some(pending) = self.pending.take() {
                out.push(pending);
            }
            out.push(spinner);
            return out;
        }

        if let Some(pending) = self.pending.as_mut() {
            if spinner.start_time_ms - pending.end_time_ms < self.stitch_interval_ms {
                pending.append(&spinner);
                return vec![];
            }
        }

        // Park the new spinner; whatever it displaced goes downstream.
        match self.pending.replace(spinner) {
            Some(prev) => vec![prev],
            None => vec![],
        }
    }

    /// End of stream: flush the pending spinner.
    pub fn finish(&mut self) -> Option<Spinner> {
        self.pending.take()
    }
}

/// Everything one source produced, with the configuration that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SpinnerCollectorOutput {
    pub file: String,
    pub conf: SpinnerConfig,
    pub spinners: Vec<Spinner>,
}

impl SpinnerCollectorOutput {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
