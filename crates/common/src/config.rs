//! Analysis configuration.
//!
//! Every tunable the pipeline components read is collected here. Options
//! arrive either from a JSON config file or from a loosely-typed key/value
//! map (the `from_kwargs` path); a wrong-typed or unknown value warns and
//! keeps the default rather than failing the run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::TimeBase;

/// Neighborhood policy for localized-diff computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// The center cell only.
    One,
    /// Center plus the 4 orthogonal neighbors.
    #[default]
    Four,
    /// Center plus all 8 neighbors.
    Eight,
}

impl Connectivity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one" => Some(Connectivity::One),
            "four" => Some(Connectivity::Four),
            "eight" => Some(Connectivity::Eight),
            _ => None,
        }
    }
}

/// Top-level analysis configuration, grouped by component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Synthetic zero-diff interlacing interval in ms (0 disables).
    #[serde(default)]
    pub interlace_ms: i64,

    #[serde(default)]
    pub ism: IsmConfig,

    #[serde(default)]
    pub input_diff: InputDiffConfig,

    #[serde(default)]
    pub spinner: SpinnerConfig,

    /// Which clock domain samples report from `monotonic_timestamp`.
    #[serde(skip)]
    pub time_base: TimeBase,
}

/// Input state machine parameters. These control what we consider local vs.
/// global response, jankiness, timeouts, etc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsmConfig {
    /// Consecutive observation delta at or above this is jank (ms).
    pub jank_threshold_ms: i64,

    /// Diff samples at or below this percent change skip jank accounting.
    pub jank_filter_value: f64,

    /// Minimum localized share of the total diff to classify local (%).
    pub local_response_pct: f64,

    /// If >0, local also requires grid-entry count at or below this.
    pub local_response_regions: usize,

    /// Minimum total percent diff to classify global.
    pub global_response_pct: f64,

    /// Grid-entry count alternative for classifying global.
    pub global_response_regions: usize,

    /// Idle window after which the current result finalizes as a timeout (ms).
    pub ui_timeout_ms: i64,

    /// Neighborhood policy used by the local-diff engine.
    pub connectivity: Connectivity,

    /// Use the latest refresh-event time as the response start instead of
    /// the diff time.
    pub use_pending_timestamp: bool,

    /// While waiting for a response, ignore diffs that are neither local
    /// nor global.
    pub skip_undefined_response: bool,

    /// Sample jank from refresh events instead of diff samples.
    pub jank_on_frame_update: bool,
}

impl Default for IsmConfig {
    fn default() -> Self {
        Self {
            jank_threshold_ms: 70,
            jank_filter_value: 0.1,
            local_response_pct: 60.0,
            local_response_regions: 0,
            global_response_pct: 20.0,
            global_response_regions: 10,
            ui_timeout_ms: 3000,
            connectivity: Connectivity::Four,
            use_pending_timestamp: false,
            skip_undefined_response: true,
            jank_on_frame_update: false,
        }
    }
}

/// Input-diff windowing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDiffConfig {
    pub do_taps: bool,
    pub do_scrolls: bool,
    pub do_keys: bool,

    /// Window duration after the triggering gesture (ms).
    pub diff_duration_ms: i64,
}

impl Default for InputDiffConfig {
    fn default() -> Self {
        Self {
            do_taps: false,
            do_scrolls: false,
            do_keys: false,
            diff_duration_ms: 5000,
        }
    }
}

/// All spinner algorithm parameters. Not all algorithms use the same
/// parameters, but one struct keeps the config surface simple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinnerConfig {
    /// Classifier name ("naive" or "voting").
    pub algo: String,

    /// Free-form grouping label carried into the collector output.
    pub group: String,

    /// Lower percent-diff bound (exclusive) for a spinner sample.
    pub min: f64,

    /// Upper percent-diff bound (exclusive) for a spinner sample.
    pub max: f64,

    /// Exact-zero diffs do not change the naive classifier state.
    pub ignore_zeros: bool,

    /// Consecutive in-bounds samples needed to enter the spinner state.
    pub votes_in: i32,

    /// Consecutive out-of-bounds samples needed to leave it.
    pub votes_out: i32,

    /// Merge spinners whose gap is below this (ms); 0 disables stitching.
    pub stitch_interval_ms: i64,
}

impl AnalysisConfig {
    /// Load config from a JSON file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, e);
            }
        }
        Self::default()
    }

    /// Assemble a config from a loosely-typed key/value map.
    ///
    /// Key names match the pipeline option vocabulary (`interlace`,
    /// `jank_threshold_ms`, `votesIn`, ...). Values of the wrong type warn
    /// and keep the default.
    pub fn from_kwargs(kwargs: &Value) -> Self {
        let mut config = Self::default();
        let Some(map) = kwargs.as_object() else {
            if !kwargs.is_null() {
                tracing::warn!("Config options must be a JSON object, got {kwargs}");
            }
            return config;
        };

        for (key, value) in map {
            match key.as_str() {
                "interlace" => opt_i64(key, value, &mut config.interlace_ms),
                "do_taps" => opt_bool(key, value, &mut config.input_diff.do_taps),
                "do_scrolls" => opt_bool(key, value, &mut config.input_diff.do_scrolls),
                "do_keys" => opt_bool(key, value, &mut config.input_diff.do_keys),
                "diff_duration_ms" => {
                    opt_i64(key, value, &mut config.input_diff.diff_duration_ms)
                }
                "jank_threshold_ms" => opt_i64(key, value, &mut config.ism.jank_threshold_ms),
                "jank_filter_value" => opt_f64(key, value, &mut config.ism.jank_filter_value),
                "ui_timeout_ms" => opt_i64(key, value, &mut config.ism.ui_timeout_ms),
                "local_resp_pct" => opt_f64(key, value, &mut config.ism.local_response_pct),
                "global_resp_pct" => opt_f64(key, value, &mut config.ism.global_response_pct),
                "local_regions" => opt_usize(key, value, &mut config.ism.local_response_regions),
                "global_regions" => {
                    opt_usize(key, value, &mut config.ism.global_response_regions)
                }
                "use_pending_ts" => opt_bool(key, value, &mut config.ism.use_pending_timestamp),
                "skip_undefined_resp" => {
                    opt_bool(key, value, &mut config.ism.skip_undefined_response)
                }
                "jank_on_frame_update" => {
                    opt_bool(key, value, &mut config.ism.jank_on_frame_update)
                }
                "connectivity" => match value.as_str().and_then(Connectivity::parse) {
                    Some(conn) => config.ism.connectivity = conn,
                    None => {
                        tracing::warn!("Unknown connectivity {value}, using default");
                    }
                },
                "min" => opt_f64(key, value, &mut config.spinner.min),
                "max" => opt_f64(key, value, &mut config.spinner.max),
                "algo" => opt_string(key, value, &mut config.spinner.algo),
                "group" => opt_string(key, value, &mut config.spinner.group),
                "votesIn" => opt_i32(key, value, &mut config.spinner.votes_in),
                "votesOut" => opt_i32(key, value, &mut config.spinner.votes_out),
                "ignoreZeros" => opt_bool(key, value, &mut config.spinner.ignore_zeros),
                "interval" => opt_i64(key, value, &mut config.spinner.stitch_interval_ms),
                "use_sys_time" => {
                    let mut flag = false;
                    opt_bool(key, value, &mut flag);
                    if flag {
                        config.time_base = TimeBase::SysTime;
                    }
                }
                other => {
                    tracing::warn!("Unknown config key '{other}', ignoring");
                }
            }
        }

        config
    }
}

fn opt_bool(key: &str, value: &Value, slot: &mut bool) {
    match value.as_bool() {
        Some(v) => *slot = v,
        None => warn_type(key, value, "bool"),
    }
}

fn opt_i64(key: &str, value: &Value, slot: &mut i64) {
    match value.as_i64() {
        Some(v) => *slot = v,
        None => warn_type(key, value, "integer"),
    }
}

fn opt_i32(key: &str, value: &Value, slot: &mut i32) {
    match value.as_i64() {
        Some(v) => *slot = v as i32,
        None => warn_type(key, value, "integer"),
    }
}

fn opt_usize(key: &str, value: &Value, slot: &mut usize) {
    match value.as_u64() {
        Some(v) => *slot = v as usize,
        None => warn_type(key, value, "non-negative integer"),
    }
}

// Integers are accepted where a float is expected; yaml-derived maps often
// carry `min: 1` for `min: 1.0`.
fn opt_f64(key: &str, value: &Value, slot: &mut f64) {
    match value.as_f64() {
        Some(v) => *slot = v,
        None => warn_type(key, value, "number"),
    }
}

fn opt_string(key: &str, value: &Value, slot: &mut String) {
    match value.as_str() {
        Some(v) => *slot = v.to_string(),
        None => warn_type(key, value, "string"),
    }
}

fn warn_type(key: &str, value: &Value, expected: &str) {
    if value.is_null() {
        return;
    }
    tracing::warn!("Wrong type for '{key}' (expected {expected}, got {value}), using default");
}
