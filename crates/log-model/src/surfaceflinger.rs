//! SurfaceFlinger payload records.
//!
//! Three payload shapes share the `SurfaceFlinger` tag:
//!
//! - FPS samples: `{"fps":37.8, "tot_frames":84729, "prev_frames":84691, "cur_time":184538788137586, "prev_time":184537784018732}`
//! - Frame-diff batches: `{"token":25, "diffs":[{"ts":30052602, "diff":0.010173, "mode":-1, "color":0, "wh":8, "grid":[{"p":56,"v":50.0}]}, ...]}`
//! - Screen-refresh batches: `{"ft_token":25, "times":[30052602123456, ...]}`
//!
//! Old devices emitted diff batches as heterogeneous two-element arrays
//! (`"diffs":[[184533085, 0.000000], ...]`); that form is still accepted and
//! converted to the modern record.

use jankscope_common::{JankscopeError, JankscopeResult};
use serde::{Deserialize, Serialize};

/// FPS sample. Carries both clocks: the log line's trace timestamp plus the
/// system-monotonic `cur_time`, which makes it the skew surrogate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfFpsRecord {
    pub fps: f64,
    pub tot_frames: i64,
    pub prev_frames: i64,
    /// System-monotonic timestamp (ns).
    pub cur_time: i64,
    pub prev_time: i64,
}

/// A batched frame-diff record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDiffRecord {
    /// Producer-side sequence number, used only for gap detection.
    pub token: i64,
    pub diffs: Vec<FrameDiff>,
}

/// One frame difference sample as the producer reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDiff {
    /// Producer timestamp in milliseconds.
    #[serde(rename = "ts")]
    pub timestamp_ms: i64,

    /// Whole-screen percent change, [0, 100].
    #[serde(rename = "diff")]
    pub pct_diff: f64,

    #[serde(default)]
    pub mode: i32,

    #[serde(rename = "color", default)]
    pub has_color: i32,

    /// Width/height of the producer's square reporting grid.
    #[serde(rename = "wh", default)]
    pub grid_wh: i32,

    /// Per-region change percentages; regions with no change are omitted.
    #[serde(rename = "grid", default)]
    pub grid_entries: Vec<GridEntry>,
}

/// One changed region of the producer grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    /// Raw producer position (lower-left origin, row-major over `wh`).
    #[serde(rename = "p")]
    pub position: i32,

    /// Percent change within the region.
    #[serde(rename = "v")]
    pub value: f64,
}

/// A batched screen-refresh record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTimesRecord {
    pub ft_token: i64,
    /// System-monotonic refresh timestamps (ns).
    pub times: Vec<i64>,
}

/// Parsed SurfaceFlinger payload.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceFlingerRecord {
    Fps(SfFpsRecord),
    FrameDiffs(FrameDiffRecord),
    FrameTimes(FrameTimesRecord),
}

/// Parse a SurfaceFlinger payload, dispatching on its shape.
///
/// Returns `Ok(None)` for payload shapes this parser does not understand;
/// a recognized shape that fails to decode is a parse error.
pub fn parse_surfaceflinger(payload: &str) -> JankscopeResult<Option<SurfaceFlingerRecord>> {
    if payload.contains("{\"fps\":") {
        let record: SfFpsRecord = serde_json::from_str(payload)
            .map_err(|e| JankscopeError::parse(format!("bad fps payload: {e}")))?;
        Ok(Some(SurfaceFlingerRecord::Fps(record)))
    } else if payload.contains("[{\"ts\":") {
        let record: FrameDiffRecord = serde_json::from_str(payload)
            .map_err(|e| JankscopeError::parse(format!("bad frame-diff payload: {e}")))?;
        Ok(Some(SurfaceFlingerRecord::FrameDiffs(record)))
    } else if payload.contains("\"diffs\":[[") {
        Ok(Some(SurfaceFlingerRecord::FrameDiffs(parse_legacy_diffs(
            payload,
        )?)))
    } else if payload.contains("\"ft_token\":") {
        let record: FrameTimesRecord = serde_json::from_str(payload)
            .map_err(|e| JankscopeError::parse(format!("bad frame-times payload: {e}")))?;
        Ok(Some(SurfaceFlingerRecord::FrameTimes(record)))
    } else {
        Ok(None)
    }
}

/// Legacy diff batches: each diff is a `[timestamp, pct]` pair. Tuples make
/// serde enforce the two-element shape, so a row with any other field count
/// is rejected.
#[derive(Debug, Deserialize)]
struct LegacyFrameDiffRecord {
    token: i64,
    diffs: Vec<(i64, f64)>,
}

fn parse_legacy_diffs(payload: &str) -> JankscopeResult<FrameDiffRecord> {
    let legacy: LegacyFrameDiffRecord = serde_json::from_str(payload)
        .map_err(|e| JankscopeError::parse(format!("bad legacy frame-diff payload: {e}")))?;

    Ok(FrameDiffRecord {
        token: legacy.token,
        diffs: legacy
            .diffs
            .into_iter()
            .map(|(timestamp_ms, pct_diff)| FrameDiff {
                timestamp_ms,
                pct_diff,
                mode: 0,
                has_color: 0,
                grid_wh: 0,
                grid_entries: Vec::new(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fps_payload() {
        let payload = r#"{"fps":37.8, "tot_frames":84729, "prev_frames":84691, "cur_time": 184538788137586, "prev_time": 184537784018732}"#;
        let record = parse_surfaceflinger(payload).unwrap().unwrap();

        assert_eq!(
            record,
            SurfaceFlingerRecord::Fps(SfFpsRecord {
                fps: 37.8,
                tot_frames: 84729,
                prev_frames: 84691,
                cur_time: 184538788137586,
                prev_time: 184537784018732,
            })
        );
    }

    #[test]
    fn test_parse_fps_payload_error() {
        assert!(parse_surfaceflinger(r#"{"fps":37.8, ""#).is_err());
    }

    #[test]
    fn test_parse_modern_diffs() {
        let payload = r#"{"token":25, "diffs":[{"ts":30052602, "diff":0.010173, "mode": -1, "color": 0},{"ts":30052668, "diff":0.009833, "mode": -1, "color": 0}]}"#;
        let record = parse_surfaceflinger(payload).unwrap().unwrap();

        let SurfaceFlingerRecord::FrameDiffs(diffs) = record else {
            panic!("expected frame diffs");
        };
        assert_eq!(diffs.token, 25);
        assert_eq!(diffs.diffs.len(), 2);
        assert_eq!(diffs.diffs[0].timestamp_ms, 30052602);
        assert_eq!(diffs.diffs[0].pct_diff, 0.010173);
        assert_eq!(diffs.diffs[0].mode, -1);
        assert!(diffs.diffs[0].grid_entries.is_empty());
    }

    #[test]
    fn test_parse_modern_diffs_with_grid() {
        let payload = r#"{"token":7, "diffs":[{"ts":1000, "diff":1.388, "mode":0, "color":1, "wh":8, "grid":[{"p":56,"v":50.0},{"p":57,"v":25.0}]}]}"#;
        let record = parse_surfaceflinger(payload).unwrap().unwrap();

        let SurfaceFlingerRecord::FrameDiffs(diffs) = record else {
            panic!("expected frame diffs");
        };
        let diff = &diffs.diffs[0];
        assert_eq!(diff.grid_wh, 8);
        assert_eq!(
            diff.grid_entries,
            vec![
                GridEntry {
                    position: 56,
                    value: 50.0
                },
                GridEntry {
                    position: 57,
                    value: 25.0
                },
            ]
        );
    }

    #[test]
    fn test_parse_legacy_diffs() {
        let payload = r#"{"token":1699, "diffs":[[184533085, 0.000000],[184533941, 0.493028],[184533994, 69.184029]]}"#;
        let record = parse_surfaceflinger(payload).unwrap().unwrap();

        let SurfaceFlingerRecord::FrameDiffs(diffs) = record else {
            panic!("expected frame diffs");
        };
        assert_eq!(diffs.token, 1699);
        assert_eq!(diffs.diffs.len(), 3);
        assert_eq!(diffs.diffs[1].timestamp_ms, 184533941);
        assert_eq!(diffs.diffs[1].pct_diff, 0.493028);
        assert_eq!(diffs.diffs[1].mode, 0);
        assert_eq!(diffs.diffs[1].grid_wh, 0);
    }

    #[test]
    fn test_parse_legacy_diffs_wrong_field_count() {
        let payload = r#"{"token":1699, "diffs":[[184533085, 0.000000, "foo"],[184533941, 0.493028]]}"#;
        assert!(parse_surfaceflinger(payload).is_err());
    }

    #[test]
    fn test_parse_legacy_diffs_truncated() {
        let payload = r#"{"token":1699, "diffs":[[184533085, 0.000000],[184533941, 0.49"#;
        assert!(parse_surfaceflinger(payload).is_err());
    }

    #[test]
    fn test_parse_frame_times() {
        let payload = r#"{"ft_token":12, "times":[184538788137586, 184538804804252]}"#;
        let record = parse_surfaceflinger(payload).unwrap().unwrap();
        assert_eq!(
            record,
            SurfaceFlingerRecord::FrameTimes(FrameTimesRecord {
                ft_token: 12,
                times: vec![184538788137586, 184538804804252],
            })
        );
    }

    #[test]
    fn test_unrecognized_payload_is_skipped() {
        assert_eq!(parse_surfaceflinger("some freeform message").unwrap(), None);
    }
}
