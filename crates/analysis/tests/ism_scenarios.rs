//! End-to-end state-machine scenarios: a gesture followed by a scripted
//! diff stream, checked against the exact expected result.

use jankscope_analysis::diffs::FrameDiffSample;
use jankscope_analysis::events::{TouchKind, TouchScreenEvent};
use jankscope_analysis::grid::QUAD_HD_PROFILE;
use jankscope_analysis::ism::{
    FinishType, InputEventResult, InputStateMachine, ResponseDetail, INVALID_RESPONSE_TIME,
};
use jankscope_common::{IsmConfig, NS_PER_MS};
use jankscope_log_model::surfaceflinger::{FrameDiff, GridEntry};

fn tap(ts_ms: i64) -> TouchScreenEvent {
    TouchScreenEvent {
        kind: TouchKind::Tap,
        timestamp_ns: ts_ms * NS_PER_MS,
        trace_time: 0.0,
        x: 0.0,
        y: 0.0,
        code: 0,
    }
}

fn diff(ts_ms: i64, pct: f64, entries: &[(i32, f64)]) -> FrameDiffSample {
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

fn no_response() -> ResponseDetail {
    ResponseDetail {
        start_ns: INVALID_RESPONSE_TIME,
        end_ns: INVALID_RESPONSE_TIME,
    }
}

fn response(start_ms: i64, end_ms: i64) -> ResponseDetail {
    ResponseDetail {
        start_ns: start_ms * NS_PER_MS,
        end_ns: end_ms * NS_PER_MS,
    }
}

/// Runs events[0], then the diff stream until a result pops out, then
/// events[1] if the diffs didn't finish it.
fn run_scenario(
    events: &[TouchScreenEvent],
    diffs: Vec<FrameDiffSample>,
    expected: &InputEventResult,
) {
    // The classic scenario fixtures assume the long timeout; jank checking
    // is effectively off.
    let params = IsmConfig {
        ui_timeout_ms: 5000,
        jank_threshold_ms: 10_000_000,
        ..Default::default()
    };
    let mut ism = InputStateMachine::new(params, QUAD_HD_PROFILE);

    assert!(ism.on_touch_event(&events[0]).is_none());

    let mut finished = None;
    for mut sample in diffs {
        if let Some(result) = ism.on_frame_diff(&mut sample).unwrap() {
            finished = Some(result);
            break;
        }
    }

    let result = finished.unwrap_or_else(|| {
        ism.on_touch_event(&events[1])
            .expect("second event should short-circuit")
    });

    assert_eq!(&result, expected);
}

// Eight full-strength regions across the top of the screen; enough total
// change to be a global response.
fn big_diff_entries() -> Vec<(i32, f64)> {
    vec![
        (56, 100.0),
        (57, 100.0),
        (58, 100.0),
        (59, 100.0),
        (48, 100.0),
        (49, 100.0),
        (50, 100.0),
        (51, 100.0),
    ]
}

#[test]
fn short_circuit_on_second_tap() {
    let events = [tap(100), tap(500)];

    let expected = InputEventResult {
        event_type: TouchKind::Tap,
        timestamp_ns: 100 * NS_PER_MS,
        finish_ns: 500 * NS_PER_MS,
        finish_type: FinishType::ShortCircuit,
        local_response: no_response(),
        global_response: no_response(),
        jank: vec![],
        scroll_stop_ns: INVALID_RESPONSE_TIME,
    };

    run_scenario(&events, vec![], &expected);
}

#[test]
fn local_response_then_timeout() {
    let events = [tap(100)];
    let diffs = vec![
        diff(150, 0.0, &[]),
        diff(200, 0.0, &[]),
        diff(200, 0.0, &[]),
        // Upper-left region only: all of the change is local to the tap.
        diff(250, 100.0 / 72.0, &[(56, 50.0)]),
        diff(300, 100.0 / 72.0, &[(56, 50.0)]),
        // The UI settles...
        diff(3300, 0.0, &[]),
        // ...and this one is past the timeout window.
        diff(6300, 0.0, &[]),
    ];

    let expected = InputEventResult {
        event_type: TouchKind::Tap,
        timestamp_ns: 100 * NS_PER_MS,
        finish_ns: 6300 * NS_PER_MS,
        finish_type: FinishType::Timeout,
        local_response: response(250, 300),
        global_response: no_response(),
        jank: vec![],
        scroll_stop_ns: INVALID_RESPONSE_TIME,
    };

    run_scenario(&events, diffs, &expected);
}

#[test]
fn global_response_then_timeout() {
    let events = [tap(100)];
    let diffs = vec![
        diff(150, 0.0, &[]),
        diff(200, 0.0, &[]),
        diff(200, 0.0, &[]),
        // A large diff across eight regions: global.
        diff(500, (8.0 * 100.0) / 36.0, &big_diff_entries()),
        diff(6000, 0.0, &[]),
    ];

    let expected = InputEventResult {
        event_type: TouchKind::Tap,
        timestamp_ns: 100 * NS_PER_MS,
        finish_ns: 6000 * NS_PER_MS,
        finish_type: FinishType::Timeout,
        local_response: no_response(),
        global_response: response(500, 500),
        jank: vec![],
        scroll_stop_ns: INVALID_RESPONSE_TIME,
    };

    run_scenario(&events, diffs, &expected);
}

#[test]
fn local_then_global_response() {
    let events = [tap(100)];
    let diffs = vec![
        diff(150, 0.0, &[]),
        diff(200, 0.0, &[]),
        diff(200, 0.0, &[]),
        diff(250, 100.0 / 72.0, &[(56, 50.0)]),
        diff(300, 100.0 / 72.0, &[(56, 50.0)]),
        // Quiet, but inside the window measured from the local end.
        diff(3300, 0.0, &[]),
        // Content arrives: the measurement flips to global and stays there.
        diff(6300, (8.0 * 100.0) / 36.0, &big_diff_entries()),
        diff(6400, 100.0 / 36.0, &[(56, 100.0)]),
        diff(11500, 0.0, &[]),
    ];

    let expected = InputEventResult {
        event_type: TouchKind::Tap,
        timestamp_ns: 100 * NS_PER_MS,
        finish_ns: 11500 * NS_PER_MS,
        finish_type: FinishType::Timeout,
        local_response: response(250, 300),
        global_response: response(6300, 6400),
        jank: vec![],
        scroll_stop_ns: INVALID_RESPONSE_TIME,
    };

    run_scenario(&events, diffs, &expected);
}
