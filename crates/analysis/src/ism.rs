//! Input state machine.
//!
//! Consumes the causally-merged stream of touch-screen gestures, frame-diff
//! samples, and screen refreshes, and produces one [`InputEventResult`] per
//! tap or scroll: local-response latency, global-response latency, duration,
//! and jank events.
//!
//! A *local* response is a post-input screen change predominantly confined
//! to the neighborhood of the input coordinate (the button highlight); a
//! *global* response is everything else (content arrival). Results finalize
//! either by UI timeout or by being short-circuited when the next input
//! arrives.

use jankscope_common::{IsmConfig, JankscopeError, JankscopeResult, NS_PER_MS};
use jankscope_log_model::input::KEYCODE_POWER;
use serde::{Deserialize, Serialize};

use crate::diffs::FrameDiffSample;
use crate::events::{FrameRefreshEvent, TouchKind, TouchScreenEvent};
use crate::grid::GridProfile;

/// Sentinel for "no observation yet".
pub const INVALID_RESPONSE_TIME: i64 = -1;

/// One inter-observation interval above the jank threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JankEvent {
    pub timestamp_ns: i64,
    pub jank_amount_ms: i64,
}

/// Start/end of one measured response. Both are [`INVALID_RESPONSE_TIME`]
/// until the first qualifying observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDetail {
    pub start_ns: i64,
    pub end_ns: i64,
}

impl ResponseDetail {
    pub fn new() -> Self {
        Self {
            start_ns: INVALID_RESPONSE_TIME,
            end_ns: INVALID_RESPONSE_TIME,
        }
    }

    pub fn has_response(&self) -> bool {
        self.start_ns != INVALID_RESPONSE_TIME
    }
}

impl Default for ResponseDetail {
    fn default() -> Self {
        Self::new()
    }
}

/// How a result reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishType {
    /// The UI went idle for the configured timeout.
    Timeout,
    /// Another input event (or end of stream) cut the measurement short.
    ShortCircuit,
}

/// The response detail and performance metrics of a single input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEventResult {
    pub event_type: TouchKind,
    pub timestamp_ns: i64,
    pub finish_ns: i64,
    pub finish_type: FinishType,
    pub local_response: ResponseDetail,
    pub global_response: ResponseDetail,
    #[serde(rename = "jank_events")]
    pub jank: Vec<JankEvent>,
    pub scroll_stop_ns: i64,
}

impl InputEventResult {
    fn new(event: &TouchScreenEvent) -> Self {
        Self {
            event_type: event.kind,
            timestamp_ns: event.timestamp_ns,
            finish_ns: INVALID_RESPONSE_TIME,
            finish_type: FinishType::Timeout,
            local_response: ResponseDetail::new(),
            global_response: ResponseDetail::new(),
            jank: Vec::new(),
            scroll_stop_ns: INVALID_RESPONSE_TIME,
        }
    }

    pub fn has_response(&self) -> bool {
        self.local_response.has_response() || self.global_response.has_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IsmState {
    WaitInput,
    WaitResponse,
    MeasureLocal,
    MeasureGlobal,
    MeasureScroll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseType {
    Local,
    Global,
    /// Non-zero diff that qualifies as neither local nor global.
    Neither,
    /// Zero diff.
    None,
}

/// The measurement state machine.
pub struct InputStateMachine {
    params: IsmConfig,
    profile: GridProfile,

    state: IsmState,
    cur_event: Option<TouchScreenEvent>,
    cur_result: Option<InputEventResult>,

    /// Response start carried over from a refresh event when
    /// `use_pending_timestamp` is set.
    pending_start_ns: Option<i64>,

    /// Last classified diff while measuring a scroll.
    scroll_keepalive_ns: i64,

    /// Jank bookkeeping: last diff sample above the filter, last refresh.
    prev_frame_time_ns: i64,
    prev_refresh_ns: i64,

    /// Last refresh seen on the stream, for end-of-stream short-circuits.
    last_refresh_ns: i64,
}

impl InputStateMachine {
    pub fn new(params: IsmConfig, profile: GridProfile) -> Self {
        Self {
            params,
            profile,
            state: IsmState::WaitInput,
            cur_event: None,
            cur_result: None,
            pending_start_ns: None,
            scroll_keepalive_ns: 0,
            prev_frame_time_ns: 0,
            prev_refresh_ns: 0,
            last_refresh_ns: 0,
        }
    }

    /// Update state with a gesture; possibly hands back a finished result.
    pub fn on_touch_event(&mut self, event: &TouchScreenEvent) -> Option<InputEventResult> {
        match event.kind {
            TouchKind::Key => {
                // The power key blanks or wakes the screen, which invalidates
                // any in-flight measurement. Other keys are not ours to track.
                if event.code == KEYCODE_POWER && self.state != IsmState::WaitInput {
                    let result = self.short_circuit(event.timestamp_ns);
                    self.reset();
                    result
                } else {
                    None
                }
            }

            TouchKind::Tap | TouchKind::ScrollStart => {
                let finished = if self.state != IsmState::WaitInput {
                    self.short_circuit(event.timestamp_ns)
                } else {
                    None
                };
                self.reset();
                self.start_waiting_for_response(event);
                finished
            }

            TouchKind::Scroll => None,

            TouchKind::ScrollEnd => {
                if let Some(result) = self.cur_result.as_mut() {
                    result.scroll_stop_ns = event.timestamp_ns;
                }
                None
            }
        }
    }

    /// Update state with a diff sample; possibly hands back a finished
    /// result. Grid errors here mean a malformed record reached the
    /// measurement stage and are fatal.
    pub fn on_frame_diff(
        &mut self,
        diff: &mut FrameDiffSample,
    ) -> JankscopeResult<Option<InputEventResult>> {
        if self.state == IsmState::WaitInput {
            return Ok(None);
        }

        let rt = self.response_type(diff)?;
        let diff_ns = diff.timestamp_ns();

        if self.params.use_pending_timestamp
            && self.state == IsmState::WaitResponse
            && rt == ResponseType::None
        {
            // The screen settled before the response started; whatever
            // refresh we had pinned is stale.
            self.pending_start_ns = None;
        }

        if !self.params.jank_on_frame_update && diff.diff.pct_diff > self.params.jank_filter_value
        {
            self.account_jank(self.prev_frame_time_ns, diff_ns);
            self.prev_frame_time_ns = diff_ns;
        }

        if rt == ResponseType::None {
            return Ok(self.check_timeout(diff_ns));
        }

        match self.state {
            IsmState::WaitInput => unreachable!("handled above"),

            IsmState::WaitResponse => {
                if self.trigger_is_scroll() {
                    self.state = IsmState::MeasureScroll;
                    self.scroll_keepalive_ns = diff_ns;
                } else {
                    match rt {
                        ResponseType::Local => self.start_measuring_local(diff_ns),
                        ResponseType::Global => self.start_measuring_global(diff_ns),
                        ResponseType::Neither => {
                            if !self.params.skip_undefined_response {
                                self.start_measuring_global(diff_ns);
                            }
                        }
                        ResponseType::None => unreachable!("handled above"),
                    }
                }
            }

            IsmState::MeasureLocal => match rt {
                ResponseType::Local => {
                    self.result_mut().local_response.end_ns = diff_ns;
                }
                ResponseType::Global => self.start_measuring_global(diff_ns),
                ResponseType::Neither => {
                    if !self.params.skip_undefined_response {
                        self.start_measuring_global(diff_ns);
                    }
                }
                ResponseType::None => unreachable!("handled above"),
            },

            // Once the response went global it stays global; a late local
            // flicker doesn't flip the state back.
            IsmState::MeasureGlobal => {
                self.result_mut().global_response.end_ns = diff_ns;
            }

            IsmState::MeasureScroll => {
                self.scroll_keepalive_ns = diff_ns;
            }
        }

        Ok(None)
    }

    /// Update state with a screen refresh.
    pub fn on_frame_refresh(&mut self, event: &FrameRefreshEvent) {
        self.last_refresh_ns = event.sys_time_ns;

        if self.state != IsmState::WaitInput {
            if self.params.use_pending_timestamp
                && self.state == IsmState::WaitResponse
                && self.pending_start_ns.is_none()
            {
                self.pending_start_ns = Some(event.sys_time_ns);
            }

            if self.params.jank_on_frame_update
                && matches!(
                    self.state,
                    IsmState::MeasureLocal | IsmState::MeasureGlobal | IsmState::MeasureScroll
                )
            {
                self.account_jank(self.prev_refresh_ns, event.sys_time_ns);
            }
        }

        self.prev_refresh_ns = event.sys_time_ns;
    }

    /// Called at end of stream. A non-idle machine short-circuits at the
    /// last seen refresh timestamp.
    pub fn finish(&mut self) -> Option<InputEventResult> {
        if self.state == IsmState::WaitInput {
            return None;
        }
        let result = self.short_circuit(self.last_refresh_ns);
        self.reset();
        result
    }

    fn trigger_is_scroll(&self) -> bool {
        matches!(
            self.cur_event.as_ref().map(|e| e.kind),
            Some(TouchKind::ScrollStart)
        )
    }

    fn result_mut(&mut self) -> &mut InputEventResult {
        self.cur_result
            .as_mut()
            .expect("a result exists in every non-WaitInput state")
    }

    /// Classify a diff sample relative to the triggering event's coordinate.
    fn response_type(&self, diff: &mut FrameDiffSample) -> JankscopeResult<ResponseType> {
        if diff.diff.pct_diff == 0.0 {
            return Ok(ResponseType::None);
        }

        let event = self
            .cur_event
            .as_ref()
            .ok_or_else(|| JankscopeError::state_machine("classifying diff with no trigger"))?;

        let (local_mean, local_normalized) =
            diff.local_diff(&self.profile, self.params.connectivity, event.x, event.y)?;

        // A non-zero neighborhood that accounts for enough of the total
        // change is a local response; the region-count policy can narrow
        // that further.
        if local_mean > 0.0 {
            let ratio = 100.0 * (local_normalized / diff.diff.pct_diff);
            let regions_ok = self.params.local_response_regions == 0
                || diff.diff.grid_entries.len() <= self.params.local_response_regions;
            if ratio >= self.params.local_response_pct && regions_ok {
                return Ok(ResponseType::Local);
            }
        }

        if diff.diff.pct_diff >= self.params.global_response_pct
            || diff.diff.grid_entries.len() >= self.params.global_response_regions
        {
            return Ok(ResponseType::Global);
        }

        Ok(ResponseType::Neither)
    }

    fn start_measuring_local(&mut self, diff_ns: i64) {
        self.state = IsmState::MeasureLocal;
        let start = self.pending_start_ns.take().unwrap_or(diff_ns);
        let local = &mut self.result_mut().local_response;
        local.start_ns = start;
        local.end_ns = diff_ns;
    }

    fn start_measuring_global(&mut self, diff_ns: i64) {
        self.state = IsmState::MeasureGlobal;
        let start = self.pending_start_ns.take().unwrap_or(diff_ns);
        let global = &mut self.result_mut().global_response;
        global.start_ns = start;
        global.end_ns = diff_ns;
    }

    fn start_waiting_for_response(&mut self, event: &TouchScreenEvent) {
        self.state = IsmState::WaitResponse;
        self.cur_result = Some(InputEventResult::new(event));
        self.cur_event = Some(event.clone());
    }

    /// The idle-window reference for the current state.
    fn timeout_reference_ns(&self) -> i64 {
        match self.state {
            IsmState::WaitInput => 0,
            IsmState::WaitResponse => self
                .cur_result
                .as_ref()
                .map(|r| r.timestamp_ns)
                .unwrap_or(0),
            IsmState::MeasureLocal => self
                .cur_result
                .as_ref()
                .map(|r| r.local_response.end_ns)
                .unwrap_or(0),
            IsmState::MeasureGlobal => self
                .cur_result
                .as_ref()
                .map(|r| r.global_response.end_ns)
                .unwrap_or(0),
            IsmState::MeasureScroll => self.scroll_keepalive_ns,
        }
    }

    fn check_timeout(&mut self, diff_ns: i64) -> Option<InputEventResult> {
        let reference_ns = self.timeout_reference_ns();
        if reference_ns > 0 && (diff_ns - reference_ns) / NS_PER_MS >= self.params.ui_timeout_ms {
            let mut result = self.cur_result.take()?;
            result.finish_type = FinishType::Timeout;
            result.finish_ns = diff_ns;
            self.reset();
            Some(result)
        } else {
            None
        }
    }

    fn account_jank(&mut self, prev_ns: i64, cur_ns: i64) {
        if prev_ns <= 0 {
            return;
        }
        let delta_ms = (cur_ns - prev_ns) / NS_PER_MS;
        if delta_ms >= self.params.jank_threshold_ms {
            if let Some(result) = self.cur_result.as_mut() {
                result.jank.push(JankEvent {
                    timestamp_ns: cur_ns,
                    jank_amount_ms: delta_ms,
                });
            }
        }
    }

    fn short_circuit(&mut self, ts_ns: i64) -> Option<InputEventResult> {
        let mut result = self.cur_result.take()?;
        result.finish_type = FinishType::ShortCircuit;
        result.finish_ns = ts_ns;
        Some(result)
    }

    fn reset(&mut self) {
        self.state = IsmState::WaitInput;
        self.cur_event = None;
        self.cur_result = None;
        self.pending_start_ns = None;
        self.scroll_keepalive_ns = 0;
        self.prev_frame_time_ns = 0;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            IsmState::WaitInput => "wait_input",
            IsmState::WaitResponse => "wait_response",
            IsmState::MeasureLocal => "measure_local",
            IsmState::MeasureGlobal => "measure_global",
            IsmState::MeasureScroll => "measure_scroll",
        }
    }
}
