//! Frame-refresh emission.
//!
//! Unpacks batched screen-refresh timestamp records into individual
//! [`FrameRefreshEvent`]s with the skew offset applied.

use jankscope_common::NS_PER_SEC_F;
use jankscope_log_model::surfaceflinger::FrameTimesRecord;

use crate::events::{FrameRefreshEvent, TimeSyncMark};

#[derive(Debug)]
pub struct FrameRefreshEmitter {
    cur_offset_ns: i64,
    prev_token: i64,
}

impl FrameRefreshEmitter {
    pub fn new() -> Self {
        Self {
            cur_offset_ns: 0,
            prev_token: -1,
        }
    }

    /// Pick up a new clock-skew offset.
    pub fn on_time_sync(&mut self, mark: &TimeSyncMark) {
        self.cur_offset_ns = mark.offset_ns;
    }

    /// Unpack one record into refresh events, in timeline order.
    pub fn on_record(&mut self, record: &FrameTimesRecord) -> Vec<FrameRefreshEvent> {
        if self.prev_token >= 0 && self.prev_token + 1 != record.ft_token {
            tracing::warn!(
                prev = self.prev_token,
                new = record.ft_token,
                "Missing frame-times tokens"
            );
        }
        self.prev_token = record.ft_token;

        record
            .times
            .iter()
            .map(|&sys_time_ns| FrameRefreshEvent {
                sys_time_ns,
                trace_time_adj: (sys_time_ns + self.cur_offset_ns) as f64 / NS_PER_SEC_F,
            })
            .collect()
    }
}

impl Default for FrameRefreshEmitter {
    fn default() -> Self {
        Self::new()
    }
}
