//! Per-tag parse dispatch and the parsed-record envelope.

use jankscope_common::{JankscopeError, JankscopeResult};

use crate::ims::ImsLifeCycleRecord;
use crate::input::{KeyRecord, MotionRecord};
use crate::line::LogLine;
use crate::surfaceflinger::{parse_surfaceflinger, SurfaceFlingerRecord};

pub const TAG_SURFACEFLINGER: &str = "SurfaceFlinger";
pub const TAG_MOTION_EVENT: &str = "InputDispatcher-MotionEvent";
pub const TAG_KEY_EVENT: &str = "InputDispatcher-KeyEvent";
pub const TAG_IMS_LIFECYCLE: &str = "InputMethodService-LifeCycle-QoE";

/// A parsed payload from any recognized tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    SfFps(crate::surfaceflinger::SfFpsRecord),
    SfFrameDiffs(crate::surfaceflinger::FrameDiffRecord),
    SfFrameTimes(crate::surfaceflinger::FrameTimesRecord),
    Motion(MotionRecord),
    Key(KeyRecord),
    ImsLifeCycle(ImsLifeCycleRecord),
}

/// A parsed record: the tokenized line plus its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub line: LogLine,
    pub payload: ParsedPayload,
}

impl LogRecord {
    /// Trace-clock timestamp of the carrying line, in nanoseconds.
    pub fn trace_time_ns(&self) -> i64 {
        (self.line.trace_time * jankscope_common::NS_PER_SEC_F) as i64
    }
}

/// Parse the payload of a tokenized line.
///
/// Returns `Ok(None)` when the tag is unknown or the payload shape is not
/// one this pipeline consumes; decode failures on recognized shapes are
/// parse errors (the record is dropped, processing continues).
pub fn parse_payload(line: &LogLine) -> JankscopeResult<Option<ParsedPayload>> {
    match line.tag.as_str() {
        TAG_SURFACEFLINGER => Ok(parse_surfaceflinger(&line.payload)?.map(|r| match r {
            SurfaceFlingerRecord::Fps(fps) => ParsedPayload::SfFps(fps),
            SurfaceFlingerRecord::FrameDiffs(diffs) => ParsedPayload::SfFrameDiffs(diffs),
            SurfaceFlingerRecord::FrameTimes(times) => ParsedPayload::SfFrameTimes(times),
        })),
        TAG_MOTION_EVENT => {
            let record: MotionRecord = serde_json::from_str(&line.payload)
                .map_err(|e| JankscopeError::parse(format!("bad motion payload: {e}")))?;
            Ok(Some(ParsedPayload::Motion(record)))
        }
        TAG_KEY_EVENT => {
            let record: KeyRecord = serde_json::from_str(&line.payload)
                .map_err(|e| JankscopeError::parse(format!("bad key payload: {e}")))?;
            Ok(Some(ParsedPayload::Key(record)))
        }
        TAG_IMS_LIFECYCLE => {
            let record: ImsLifeCycleRecord = serde_json::from_str(&line.payload)
                .map_err(|e| JankscopeError::parse(format!("bad lifecycle payload: {e}")))?;
            Ok(Some(ParsedPayload::ImsLifeCycle(record)))
        }
        _ => Ok(None),
    }
}
