//! Device log line tokenizer.
//!
//! Lines look like:
//!
//! ```text
//! 3a45bd43-82d2-4650-8571-039f48c0fdca 2016-12-02 03:03:28.159 453831 [184538.859034]   291   291 I SurfaceFlinger: {"fps":37.8, ...}
//! ```
//!
//! boot id, wall-clock date/time, sequence number, bracketed trace timestamp
//! (seconds since boot on the kernel trace clock), pid, tid, level, tag, and
//! the raw payload.

use jankscope_common::{JankscopeError, JankscopeResult};

/// One tokenized log line. The payload is left unparsed; per-tag parsing
/// happens in [`crate::record::parse_payload`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub boot_id: String,
    pub seq: u64,
    /// Trace-clock timestamp in seconds with fractional nanoseconds.
    pub trace_time: f64,
    pub pid: i32,
    pub tid: i32,
    pub level: char,
    pub tag: String,
    pub payload: String,
}

/// Split the next whitespace-delimited token off the front of `s`.
fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace)?;
    Some((&s[..end], &s[end..]))
}

impl LogLine {
    /// Tokenize a single log line.
    pub fn parse(line: &str) -> JankscopeResult<Self> {
        let bad = |what: &str| JankscopeError::parse(format!("{what} in log line: {line:?}"));

        let (boot_id, rest) = split_token(line).ok_or_else(|| bad("missing boot id"))?;
        let (_date, rest) = split_token(rest).ok_or_else(|| bad("missing date"))?;
        let (_time, rest) = split_token(rest).ok_or_else(|| bad("missing time"))?;

        let (seq_token, rest) = split_token(rest).ok_or_else(|| bad("missing sequence number"))?;
        let seq = seq_token
            .parse::<u64>()
            .map_err(|_| bad("bad sequence number"))?;

        let (trace_token, rest) =
            split_token(rest).ok_or_else(|| bad("missing trace timestamp"))?;
        let trace_time = trace_token
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| bad("bad trace timestamp"))?;

        let (pid_token, rest) = split_token(rest).ok_or_else(|| bad("missing pid"))?;
        let pid = pid_token.parse::<i32>().map_err(|_| bad("bad pid"))?;
        let (tid_token, rest) = split_token(rest).ok_or_else(|| bad("missing tid"))?;
        let tid = tid_token.parse::<i32>().map_err(|_| bad("bad tid"))?;

        let (level_token, rest) = split_token(rest).ok_or_else(|| bad("missing level"))?;
        let level = match level_token.chars().next() {
            Some(c) if level_token.len() == c.len_utf8() => c,
            _ => return Err(bad("bad level")),
        };

        let (tag_token, rest) = split_token(rest).ok_or_else(|| bad("missing tag"))?;
        let tag = tag_token.strip_suffix(':').ok_or_else(|| bad("bad tag"))?;

        let payload = rest.trim();
        if payload.is_empty() {
            return Err(bad("missing payload"));
        }

        Ok(Self {
            boot_id: boot_id.to_string(),
            seq,
            trace_time,
            pid,
            tid,
            level,
            tag: tag.to_string(),
            payload: payload.to_string(),
        })
    }
}
