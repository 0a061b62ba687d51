//! InputMethodService lifecycle records.

use serde::{Deserialize, Serialize};

/// IME lifecycle marker (show/hide/start-input and friends).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImsLifeCycleRecord {
    #[serde(rename = "Action", default)]
    pub action: String,
    #[serde(rename = "UpTimeNs", default)]
    pub uptime_ns: i64,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(rename = "uptimeNanos", default)]
    pub uptime_nanos: i64,
}
