//! InputDispatcher payload records: motion and key events.

use serde::{Deserialize, Serialize};

// Motion action encoding. The low byte is the action; for non-primary
// pointers the pointer index is baked into the second byte.
pub const ACTION_MASK: i32 = 0xff;
pub const ACTION_POINTER_INDEX_MASK: i32 = 0xff00;
pub const ACTION_POINTER_INDEX_SHIFT: i32 = 8;

pub const ACTION_DOWN: i32 = 0;
pub const ACTION_UP: i32 = 1;
pub const ACTION_MOVE: i32 = 2;
pub const ACTION_CANCEL: i32 = 3;
pub const ACTION_POINTER_DOWN: i32 = 5;
pub const ACTION_POINTER_UP: i32 = 6;

pub const KEY_ACTION_DOWN: i32 = 0;
pub const KEY_ACTION_UP: i32 = 1;

// Hard key codes we recognize.
pub const KEYCODE_HOME: i32 = 3;
pub const KEYCODE_BACK: i32 = 4;
pub const KEYCODE_VOLUME_UP: i32 = 24;
pub const KEYCODE_VOLUME_DOWN: i32 = 25;
pub const KEYCODE_POWER: i32 = 26;
pub const KEYCODE_SEARCH: i32 = 84;

/// Per-pointer data carried by a motion event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerData {
    pub id: i32,
    #[serde(rename = "tool", default)]
    pub tool_type: i32,
    #[serde(rename = "x")]
    pub x_pos: f64,
    #[serde(rename = "y")]
    pub y_pos: f64,
    #[serde(rename = "pr", default)]
    pub pressure: f64,
    #[serde(rename = "sz", default)]
    pub size: f64,
    #[serde(rename = "tch_mj", default)]
    pub touch_major: f64,
    #[serde(rename = "tch_mn", default)]
    pub touch_minor: f64,
    #[serde(rename = "tl_mj", default)]
    pub tool_major: f64,
    #[serde(rename = "tl_mn", default)]
    pub tool_minor: f64,
    #[serde(rename = "orient", default)]
    pub orientation: f64,
}

/// A dispatched motion event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionRecord {
    #[serde(default)]
    pub msg: String,
    #[serde(rename = "ts", default)]
    pub timestamp_ns: i64,
    #[serde(rename = "dev", default)]
    pub device_id: i32,
    #[serde(rename = "src", default)]
    pub source: i32,
    #[serde(rename = "pflags", default)]
    pub policy_flags: i32,
    pub action: i32,
    #[serde(rename = "a_btn", default)]
    pub action_button: i32,
    #[serde(default)]
    pub flags: i32,
    #[serde(rename = "meta", default)]
    pub meta_state: i32,
    #[serde(rename = "btn_state", default)]
    pub button_state: i32,
    #[serde(rename = "eflags", default)]
    pub edge_flags: i32,
    #[serde(rename = "x_p", default)]
    pub x_precision: f64,
    #[serde(rename = "y_p", default)]
    pub y_precision: f64,
    #[serde(rename = "dtime", default)]
    pub downtime: i64,
    #[serde(rename = "ptrs", default)]
    pub pointers: Vec<PointerData>,
}

impl MotionRecord {
    /// The action with the pointer index stripped.
    pub fn masked_action(&self) -> i32 {
        self.action & ACTION_MASK
    }

    /// The pointer index baked into the action for non-primary pointers.
    pub fn action_index(&self) -> i32 {
        (self.action & ACTION_POINTER_INDEX_MASK) >> ACTION_POINTER_INDEX_SHIFT
    }
}

/// A dispatched key event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(default)]
    pub msg: String,
    #[serde(rename = "ts", default)]
    pub timestamp_ns: i64,
    #[serde(rename = "dev", default)]
    pub device_id: i32,
    #[serde(rename = "src", default)]
    pub source: i32,
    #[serde(rename = "pflags", default)]
    pub policy_flags: i32,
    pub action: i32,
    #[serde(default)]
    pub flags: i32,
    pub key_code: i32,
    #[serde(default)]
    pub scan_code: i32,
    #[serde(rename = "meta", default)]
    pub meta_state: i32,
    #[serde(rename = "repeat", default)]
    pub repeat_count: i32,
    #[serde(rename = "dtime", default)]
    pub downtime: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_action_strips_pointer_index() {
        let record = MotionRecord {
            action: (1 << ACTION_POINTER_INDEX_SHIFT) | ACTION_POINTER_DOWN,
            ..Default::default()
        };
        assert_eq!(record.masked_action(), ACTION_POINTER_DOWN);
        assert_eq!(record.action_index(), 1);
    }

    #[test]
    fn test_primary_action_has_index_zero() {
        let record = MotionRecord {
            action: ACTION_DOWN,
            ..Default::default()
        };
        assert_eq!(record.masked_action(), ACTION_DOWN);
        assert_eq!(record.action_index(), 0);
    }

    #[test]
    fn test_motion_record_decodes_pointer_array() {
        let payload = r#"{"ts":1000, "action":2, "ptrs":[{"id":0, "x":700.0, "y":200.0, "pr":0.5}, {"id":1, "x":100.0, "y":50.0}]}"#;
        let record: MotionRecord = serde_json::from_str(payload).unwrap();
        assert_eq!(record.timestamp_ns, 1000);
        assert_eq!(record.pointers.len(), 2);
        assert_eq!(record.pointers[0].x_pos, 700.0);
        assert_eq!(record.pointers[1].id, 1);
    }

    #[test]
    fn test_key_record_decodes() {
        let payload = r#"{"ts":5000, "action":1, "key_code":26, "scan_code":116}"#;
        let record: KeyRecord = serde_json::from_str(payload).unwrap();
        assert_eq!(record.action, KEY_ACTION_UP);
        assert_eq!(record.key_code, KEYCODE_POWER);
    }
}
