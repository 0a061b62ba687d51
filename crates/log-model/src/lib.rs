//! Jankscope Log Model
//!
//! Typed records for the device log streams Jankscope consumes:
//!
//! - **SurfaceFlinger:** FPS samples, gridded frame-diff batches (modern and
//!   legacy payload forms), screen-refresh timestamp batches
//! - **InputDispatcher:** motion and key events with masked-action encoding
//! - **InputMethodService:** IME lifecycle markers
//!
//! Plus the log-line tokenizer and the per-tag parse dispatch. Everything
//! here is wire format; analysis semantics live in `jankscope-analysis`.

pub mod ims;
pub mod input;
pub mod line;
pub mod record;
pub mod surfaceflinger;

pub use line::LogLine;
pub use record::{parse_payload, LogRecord, ParsedPayload};
