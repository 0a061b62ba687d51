//! Jankscope Analysis Core
//!
//! The interaction-performance analysis pipeline, downstream of parsing:
//!
//! - **Clock-skew tracking:** aligns the jiffy-derived trace clock with the
//!   POSIX monotonic clock so every event lands on one timeline
//! - **Frame-diff emission:** unpacks batched diff records and optionally
//!   interlaces synthetic zero diffs across idle gaps
//! - **Screen grid:** projects gridded diffs onto the device profile and
//!   computes the diff localized around a screen coordinate
//! - **Gesture detection:** reduces raw pointer samples to taps and scrolls
//! - **Input state machine:** measures local/global response latency and
//!   jank per gesture
//! - **Input-diff windowing:** per-gesture windows of localized diff samples
//! - **Spinner classification:** flags sustained small-amplitude animation
//!
//! This crate is pure computation — no I/O, no channels, no platform
//! dependencies. All inputs are data; all outputs are data. The async
//! plumbing lives in `jankscope-pipeline`.

pub mod diffs;
pub mod events;
pub mod gestures;
pub mod grid;
pub mod inputdiffs;
pub mod ism;
pub mod refresh;
pub mod spinners;
pub mod timesync;

pub use diffs::{FrameDiffEmitter, FrameDiffSample};
pub use events::{FrameRefreshEvent, PipelineEvent, TimeSyncMark, TouchKind, TouchScreenEvent};
pub use gestures::GestureDetector;
pub use grid::{GridProfile, ScreenGrid};
pub use ism::{InputEventResult, InputStateMachine};
pub use spinners::{Spinner, SpinnerCollectorOutput};
