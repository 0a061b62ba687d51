//! Jankscope Pipeline
//!
//! Per-source async pipelines over the analysis core. Each log file runs
//! through its own chain of stages joined by bounded channels:
//!
//! ```text
//! read -> clock skew -> unify (gestures + diffs + refreshes) -> sinks
//! ```
//!
//! Sources run in parallel with no shared mutable state; the only point
//! where they meet is the [`Collector`], which serializes appends behind a
//! mutex. One bad file does not abort its peers.

pub mod collector;
pub mod runner;
pub mod source;
pub mod stages;

pub use collector::{AnalysisRecord, Collector};
pub use runner::{extract_gestures, run_files, run_source, PipelineOptions};
