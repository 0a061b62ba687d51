//! The cross-source result sink.

use std::path::Path;
use std::sync::Mutex;

use jankscope_analysis::inputdiffs::InputDiffEvent;
use jankscope_analysis::ism::InputEventResult;
use jankscope_analysis::spinners::{Spinner, SpinnerCollectorOutput};
use jankscope_common::JankscopeResult;
use serde::Serialize;

/// Everything the pipeline can emit.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisRecord {
    InputEventResult(InputEventResult),
    Spinner(Spinner),
    SpinnerCollection(SpinnerCollectorOutput),
    InputDiffEvent(InputDiffEvent),
}

/// Buffers records from many source pipelines.
///
/// This is the only place cross-source concurrency meets shared state, so
/// appends are serialized behind a mutex.
#[derive(Debug, Default)]
pub struct Collector {
    records: Mutex<Vec<AnalysisRecord>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: AnalysisRecord) {
        self.records
            .lock()
            .expect("collector mutex poisoned")
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("collector mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything collected so far.
    pub fn drain(&self) -> Vec<AnalysisRecord> {
        std::mem::take(&mut *self.records.lock().expect("collector mutex poisoned"))
    }

    /// Dump the buffer as pretty JSON to a file, or stdout when no path is
    /// given. The buffer is left intact.
    pub fn dump_json(&self, out: Option<&Path>) -> JankscopeResult<()> {
        let records = self.records.lock().expect("collector mutex poisoned");
        let json = serde_json::to_string_pretty(&*records)?;
        drop(records);

        match out {
            Some(path) => std::fs::write(path, json)?,
            None => println!("{json}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jankscope_analysis::spinners::Spinner;

    fn spinner() -> Spinner {
        Spinner {
            start_time_ms: 100,
            end_time_ms: 3000,
            duration_ms: 2900,
            trace_time_start: 0.1,
            trace_time_end: 3.0,
        }
    }

    #[test]
    fn test_push_and_drain() {
        let collector = Collector::new();
        assert!(collector.is_empty());

        collector.push(AnalysisRecord::Spinner(spinner()));
        assert_eq!(collector.len(), 1);

        let records = collector.drain();
        assert_eq!(records.len(), 1);
        assert!(collector.is_empty());
    }

    #[test]
    fn test_records_are_tagged_in_json() {
        let collector = Collector::new();
        collector.push(AnalysisRecord::Spinner(spinner()));

        let records = collector.drain();
        let json = serde_json::to_string(&records).unwrap();
        assert!(json.contains("\"type\":\"spinner\""));
        assert!(json.contains("\"duration_ms\":2900"));
    }

    #[test]
    fn test_concurrent_pushes() {
        let collector = std::sync::Arc::new(Collector::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let collector = collector.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    collector.push(AnalysisRecord::Spinner(spinner()));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(collector.len(), 800);
    }
}
