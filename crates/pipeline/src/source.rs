//! Log-file reading and record extraction.

use std::path::Path;

use jankscope_log_model::{parse_payload, LogLine, LogRecord};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use jankscope_common::JankscopeResult;

/// Read a log file and feed parsed records downstream.
///
/// Lines that fail to tokenize, carry unknown tags, or fail payload decode
/// are dropped with a warning; a bad record never stops the source.
pub async fn read_records(
    path: &Path,
    tx: mpsc::Sender<LogRecord>,
) -> JankscopeResult<SourceStats> {
    let source = path.display().to_string();
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut stats = SourceStats::default();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        let parsed = match LogLine::parse(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                stats.dropped += 1;
                tracing::warn!(source = %source, error = %e, "Dropping unparseable line");
                continue;
            }
        };

        match parse_payload(&parsed) {
            Ok(Some(payload)) => {
                stats.records += 1;
                if tx
                    .send(LogRecord {
                        line: parsed,
                        payload,
                    })
                    .await
                    .is_err()
                {
                    // Downstream hung up; nothing left to feed.
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                stats.dropped += 1;
                tracing::warn!(source = %source, error = %e, "Dropping undecodable record");
            }
        }
    }

    tracing::debug!(
        source = %source,
        lines = stats.lines,
        records = stats.records,
        dropped = stats.dropped,
        "Source exhausted"
    );
    Ok(stats)
}

/// Counters for one source read.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceStats {
    pub lines: u64,
    pub records: u64,
    pub dropped: u64,
}
