//! Parallel-by-source pipeline execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jankscope_analysis::events::{PipelineEvent, TouchScreenEvent};
use jankscope_common::{AnalysisConfig, JankscopeError, JankscopeResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collector::Collector;
use crate::source::read_records;
use crate::stages::{
    input_diff_sink, ism_sink, skew_stage, spinner_sink, unify_stage, CHANNEL_CAPACITY,
};

/// Which measurement sinks a pipeline run attaches.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub run_ism: bool,
    pub run_input_diffs: bool,
    pub run_spinners: bool,
    /// Buffer spinners into one collection record per source instead of
    /// streaming them individually.
    pub collect_spinners: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            run_ism: true,
            run_input_diffs: false,
            run_spinners: false,
            collect_spinners: true,
        }
    }
}

/// Run one source through the full stage chain.
///
/// Stages run as tasks over bounded channels; the first fatal stage error
/// terminates this source and is returned with the source identifier
/// attached.
pub async fn run_source(
    path: &Path,
    config: AnalysisConfig,
    options: &PipelineOptions,
    collector: Arc<Collector>,
) -> JankscopeResult<()> {
    let source = path.display().to_string();

    let (record_tx, record_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (item_tx, item_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let mut sink_txs = Vec::new();
    let mut handles: Vec<(&'static str, JoinHandle<JankscopeResult<()>>)> = Vec::new();

    if options.run_ism {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        sink_txs.push(tx);
        handles.push((
            "input-state-machine",
            tokio::spawn(ism_sink(rx, config.clone(), collector.clone())),
        ));
    }
    if options.run_input_diffs {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        sink_txs.push(tx);
        handles.push((
            "input-diffs",
            tokio::spawn(input_diff_sink(rx, config.clone(), collector.clone())),
        ));
    }
    if options.run_spinners {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        sink_txs.push(tx);
        handles.push((
            "spinners",
            tokio::spawn(spinner_sink(
                rx,
                config.clone(),
                source.clone(),
                options.collect_spinners,
                collector.clone(),
            )),
        ));
    }

    let interlace_ms = config.interlace_ms;
    handles.push(("unify", tokio::spawn(unify_stage(item_rx, sink_txs, interlace_ms))));
    handles.push(("clock-skew", tokio::spawn(skew_stage(record_rx, item_tx))));

    let reader_path = path.to_path_buf();
    let reader = tokio::spawn(async move { read_records(&reader_path, record_tx).await });

    let mut failure: Option<JankscopeError> = None;

    match reader.await {
        Ok(Ok(stats)) => {
            tracing::info!(source = %source, records = stats.records, "Source read complete");
        }
        Ok(Err(e)) => failure = Some(e),
        Err(e) => failure = Some(JankscopeError::pipeline(format!("reader panicked: {e}"))),
    }

    for (stage, handle) in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(source = %source, stage, error = %e, "Stage failed");
                failure.get_or_insert(e);
            }
            Err(e) => {
                failure.get_or_insert(JankscopeError::pipeline(format!(
                    "stage {stage} panicked: {e}"
                )));
            }
        }
    }

    match failure {
        Some(e) => Err(JankscopeError::pipeline(format!("{source}: {e}"))),
        None => Ok(()),
    }
}

/// Run many sources concurrently against one collector.
///
/// Returns the per-source failures; an empty list means every file was
/// processed cleanly. One bad file never aborts its peers.
pub async fn run_files(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    options: &PipelineOptions,
    collector: Arc<Collector>,
) -> Vec<(PathBuf, JankscopeError)> {
    let mut tasks = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.clone();
        let config = config.clone();
        let options = options.clone();
        let collector = collector.clone();
        tasks.push(tokio::spawn(async move {
            let outcome = run_source(&path, config, &options, collector).await;
            (path, outcome)
        }));
    }

    let mut failures = Vec::new();
    for task in tasks {
        match task.await {
            Ok((_, Ok(()))) => {}
            Ok((path, Err(e))) => failures.push((path, e)),
            Err(e) => failures.push((
                PathBuf::new(),
                JankscopeError::pipeline(format!("source task panicked: {e}")),
            )),
        }
    }
    failures
}

/// Run the front half of the pipeline only and hand back the detected
/// gesture stream.
pub async fn extract_gestures(path: &Path) -> JankscopeResult<Vec<TouchScreenEvent>> {
    let source = path.display().to_string();

    let (record_tx, record_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (item_tx, item_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (event_tx, mut event_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let unify = tokio::spawn(unify_stage(item_rx, vec![event_tx], 0));
    let skew = tokio::spawn(skew_stage(record_rx, item_tx));
    let reader_path = path.to_path_buf();
    let reader = tokio::spawn(async move { read_records(&reader_path, record_tx).await });

    let mut gestures = Vec::new();
    while let Some(event) = event_rx.recv().await {
        if let PipelineEvent::Touch(touch) = event {
            gestures.push(touch);
        }
    }

    reader
        .await
        .map_err(|e| JankscopeError::pipeline(format!("reader panicked: {e}")))??;
    skew.await
        .map_err(|e| JankscopeError::pipeline(format!("clock-skew stage panicked: {e}")))??;
    unify
        .await
        .map_err(|e| JankscopeError::pipeline(format!("{source}: unify stage panicked: {e}")))?
        .map_err(|e| JankscopeError::pipeline(format!("{source}: {e}")))?;

    Ok(gestures)
}
