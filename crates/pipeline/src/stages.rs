//! The per-source stage chain and measurement sinks.

use std::sync::Arc;

use jankscope_analysis::diffs::FrameDiffEmitter;
use jankscope_analysis::events::{PipelineEvent, TimeSyncMark};
use jankscope_analysis::gestures::GestureDetector;
use jankscope_analysis::grid::QUAD_HD_PROFILE;
use jankscope_analysis::inputdiffs::InputDiffTracker;
use jankscope_analysis::ism::InputStateMachine;
use jankscope_analysis::refresh::FrameRefreshEmitter;
use jankscope_analysis::spinners::{make_classifier, SpinnerCollectorOutput, SpinnerStitcher};
use jankscope_analysis::timesync::ClockSkewTracker;
use jankscope_common::{AnalysisConfig, JankscopeResult};
use jankscope_log_model::{LogRecord, ParsedPayload};
use tokio::sync::mpsc;

use crate::collector::{AnalysisRecord, Collector};

/// Bound on every inter-stage channel; a fast stage suspends here when its
/// consumer falls behind.
pub const CHANNEL_CAPACITY: usize = 256;

/// What flows between the skew stage and the unify stage.
#[derive(Debug)]
pub enum SourceItem {
    Record(LogRecord),
    Sync(TimeSyncMark),
}

/// Watches FPS records for clock skew; everything passes through, with a
/// [`TimeSyncMark`] slipped in ahead of the record whenever the offset
/// moves.
pub async fn skew_stage(
    mut rx: mpsc::Receiver<LogRecord>,
    tx: mpsc::Sender<SourceItem>,
) -> JankscopeResult<()> {
    let mut tracker = ClockSkewTracker::new();

    while let Some(record) = rx.recv().await {
        if let ParsedPayload::SfFps(fps) = &record.payload {
            if let Some(mark) = tracker.observe(record.line.trace_time, fps) {
                if tx.send(SourceItem::Sync(mark)).await.is_err() {
                    return Ok(());
                }
            }
        }
        if tx.send(SourceItem::Record(record)).await.is_err() {
            return Ok(());
        }
    }
    Ok(())
}

/// Deliver one merged-stream event to every sink.
///
/// A sink that already failed surfaces its own error; the stream keeps
/// flowing to the others.
async fn fan_out(sinks: &[mpsc::Sender<PipelineEvent>], event: PipelineEvent) {
    for sink in sinks {
        let _ = sink.send(event.clone()).await;
    }
}

/// Turns the record stream into the causally-merged measurement stream:
/// gestures from input records, diff samples from diff batches, refresh
/// events from frame-times batches. Order in equals order out.
pub async fn unify_stage(
    mut rx: mpsc::Receiver<SourceItem>,
    sinks: Vec<mpsc::Sender<PipelineEvent>>,
    interlace_ms: i64,
) -> JankscopeResult<()> {
    let mut detector = GestureDetector::default();
    let mut diff_emitter = FrameDiffEmitter::new(interlace_ms);
    let mut refresh_emitter = FrameRefreshEmitter::new();

    while let Some(item) = rx.recv().await {
        match item {
            SourceItem::Sync(mark) => {
                diff_emitter.on_time_sync(&mark);
                refresh_emitter.on_time_sync(&mark);
            }

            SourceItem::Record(record) => match &record.payload {
                ParsedPayload::SfFrameDiffs(batch) => {
                    for sample in diff_emitter.on_record(batch) {
                        fan_out(&sinks, PipelineEvent::Diff(sample)).await;
                    }
                }
                ParsedPayload::SfFrameTimes(batch) => {
                    for refresh in refresh_emitter.on_record(batch) {
                        fan_out(&sinks, PipelineEvent::Refresh(refresh)).await;
                    }
                }
                ParsedPayload::Motion(motion) => {
                    match detector.on_motion_event(record.line.trace_time, motion) {
                        Ok(Some(event)) => fan_out(&sinks, PipelineEvent::Touch(event)).await,
                        Ok(None) => {}
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            tracing::warn!(error = %e, "Abandoned gesture");
                        }
                    }
                }
                ParsedPayload::Key(key) => {
                    if let Some(event) = detector.on_key_event(record.line.trace_time, key) {
                        fan_out(&sinks, PipelineEvent::Touch(event)).await;
                    }
                }
                // Skew already consumed upstream; lifecycle markers have no
                // consumer yet.
                ParsedPayload::SfFps(_) | ParsedPayload::ImsLifeCycle(_) => {}
            },
        }
    }
    Ok(())
}

/// Measurement sink: the input state machine.
pub async fn ism_sink(
    mut rx: mpsc::Receiver<PipelineEvent>,
    config: AnalysisConfig,
    collector: Arc<Collector>,
) -> JankscopeResult<()> {
    let mut ism = InputStateMachine::new(config.ism, QUAD_HD_PROFILE);

    while let Some(event) = rx.recv().await {
        let finished = match event {
            PipelineEvent::Touch(touch) => ism.on_touch_event(&touch),
            PipelineEvent::Diff(mut diff) => ism.on_frame_diff(&mut diff)?,
            PipelineEvent::Refresh(refresh) => {
                ism.on_frame_refresh(&refresh);
                None
            }
        };
        if let Some(result) = finished {
            collector.push(AnalysisRecord::InputEventResult(result));
        }
    }

    if let Some(result) = ism.finish() {
        collector.push(AnalysisRecord::InputEventResult(result));
    }
    Ok(())
}

/// Measurement sink: per-gesture diff windows.
pub async fn input_diff_sink(
    mut rx: mpsc::Receiver<PipelineEvent>,
    config: AnalysisConfig,
    collector: Arc<Collector>,
) -> JankscopeResult<()> {
    let mut tracker = InputDiffTracker::new(config.input_diff, QUAD_HD_PROFILE);

    while let Some(event) = rx.recv().await {
        let window = match event {
            PipelineEvent::Touch(touch) => tracker.on_touch_event(&touch),
            PipelineEvent::Diff(mut diff) => tracker.on_frame_diff(&mut diff)?,
            PipelineEvent::Refresh(_) => None,
        };
        if let Some(window) = window {
            collector.push(AnalysisRecord::InputDiffEvent(window));
        }
    }

    if let Some(window) = tracker.finish() {
        collector.push(AnalysisRecord::InputDiffEvent(window));
    }
    Ok(())
}

/// Measurement sink: spinner classification, stitching, and collection.
///
/// With `collect` set, everything is buffered into one
/// [`SpinnerCollectorOutput`] per source; otherwise spinners stream out
/// individually as they finish.
pub async fn spinner_sink(
    mut rx: mpsc::Receiver<PipelineEvent>,
    config: AnalysisConfig,
    source: String,
    collect: bool,
    collector: Arc<Collector>,
) -> JankscopeResult<()> {
    let mut algo = make_classifier(&config.spinner, config.time_base)?;
    let mut stitcher = SpinnerStitcher::new(config.spinner.stitch_interval_ms);
    let mut collected = Vec::new();

    let sink_one = |spinner, collected: &mut Vec<_>| {
        if collect {
            collected.push(spinner);
        } else {
            collector.push(AnalysisRecord::Spinner(spinner));
        }
    };

    while let Some(event) = rx.recv().await {
        let PipelineEvent::Diff(diff) = event else {
            continue;
        };
        if let Some(spinner) = algo.on_frame_diff(&diff) {
            for stitched in stitcher.on_spinner(spinner) {
                sink_one(stitched, &mut collected);
            }
        }
    }

    if let Some(pending) = stitcher.finish() {
        sink_one(pending, &mut collected);
    }

    if collect {
        collector.push(AnalysisRecord::SpinnerCollection(SpinnerCollectorOutput {
            file: source,
            conf: config.spinner,
            spinners: collected,
        }));
    }
    Ok(())
}
