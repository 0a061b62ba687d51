//! Measure per-gesture response latency and jank.

use std::path::PathBuf;
use std::sync::Arc;

use jankscope_common::{AnalysisConfig, Connectivity};
use jankscope_pipeline::{run_files, Collector, PipelineOptions};

pub struct AnalyzeArgs {
    pub files: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub interlace: i64,
    pub jank_threshold_ms: i64,
    pub jank_filter_value: f64,
    pub ui_timeout_ms: i64,
    pub connectivity: String,
    pub local_resp_pct: f64,
    pub global_resp_pct: f64,
    pub local_regions: usize,
    pub global_regions: usize,
    pub use_pending_ts: bool,
    pub no_skip_undefined: bool,
    pub jank_on_frame_update: bool,
    pub do_taps: bool,
    pub do_scrolls: bool,
    pub do_keys: bool,
    pub diff_duration_ms: i64,
}

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let connectivity = Connectivity::parse(&args.connectivity).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid connectivity: {}. Use one of: one, four, eight",
            args.connectivity
        )
    })?;

    let mut config = AnalysisConfig::default();
    config.interlace_ms = args.interlace;
    config.ism.jank_threshold_ms = args.jank_threshold_ms;
    config.ism.jank_filter_value = args.jank_filter_value;
    config.ism.ui_timeout_ms = args.ui_timeout_ms;
    config.ism.connectivity = connectivity;
    config.ism.local_response_pct = args.local_resp_pct;
    config.ism.global_response_pct = args.global_resp_pct;
    config.ism.local_response_regions = args.local_regions;
    config.ism.global_response_regions = args.global_regions;
    config.ism.use_pending_timestamp = args.use_pending_ts;
    config.ism.skip_undefined_response = !args.no_skip_undefined;
    config.ism.jank_on_frame_update = args.jank_on_frame_update;
    config.input_diff.do_taps = args.do_taps;
    config.input_diff.do_scrolls = args.do_scrolls;
    config.input_diff.do_keys = args.do_keys;
    config.input_diff.diff_duration_ms = args.diff_duration_ms;

    let options = PipelineOptions {
        run_ism: true,
        run_input_diffs: args.do_taps || args.do_scrolls || args.do_keys,
        run_spinners: false,
        collect_spinners: true,
    };

    println!("Analyzing {} file(s)...", args.files.len());

    let collector = Arc::new(Collector::new());
    let failures = run_files(&args.files, &config, &options, collector.clone()).await;

    for (path, error) in &failures {
        tracing::error!(source = %path.display(), error = %error, "Source failed");
    }
    if !args.files.is_empty() && failures.len() == args.files.len() {
        anyhow::bail!("All {} source(s) failed", failures.len());
    }

    println!("  {} result(s) collected", collector.len());
    collector.dump_json(args.output.as_deref())?;

    if let Some(path) = &args.output {
        println!("Results written to: {}", path.display());
    }
    Ok(())
}
