//! Detect loading-spinner episodes.

use std::path::PathBuf;
use std::sync::Arc;

use jankscope_common::AnalysisConfig;
use jankscope_pipeline::{run_files, Collector, PipelineOptions};

pub struct SpinnerArgs {
    pub files: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub algo: String,
    pub min: f64,
    pub max: f64,
    pub votes_in: i32,
    pub votes_out: i32,
    pub ignore_zeros: bool,
    pub group: String,
    pub stitch_interval: i64,
    pub interlace: i64,
    pub raw: bool,
}

pub async fn run(args: SpinnerArgs) -> anyhow::Result<()> {
    if args.algo != "naive" && args.algo != "voting" {
        anyhow::bail!("Invalid algorithm: {}. Use naive or voting", args.algo);
    }

    let mut config = AnalysisConfig::default();
    config.interlace_ms = args.interlace;
    config.spinner.algo = args.algo;
    config.spinner.min = args.min;
    config.spinner.max = args.max;
    config.spinner.votes_in = args.votes_in;
    config.spinner.votes_out = args.votes_out;
    config.spinner.ignore_zeros = args.ignore_zeros;
    config.spinner.group = args.group;
    config.spinner.stitch_interval_ms = args.stitch_interval;

    let options = PipelineOptions {
        run_ism: false,
        run_input_diffs: false,
        run_spinners: true,
        collect_spinners: !args.raw,
    };

    println!(
        "Detecting spinners ({} classifier) in {} file(s)...",
        config.spinner.algo,
        args.files.len()
    );

    let collector = Arc::new(Collector::new());
    let failures = run_files(&args.files, &config, &options, collector.clone()).await;

    for (path, error) in &failures {
        tracing::error!(source = %path.display(), error = %error, "Source failed");
    }
    if !args.files.is_empty() && failures.len() == args.files.len() {
        anyhow::bail!("All {} source(s) failed", failures.len());
    }

    collector.dump_json(args.output.as_deref())?;

    if let Some(path) = &args.output {
        println!("Results written to: {}", path.display());
    }
    Ok(())
}
