//! Jankscope CLI — interaction performance metrics from device logs.
//!
//! Usage:
//!   jankscope analyze <FILES>...   Measure tap/scroll response and jank
//!   jankscope spinners <FILES>...  Detect loading-spinner episodes
//!   jankscope gestures <FILES>...  Dump the detected gesture stream

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "jankscope",
    about = "Extract user-perceived interaction performance metrics from device log streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure per-gesture response latency and jank
    Analyze {
        /// Log files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Interlace synthetic zero diffs at this interval (ms, 0 = off)
        #[arg(long, default_value = "0")]
        interlace: i64,

        /// Jank threshold (ms)
        #[arg(long, default_value = "70")]
        jank_threshold_ms: i64,

        /// Skip jank accounting below this percent change
        #[arg(long, default_value = "0.1")]
        jank_filter_value: f64,

        /// Idle window before a result finalizes as a timeout (ms)
        #[arg(long, default_value = "3000")]
        ui_timeout_ms: i64,

        /// Neighborhood policy for the local diff: one|four|eight
        #[arg(long, default_value = "four")]
        connectivity: String,

        /// Minimum localized share of the total diff for a local response (%)
        #[arg(long, default_value = "60")]
        local_resp_pct: f64,

        /// Minimum total percent diff for a global response
        #[arg(long, default_value = "20")]
        global_resp_pct: f64,

        /// Local responses may span at most this many regions (0 = no limit)
        #[arg(long, default_value = "0")]
        local_regions: usize,

        /// Region-count alternative for classifying global
        #[arg(long, default_value = "10")]
        global_regions: usize,

        /// Use refresh-event time as the response start
        #[arg(long)]
        use_pending_ts: bool,

        /// Classify undefined responses as global instead of ignoring them
        #[arg(long)]
        no_skip_undefined: bool,

        /// Sample jank from refresh events instead of diffs
        #[arg(long)]
        jank_on_frame_update: bool,

        /// Also open per-tap diff windows
        #[arg(long)]
        do_taps: bool,

        /// Also open per-scroll diff windows
        #[arg(long)]
        do_scrolls: bool,

        /// Also open per-key diff windows
        #[arg(long)]
        do_keys: bool,

        /// Diff window duration (ms)
        #[arg(long, default_value = "5000")]
        diff_duration_ms: i64,
    },

    /// Detect loading-spinner episodes in the diff stream
    Spinners {
        /// Log files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Classifier: naive|voting
        #[arg(long, default_value = "naive")]
        algo: String,

        /// Lower percent-diff bound (exclusive)
        #[arg(long, default_value = "0.001")]
        min: f64,

        /// Upper percent-diff bound (exclusive)
        #[arg(long, default_value = "4.0")]
        max: f64,

        /// Consecutive in-band samples to enter the spinner state (voting)
        #[arg(long, default_value = "7")]
        votes_in: i32,

        /// Consecutive out-of-band samples to leave it (voting)
        #[arg(long, default_value = "3")]
        votes_out: i32,

        /// Exact-zero diffs do not change the classifier state (naive)
        #[arg(long)]
        ignore_zeros: bool,

        /// Grouping label carried into the output
        #[arg(long, default_value = "")]
        group: String,

        /// Merge spinners closer than this gap (ms, 0 = off)
        #[arg(long, default_value = "0")]
        stitch_interval: i64,

        /// Interlace synthetic zero diffs at this interval (ms, 0 = off)
        #[arg(long, default_value = "0")]
        interlace: i64,

        /// Stream spinners individually instead of one collection per file
        #[arg(long)]
        raw: bool,
    },

    /// Dump the detected gesture stream as JSON
    Gestures {
        /// Log files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    jankscope_common::logging::init_logging(&jankscope_common::logging::LoggingConfig {
        level: log_level.to_string(),
        json: false,
    });

    match cli.command {
        Commands::Analyze {
            files,
            output,
            interlace,
            jank_threshold_ms,
            jank_filter_value,
            ui_timeout_ms,
            connectivity,
            local_resp_pct,
            global_resp_pct,
            local_regions,
            global_regions,
            use_pending_ts,
            no_skip_undefined,
            jank_on_frame_update,
            do_taps,
            do_scrolls,
            do_keys,
            diff_duration_ms,
        } => {
            commands::analyze::run(commands::analyze::AnalyzeArgs {
                files,
                output,
                interlace,
                jank_threshold_ms,
                jank_filter_value,
                ui_timeout_ms,
                connectivity,
                local_resp_pct,
                global_resp_pct,
                local_regions,
                global_regions,
                use_pending_ts,
                no_skip_undefined,
                jank_on_frame_update,
                do_taps,
                do_scrolls,
                do_keys,
                diff_duration_ms,
            })
            .await
        }
        Commands::Spinners {
            files,
            output,
            algo,
            min,
            max,
            votes_in,
            votes_out,
            ignore_zeros,
            group,
            stitch_interval,
            interlace,
            raw,
        } => {
            commands::spinners::run(commands::spinners::SpinnerArgs {
                files,
                output,
                algo,
                min,
                max,
                votes_in,
                votes_out,
                ignore_zeros,
                group,
                stitch_interval,
                interlace,
                raw,
            })
            .await
        }
        Commands::Gestures { files, output } => commands::gestures::run(files, output).await,
    }
}
