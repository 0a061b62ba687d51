//! Dump the detected gesture stream.

use std::path::PathBuf;

use jankscope_pipeline::extract_gestures;

pub async fn run(files: Vec<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let mut all = Vec::new();

    for path in &files {
        match extract_gestures(path).await {
            Ok(gestures) => {
                println!("{}: {} gesture(s)", path.display(), gestures.len());
                all.extend(gestures);
            }
            Err(e) => {
                tracing::error!(source = %path.display(), error = %e, "Source failed");
            }
        }
    }

    let json = serde_json::to_string_pretty(&all)?;
    match &output {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Gestures written to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
