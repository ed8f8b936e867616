// src/main.rs
use anyhow::{Context, Result};
use log::{info, warn};
use std::{path::Path, time::Instant};

use geodedupe_lib::{CancellationToken, DedupeConfig, DeduplicationPipeline, EntityRecord};

const INPUT_ENV: &str = "DEDUPE_INPUT";
const OUTPUT_ENV: &str = "DEDUPE_OUTPUT";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    info!("Starting organization deduplication run");
    let start_time = Instant::now();

    // Try to load .env file if it exists
    let env_paths = [".env", ".env.local", "../.env"];
    let mut loaded_env = false;

    for path in env_paths.iter() {
        if Path::new(path).exists() {
            if let Err(e) = dotenv::from_path(path) {
                warn!("Failed to load environment from {}: {}", path, e);
            } else {
                info!("Loaded environment variables from {}", path);
                loaded_env = true;
                break;
            }
        }
    }

    if !loaded_env {
        info!("No .env file found, using environment variables from system");
    }

    let mut args = std::env::args().skip(1);
    let input_path = args
        .next()
        .or_else(|| std::env::var(INPUT_ENV).ok())
        .with_context(|| format!("Usage: dedupe <records.json> [report.json] (or set {})", INPUT_ENV))?;
    let output_path = args.next().or_else(|| std::env::var(OUTPUT_ENV).ok());

    let config = DedupeConfig::from_env().context("Invalid deduplication configuration")?;

    let raw = std::fs::read_to_string(&input_path)
        .with_context(|| format!("Failed to read records from {}", input_path))?;
    let records: Vec<EntityRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse records in {}", input_path))?;
    info!("Loaded {} records from {}", records.len(), input_path);

    // Ctrl-C aborts between cells; nothing has been written at that point
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling deduplication run");
            cancel_on_signal.cancel();
        }
    });

    let pipeline = DeduplicationPipeline::from_config(&config)
        .context("Failed to build deduplication pipeline")?;
    let report = pipeline
        .run_concurrent(
            &records,
            config.resolution,
            config.similarity_threshold,
            &cancel,
        )
        .await
        .context("Deduplication run failed")?;

    let rendered =
        serde_json::to_string_pretty(&report).context("Failed to serialize deduplication report")?;
    match output_path {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write report to {}", path))?;
            info!("Wrote report to {}", path);
        }
        None => println!("{}", rendered),
    }

    info!(
        "Deduplication completed in {:.2?}: {} duplicate groups, {} unindexable records",
        start_time.elapsed(),
        report.groups.len(),
        report.unindexable.len()
    );

    Ok(())
}
