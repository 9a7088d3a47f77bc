use std::path::PathBuf;

use acarsview_cli::cli::{open_input, render_text, replay, summarize};
use acarsview_core::tracing_setup::init_tracing;
use acarsview_core::{CoreConfig, MessageStore};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(name = "acarsview")]
#[command(about = "Replay decoded ACARS/VDL2/HFDL messages and summarize them per aircraft")]
struct Cli {
    /// JSON-lines input file, or - for stdin
    #[arg(default_value = "-")]
    input: String,

    /// Path to JSON config file (dataDir, caps, alert terms)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory for persisted read state
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Alert term (can be specified multiple times)
    #[arg(long = "alert-term", short = 'a')]
    alert_terms: Vec<String>,

    /// Term that suppresses alerts (can be specified multiple times)
    #[arg(long = "ignore-term")]
    ignore_terms: Vec<String>,

    /// Maximum number of aircraft groups kept
    #[arg(long)]
    max_groups: Option<usize>,

    /// Maximum number of messages kept per group
    #[arg(long)]
    max_per_group: Option<usize>,

    /// Mark every retained message read after the replay
    #[arg(long)]
    mark_all_read: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    let (mut store, _settings) = MessageStore::from_config(&config);

    let input = open_input(&cli.input)?;
    let report = replay(input, &mut store)?;

    if cli.mark_all_read {
        let marked = store.mark_all_read();
        tracing::info!(marked, "marked all retained messages read");
    }

    let summary = summarize(&store);
    if cli.json {
        let output = serde_json::json!({
            "replay": report,
            "summary": summary,
        });
        let text = if cli.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        }
        .context("Failed to serialize summary")?;
        println!("{}", text);
    } else {
        print!("{}", render_text(&summary));
        if report.skipped > 0 {
            println!("{} malformed lines skipped", report.skipped);
        }
    }

    Ok(())
}

/// Config file (or defaults) with command line overrides applied on top
fn build_config(cli: &Cli) -> Result<CoreConfig> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(max) = cli.max_groups {
        config.max_message_groups = max;
    }
    if let Some(max) = cli.max_per_group {
        config.max_messages_per_group = max;
    }
    config.alert_terms.extend(cli.alert_terms.iter().cloned());
    config.ignore_terms.extend(cli.ignore_terms.iter().cloned());

    Ok(config)
}
