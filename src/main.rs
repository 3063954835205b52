use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tracing::debug;

use transcript_analyzer::analyzer::{RunOptions, TranscriptAnalyzer};
use transcript_analyzer::config::Config;
use transcript_analyzer::display::DisplayManager;
use transcript_analyzer::logging::init_logging;
use transcript_analyzer::pricing::PriceTable;

#[derive(Parser)]
#[command(name = "analyze-transcript")]
#[command(about = "Per-message token usage, prompt-cache events and cost for a Claude transcript")]
#[command(version)]
struct Cli {
    /// Transcript file (.jsonl, one JSON object per line)
    transcript: PathBuf,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
    /// Pricing table (TOML) to use instead of the built-in one
    #[arg(long, value_name = "FILE")]
    pricing: Option<PathBuf>,
    /// Minimum cache-read drop reported as an invalidation
    #[arg(long, value_name = "TOKENS")]
    invalidation_threshold: Option<u64>,
    /// Minimum cache-read growth reported as growth
    #[arg(long, value_name = "TOKENS")]
    growth_threshold: Option<u64>,
    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        handle_error(e, json);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(threshold) = cli.invalidation_threshold {
        config.analysis.invalidation_threshold = threshold;
    }
    if let Some(threshold) = cli.growth_threshold {
        config.analysis.growth_threshold = threshold;
    }
    if cli.pricing.is_some() {
        config.paths.pricing_file = cli.pricing;
    }
    if cli.no_color {
        config.output.color = false;
    }
    config.validate()?;

    let _log_guard = init_logging(&config.logging, &config.paths);
    config.log_diagnostics();

    if !config.output.color || cli.json {
        colored::control::set_override(false);
    }

    let pricing = PriceTable::load(config.paths.pricing_file.as_deref())?;
    debug!(models = pricing.models.len(), "Pricing table ready");

    let analyzer = TranscriptAnalyzer::new(pricing)
        .with_thresholds(config.analysis.thresholds())
        .with_display(DisplayManager::with_table_width(config.output.table_width));

    let options = RunOptions {
        json_output: cli.json,
        json_pretty: config.output.json_pretty,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    analyzer.run_file(&cli.transcript, &options, &mut out)?;
    out.flush()?;
    Ok(())
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
