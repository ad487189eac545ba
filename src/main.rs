//! forex-calendar — Binary Entrypoint
//! Fetches the weekly ForexFactory calendar once and writes it as JSON,
//! either to a file (default `calendar.json`) or to stdout (`--print`).

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use forex_calendar::ingest::providers::forex_factory::ForexFactoryFeed;
use forex_calendar::{build_document, load_config_default, CalendarError, FeedSource, OutputSink};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch ForexFactory economic calendar and save as JSON", long_about = None)]
struct Cli {
    /// Output JSON file path
    #[arg(short, long, default_value = "calendar.json", conflicts_with = "print")]
    output: PathBuf,

    /// Print events to stdout instead of saving
    #[arg(short, long)]
    print: bool,
}

impl Cli {
    fn sink(&self) -> OutputSink {
        if self.print {
            OutputSink::Stdout
        } else {
            OutputSink::File(self.output.clone())
        }
    }
}

/// Diagnostics go to stderr so stdout stays clean for `--print`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn fatal(e: &CalendarError) -> ExitCode {
    eprintln!("error: {}: {e}", e.class());
    ExitCode::FAILURE
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config_default()?;

    let feed = match ForexFactoryFeed::from_config(&cfg) {
        Ok(f) => f,
        Err(e) => return Ok(fatal(&e)),
    };
    println!("Fetching {} calendar from {}...", feed.name(), cfg.feed_url);

    let xml = match feed.fetch_text().await {
        Ok(xml) => xml,
        Err(e) => return Ok(fatal(&e)),
    };

    println!("Parsing calendar events...");
    let doc = match build_document(&xml, &cfg, Utc::now()) {
        Ok(doc) => doc,
        Err(e) => return Ok(fatal(&e)),
    };

    println!("{}", doc.summary());
    cli.sink().write(&doc)?;
    Ok(ExitCode::SUCCESS)
}
