//! Pulse Harvest CLI
//!
//! Searches threat-intel pulses for each term and exports the unique
//! indicators to `<term>_indicators.csv`.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use tracing::{error, warn, Level};
use tracing_subscriber::FmtSubscriber;

use harvest_core::{HarvestConfig, API_KEY_ENV};
use harvest_otx::{OtxClient, OtxConfig};
use harvest_pipeline::{Harvester, TermOutcome};

#[derive(Parser)]
#[command(name = "pulse-harvest")]
#[command(author, version, about = "Export deduplicated threat-intel pulse indicators to CSV", long_about = None)]
struct Cli {
    /// Search terms; one CSV file is written per term
    #[arg(allow_hyphen_values = true)]
    terms: Vec<String>,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if cli.terms.is_empty() {
        eprintln!("{}", Cli::command().render_usage());
        std::process::exit(1);
    }

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let config = HarvestConfig::from_env();
    if !config.has_api_key() {
        warn!("{} is not set; the API will likely reject requests", API_KEY_ENV);
    }

    let client = OtxClient::new(OtxConfig::from(&config))?;
    let harvester = Harvester::new(client, config);

    for term in &cli.terms {
        println!("\nSearching for: {}", term);

        match harvester.run_term(term).await {
            TermOutcome::NoPulses => println!("No pulses found for '{}'", term),
            TermOutcome::Exported(report) => println!("{}", report),
            TermOutcome::Failed(e) => error!("Skipping '{}': {}", term, e),
        }
    }

    Ok(())
}
