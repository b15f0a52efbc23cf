mod config;
mod loader;
mod models;
mod pipeline;
mod regression;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::loader::{load_clean_records, load_records};
use crate::pipeline::Pipeline;
use crate::scraper::cleaner::clean_records;
use crate::scraper::throttle::MinSpacing;
use crate::scraper::{NumbeoScraper, PropertyDataSource};
use crate::storage::{CsvSink, write_clean_csv};

#[derive(Parser)]
#[command(name = "numbeo-etl", about = "Numbeo property-investment scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// List the countries found on the index page
    Countries,

    /// Scrape every country page and write the raw CSV
    Scrape {
        /// Output file (default: output.raw_csv from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Turn displayed values into numbers and write the cleaned CSV
    Clean {
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit the item → value regression on the cleaned CSV
    Regress {
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Item to predict (default: model.target_item from config)
        #[arg(long)]
        item: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "numbeo_etl=info,warn",
        1 => "numbeo_etl=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Countries => {
            let scraper = NumbeoScraper::new(&config.scraper)?;
            let countries = scraper
                .discover_countries()
                .await
                .context("Country discovery failed")?;
            println!("{} countries:", countries.len());
            for name in &countries {
                println!("  {}", name);
            }
        }

        Command::Scrape { output } => {
            let _t = utils::Timer::start("Scrape");
            let path = output.unwrap_or(config.output.raw_csv);
            let scraper = NumbeoScraper::new(&config.scraper)?;
            let pacer =
                MinSpacing::from_millis(config.scraper.request_delay_ms, config.scraper.jitter_ms);
            let mut sink = CsvSink::new(path, config.output.headers);

            let stats = Pipeline::new(scraper, pacer).run(&mut sink).await?;

            if stats.records_written == 0 {
                println!("No data collected; no file written.");
            } else {
                println!(
                    "{} rows from {} countries saved to {:?} ({} failed)",
                    utils::fmt_number(stats.records_written),
                    stats.countries_scraped,
                    sink.path(),
                    stats.countries_failed,
                );
            }
        }

        Command::Clean { input, output } => {
            let _t = utils::Timer::start("Clean");
            let input = input.unwrap_or(config.output.raw_csv);
            let output = output.unwrap_or(config.output.clean_csv);

            let raw = load_records(&input)?;
            let cleaned = clean_records(&raw);
            if cleaned.len() < raw.len() {
                warn!("{} rows dropped without a numeric value", raw.len() - cleaned.len());
            }

            let n = write_clean_csv(&output, &config.output.headers, &cleaned)?;
            println!("{} cleaned rows saved to {:?}", utils::fmt_number(n), output);
        }

        Command::Regress { input, item, json } => {
            let input = input.unwrap_or(config.output.clean_csv);
            if let Some(item) = item {
                config.model.target_item = item;
            }

            let rows = load_clean_records(&input)?;
            info!("Fitting on {} rows", rows.len());
            let report = regression::evaluate(&rows, &config.model)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Regression (one-hot item → value):");
                println!("  Train / test rows : {} / {}", report.train_rows, report.test_rows);
                println!("  Distinct items    : {}", report.items);
                println!("  MSE               : {:.4}", report.mse);
                println!("  SSE               : {:.4}", report.sse);
                println!(
                    "  Prediction for '{}': {:.4}",
                    report.target_item, report.target_prediction
                );
            }
        }
    }

    Ok(())
}
