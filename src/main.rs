mod config;
mod enrich;
mod error;
mod fetch;
mod pagination;
mod parser;
mod pipeline;
mod reconcile;
mod records;
mod sheets;
mod site;
mod summary;
mod table;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::site::SiteKind;

#[derive(Parser)]
#[command(name = "campaign_scraper", about = "Charity campaign scraper for Ray of Hope and G2C")]
struct Cli {
    /// Site profile to scrape
    #[arg(long, global = true, value_enum)]
    site: Option<SiteKind>,
    /// Directory for output tables
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Settings file (default: ./campaigns.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages and write the all/unique campaign tables
    Scrape {
        /// Page cap per paginated source
        #[arg(short = 'n', long)]
        max_pages: Option<u32>,
    },
    /// Visit each campaign page in a unique table and write the detailed table
    Enrich {
        /// Table to enrich, with or without extension (default: <prefix>_campaigns_unique)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Reference date for days active (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Also write summary and per-category statistics
        #[arg(long)]
        summary: bool,
    },
    /// Scrape + enrich in one pipeline
    Run {
        #[arg(short = 'n', long)]
        max_pages: Option<u32>,
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long)]
        summary: bool,
    },
    /// Print statistics for an existing table
    Report {
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(site) = cli.site {
        settings.site = site;
    }
    if let Some(dir) = cli.output_dir {
        settings.output_dir = dir;
    }

    let result = match cli.command {
        Commands::Scrape { max_pages } => {
            settings.max_pages = max_pages.or(settings.max_pages);
            pipeline::scrape(&settings).await
        }
        Commands::Enrich {
            input,
            today,
            summary,
        } => {
            settings.today = today.or(settings.today);
            pipeline::enrich_table(&settings, input.as_deref(), summary).await
        }
        Commands::Run {
            max_pages,
            today,
            summary,
        } => {
            settings.max_pages = max_pages.or(settings.max_pages);
            settings.today = today.or(settings.today);
            pipeline::run(&settings, summary).await
        }
        Commands::Report { input, json } => pipeline::report(&settings, input.as_deref(), json),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
