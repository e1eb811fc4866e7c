//! review-crawler - Scrape product reviews into a clean dataset
//!
//! Fetches search listings and review pages with TLS fingerprint emulation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use review_crawler::commands::ScrapeCommand;
use review_crawler::config::{Config, OutputFormat};
use review_crawler::site::{PageFormat, Region};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "review-crawler",
    version,
    about = "Scrape product reviews from retail search results",
    long_about = "Searches a retail site for a product, scrapes the reviews of the top results, and prints them as a cleaned, de-duplicated dataset."
)]
struct Cli {
    /// Site layout to scrape
    #[arg(short, long, global = true, env = "REVIEWS_SITE")]
    site: Option<PageFormat>,

    /// Amazon region
    #[arg(short, long, global = true, env = "REVIEWS_REGION")]
    region: Option<Region>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "REVIEWS_PROXY")]
    proxy: Option<String>,

    /// Delay between requests in milliseconds
    #[arg(long, global = true, env = "REVIEWS_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// SQLite database to store scraped reviews in
    #[arg(long, global = true, env = "REVIEWS_DB")]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape reviews for a product
    #[command(alias = "s")]
    Scrape {
        /// Product to search for
        product: String,

        /// Number of products whose reviews are scraped
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Hard ceiling on product pages
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// List supported site layouts
    Formats,

    /// List supported Amazon regions
    Regions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(site) = cli.site {
        config.site = site;
    }
    if let Some(region) = cli.region {
        config.region = region;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(db) = cli.db {
        config.database = Some(db);
    }

    match cli.command {
        Commands::Scrape { product, count, max_pages } => {
            if let Some(max) = max_pages {
                config.max_pages = max;
            }

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("Interrupted, finishing current page...");
                    on_interrupt.cancel();
                }
            });

            let cmd = ScrapeCommand::new(config).with_cancellation(cancel);
            let output = cmd.execute(&product, count).await?;
            println!("{}", output);
        }

        Commands::Formats => {
            println!("Supported site layouts:\n");
            println!("{:<10} {}", "Name", "Description");
            println!("{:-<10} {:-<50}", "", "");

            for format in PageFormat::all() {
                println!("{:<10} {}", format.to_string(), format.description());
            }
        }

        Commands::Regions => {
            println!("Supported Amazon regions:\n");
            println!("{:<6} {:<20} {:<10}", "Code", "Domain", "Language");
            println!("{:-<6} {:-<20} {:-<10}", "", "", "");

            for region in Region::all() {
                let language = region.accept_language().split(',').next().unwrap_or_default();
                println!("{:<6} {:<20} {:<10}", region.to_string(), region.domain(), language);
            }
        }
    }

    Ok(())
}
