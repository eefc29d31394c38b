// src/main.rs
mod batch;
mod bbref;
mod extractors;
mod storage;
mod utils;

use std::time::Duration;

use clap::Parser;

use batch::BatchRunner;
use bbref::{HttpFetcher, StatType, DEFAULT_BASE_URL};
use extractors::TableExtractor;
use storage::StorageManager;
use utils::AppError;

/// Command Line Interface for the WNBA season player stats scraper
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// First season to fetch
    #[arg(long, default_value_t = 1997)]
    start_year: u32,

    /// Last season to fetch (inclusive)
    #[arg(long, default_value_t = 2024)]
    end_year: u32,

    /// Number of seasons per output file
    #[arg(long, default_value_t = 4)]
    chunk_size: u32,

    /// Comma separated stat types, e.g. per_game_stats,advanced_stats
    #[arg(short, long, value_delimiter = ',', default_value = "per_poss_stats")]
    stat_types: Vec<StatType>,

    /// Output directory for the CSV and metadata files
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Seconds to wait between batches
    #[arg(long, default_value_t = 5)]
    delay_secs: u64,

    /// Base of the year-based statistics pages
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = bbref::client::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Column identifying repeated header rows
    #[arg(long, default_value = extractors::table::DEFAULT_PRIMARY_KEY)]
    primary_key: String,

    /// Debug mode - save every fetched page under <output_dir>/debug
    #[arg(short, long)]
    debug: bool,

    /// Log this crate at DEBUG level
    #[arg(short, long)]
    verbose: bool,

    /// Print the recognized stat types and exit
    #[arg(long)]
    list_stat_types: bool,
}

impl Args {
    /// Rejects configurations that would fail before any request is made.
    fn validate(&self) -> Result<(), AppError> {
        if self.start_year > self.end_year {
            return Err(AppError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk size must be at least 1".to_string()));
        }
        if self.stat_types.is_empty() {
            return Err(AppError::Config("at least one stat type is required".to_string()));
        }
        if self.primary_key.trim().is_empty() {
            return Err(AppError::Config("primary key column must not be blank".to_string()));
        }
        Ok(())
    }
}

/// Splits `start..=end` into consecutive runs of at most `size` years.
fn year_chunks(start: u32, end: u32, size: u32) -> Vec<Vec<u32>> {
    let years: Vec<u32> = (start..=end).collect();
    years.chunks(size.max(1) as usize).map(<[u32]>::to_vec).collect()
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.verbose);

    if args.list_stat_types {
        for st in StatType::ALL {
            println!("{}", st.label());
        }
        return Ok(());
    }

    tracing::info!("Starting processing for args: {:?}", args);
    args.validate()?;

    // 3. Initialize storage and the batch runner
    let storage = StorageManager::new(&args.output_dir)?;
    tracing::info!("Writing output to {}", storage.base_dir().display());

    let fetcher = HttpFetcher::new(Duration::from_secs(args.timeout_secs))?;
    let mut runner = BatchRunner::new(fetcher)
        .with_base_url(&args.base_url)
        .with_extractor(TableExtractor::new().with_primary_key(&args.primary_key));
    if args.debug {
        runner = runner.with_raw_page_dir(storage.debug_dir());
    }

    // 4. Process each year range
    let chunks = year_chunks(args.start_year, args.end_year, args.chunk_size);
    let mut written = 0;
    let mut empty = 0;

    for (i, years) in chunks.iter().enumerate() {
        let (first, last) = match (years.first(), years.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => continue,
        };

        if i > 0 && args.delay_secs > 0 {
            tracing::debug!("Waiting {}s before the next batch", args.delay_secs);
            tokio::time::sleep(Duration::from_secs(args.delay_secs)).await;
        }

        tracing::info!("Fetching seasons {}-{} ({} stat types)", first, last, args.stat_types.len());
        let report = runner.fetch_season_player_stats(years, &args.stat_types).await;
        tracing::info!(
            "Seasons {}-{}: {} of {} requests succeeded",
            first,
            last,
            report.succeeded(),
            report.requested
        );

        match &report.combined {
            Some(table) => match storage.save_table(table, first, last) {
                Ok(path) => {
                    tracing::info!("Data from {} to {} saved to {}", first, last, path.display());
                    written += 1;
                }
                Err(e) => tracing::error!("Failed to save data for {}-{}: {}", first, last, e),
            },
            None => {
                tracing::warn!("No data found for {}-{}; nothing written", first, last);
                empty += 1;
            }
        }

        if let Err(e) = storage.save_batch_metadata(
            report.combined.as_ref(),
            first,
            last,
            &args.stat_types,
            &report.skipped,
        ) {
            tracing::error!("Failed to save metadata for {}-{}: {}", first, last, e);
        }
    }

    tracing::info!("Processing finished. Files written: {}, empty ranges: {}", written, empty);

    if written == 0 {
        return Err(AppError::Processing(format!(
            "No data saved for seasons {}-{}",
            args.start_year, args.end_year
        )));
    }

    Ok(())
}
