use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use meeting_sync::config::Config;
use meeting_sync::error::Result;
use meeting_sync::logging;
use meeting_sync::lookup::TimeApiClient;
use meeting_sync::normalize::Normalizer;
use meeting_sync::pipeline::BatchPipeline;
use meeting_sync::source::{self, BmltDirectoryClient, MeetingDirectory};
use meeting_sync::storage::{MeetingStore, SqliteMeetingStore};
use meeting_sync::types::{EnrichedMeetingRecord, RawMeetingRecord};

#[derive(Parser)]
#[command(name = "meeting_sync")]
#[command(about = "NA meeting schedule fetcher and UTC normalizer")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the raw meeting list and save it as a JSON snapshot
    Fetch {
        #[arg(long, default_value = "output/raw_meetings.json")]
        raw_file: String,
    },
    /// Normalize a raw snapshot into an enriched (UTC) snapshot
    Process {
        #[arg(long, default_value = "output/raw_meetings.json")]
        raw_file: String,
        #[arg(long, default_value = "output/processed_meetings.json")]
        processed_file: String,
    },
    /// Replace the meetings table with an enriched snapshot
    Insert {
        #[arg(long, default_value = "output/processed_meetings.json")]
        processed_file: String,
    },
    /// Run fetch, process, and insert end to end
    Run {
        #[arg(long, default_value = "output/raw_meetings.json")]
        raw_file: String,
        #[arg(long, default_value = "output/processed_meetings.json")]
        processed_file: String,
    },
}

async fn fetch_stage(config: &Config, raw_file: &Path) -> Result<Vec<RawMeetingRecord>> {
    let directory = BmltDirectoryClient::new(&config.source)?;
    let meetings = directory.fetch_meetings().await?;
    source::save_snapshot(raw_file, &meetings)?;
    println!(
        "📥 Fetched {} meetings → {}",
        meetings.len(),
        raw_file.display()
    );
    Ok(meetings)
}

async fn process_stage(
    config: &Config,
    raws: &[RawMeetingRecord],
    processed_file: &Path,
) -> Result<Vec<EnrichedMeetingRecord>> {
    let lookup = Arc::new(TimeApiClient::new(&config.lookup)?);
    let pipeline = BatchPipeline::new(Normalizer::new(lookup));

    let outcome = pipeline.process_batch(raws).await;
    source::save_snapshot(processed_file, &outcome.enriched)?;

    println!("\n📊 Normalization results:");
    println!("   Total meetings: {}", outcome.total);
    println!("   Enriched: {}", outcome.enriched.len());
    println!("   Dropped: {}", outcome.failed);
    println!("   Output file: {}", processed_file.display());

    Ok(outcome.enriched)
}

async fn insert_stage(config: &Config, meetings: &[EnrichedMeetingRecord]) -> Result<()> {
    let store = SqliteMeetingStore::open(&config.sink.db_path)?;
    store.ensure_schema().await?;
    let written = store.replace_all(meetings).await?;
    println!(
        "💾 Replaced meetings table in {}: {} rows",
        config.sink.db_path, written
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Fetch { raw_file } => {
            fetch_stage(&config, Path::new(&raw_file)).await?;
        }
        Commands::Process {
            raw_file,
            processed_file,
        } => {
            let raws: Vec<RawMeetingRecord> = source::load_snapshot(Path::new(&raw_file))?;
            process_stage(&config, &raws, Path::new(&processed_file)).await?;
        }
        Commands::Insert { processed_file } => {
            let meetings: Vec<EnrichedMeetingRecord> =
                source::load_snapshot(Path::new(&processed_file))?;
            insert_stage(&config, &meetings).await?;
        }
        Commands::Run {
            raw_file,
            processed_file,
        } => {
            let raws = fetch_stage(&config, Path::new(&raw_file)).await?;
            let meetings = process_stage(&config, &raws, Path::new(&processed_file)).await?;
            insert_stage(&config, &meetings).await?;
            info!("Full run completed");
        }
    }

    println!("✅ Data processing and insertion completed successfully!");
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Run failed: {e}");
        eprintln!("❌ Error: {e}");
        std::process::exit(1);
    }
}
