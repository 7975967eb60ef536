use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use harvest_common::Config;
use harvest_labeler::{import_batches, run_merge, LinearModel, PgDocumentStore};

#[derive(Parser)]
#[command(name = "harvest-label")]
#[command(about = "Import collected posts and resolve their sentiment labels")]
struct Cli {
    /// Limit import to these topics (repeatable)
    #[arg(short, long = "topic", global = true)]
    topics: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load batch files into the target posts collection
    Import,
    /// Resolve labels (manual first, classifier second) and write the artifact
    Merge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("harvest=info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut config = Config::label_from_env()?;
    config.select_topics(&cli.topics)?;
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = PgDocumentStore::new(pool);
    store.migrate().await?;

    match cli.command {
        Command::Import => {
            let report = import_batches(&store, &config).await?;
            info!(?report, "Import complete");
        }
        Command::Merge => {
            let classifier = LinearModel::load(&config.model_path)?;
            let report = run_merge(&store, &classifier, &config.artifact_path).await?;
            for skipped in &report.skipped {
                warn!(post_id = skipped.post_id, reason = ?skipped.reason, "Post left unlabeled");
            }
            info!(
                total = report.total,
                written = report.written(),
                skipped = report.skipped.len(),
                artifact = %config.artifact_path.display(),
                "Merge complete"
            );
        }
    }

    Ok(())
}
