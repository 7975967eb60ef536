use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use harvest_collector::{audit_batches, run_collection, CollectOutcome, Collector, TopicOutcome};
use harvest_common::Config;
use search_client::SearchClient;

#[derive(Parser)]
#[command(name = "harvest-collect")]
#[command(about = "Collect new posts for each configured topic")]
struct Cli {
    /// Limit the run to these topics (repeatable)
    #[arg(short, long = "topic", global = true)]
    topics: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch posts newer than each topic's watermark (default)
    Run,
    /// Check that batch files hold strictly increasing ids across runs
    Audit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("harvest=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let mut config = Config::collect_from_env()?;
            config.select_topics(&cli.topics)?;
            config.log_redacted();
            collect(&config).await
        }
        Command::Audit => {
            let mut config = Config::audit_from_env()?;
            config.select_topics(&cli.topics)?;
            audit(&config)
        }
    }
}

async fn collect(config: &Config) -> Result<()> {
    info!("Harvest collection starting...");

    let client = match &config.search_api_url {
        Some(url) => SearchClient::with_base_url(
            url.clone(),
            config.search_api_token.clone(),
            config.request_timeout,
        )?,
        None => SearchClient::new(config.search_api_token.clone())?,
    };
    let collector = Collector::new(client, config.page_size, config.max_results);

    let summaries = run_collection(config, &collector, Utc::now).await;

    let total: u64 = summaries.iter().map(|s| s.collected()).sum();
    let failed = summaries
        .iter()
        .filter(|s| {
            matches!(
                s.outcome,
                TopicOutcome::Aborted(_) | TopicOutcome::Collection(CollectOutcome::Fault(_))
            )
        })
        .count();
    info!(topics = summaries.len(), total, failed, "Harvest collection finished");
    Ok(())
}

fn audit(config: &Config) -> Result<()> {
    for topic in &config.topics {
        let report = audit_batches(&config.topic_dir(topic), &topic.name)?;
        if report.is_clean() {
            info!(
                topic = %topic.name,
                batches = report.batches,
                records = report.records,
                watermark = ?report.latest_max,
                "Batches consistent"
            );
        } else {
            for issue in &report.issues {
                warn!(topic = %topic.name, ?issue, "Batch ordering issue");
            }
            if report.global_max != report.latest_max {
                warn!(
                    topic = %topic.name,
                    global_max = ?report.global_max,
                    latest_max = ?report.latest_max,
                    "Newest batch does not hold the highest id"
                );
            }
        }
    }
    Ok(())
}
