//! Collection run over every configured topic, one topic at a time.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use harvest_common::{Config, Topic};
use tracing::{error, info, warn};

use crate::batch::BatchName;
use crate::collector::{CollectOutcome, Collector};
use crate::error::CollectError;
use crate::search::PostSearch;
use crate::watermark::resolve_watermark;

/// What happened to one topic during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    pub topic: String,
    pub watermark: Option<u64>,
    pub outcome: TopicOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicOutcome {
    /// The collector ran; see its outcome.
    Collection(CollectOutcome),
    /// The topic was skipped before collecting, e.g. unreadable prior batches.
    Aborted(String),
}

impl TopicSummary {
    pub fn collected(&self) -> u64 {
        match &self.outcome {
            TopicOutcome::Collection(CollectOutcome::Collected { count, .. }) => *count,
            _ => 0,
        }
    }

    pub fn file(&self) -> Option<&PathBuf> {
        match &self.outcome {
            TopicOutcome::Collection(CollectOutcome::Collected { file, .. }) => Some(file),
            _ => None,
        }
    }
}

/// Collect every topic in `config` sequentially. A failing topic never stops
/// the topics after it. `clock` names the batch files.
pub async fn run_collection<S, C>(
    config: &Config,
    collector: &Collector<S>,
    clock: C,
) -> Vec<TopicSummary>
where
    S: PostSearch,
    C: Fn() -> DateTime<Utc>,
{
    let mut summaries = Vec::with_capacity(config.topics.len());

    for topic in &config.topics {
        info!(topic = %topic.name, query = %topic.query, "Processing topic");
        let summary = collect_topic(config, collector, topic, clock()).await;

        match &summary.outcome {
            TopicOutcome::Collection(CollectOutcome::Collected { count, pages, newest_id, .. }) => {
                info!(topic = %topic.name, count, pages, newest_id, "Finished collecting topic")
            }
            TopicOutcome::Collection(CollectOutcome::Empty) => {
                info!(topic = %topic.name, "No new posts for topic")
            }
            TopicOutcome::Collection(CollectOutcome::Fault(reason)) => {
                warn!(topic = %topic.name, error = %reason, "Topic collection failed")
            }
            TopicOutcome::Aborted(reason) => {
                error!(topic = %topic.name, error = %reason, "Topic aborted")
            }
        }
        summaries.push(summary);
    }

    summaries
}

async fn collect_topic<S: PostSearch>(
    config: &Config,
    collector: &Collector<S>,
    topic: &Topic,
    now: DateTime<Utc>,
) -> TopicSummary {
    let aborted = |watermark: Option<u64>, reason: String| TopicSummary {
        topic: topic.name.clone(),
        watermark,
        outcome: TopicOutcome::Aborted(reason),
    };

    let dir = config.topic_dir(topic);
    if let Err(e) = fs::create_dir_all(&dir) {
        return aborted(None, CollectError::io(&dir, e).to_string());
    }

    let watermark = match resolve_watermark(&dir, &topic.name) {
        Ok(watermark) => watermark,
        Err(e) => return aborted(None, e.to_string()),
    };
    info!(topic = %topic.name, watermark = ?watermark, "Resolved watermark");

    let name = match BatchName::new(&topic.name, now) {
        Ok(name) => name,
        Err(e) => return aborted(watermark, e.to_string()),
    };
    let dest = dir.join(name.file_name());

    let outcome = collector.collect(&topic.query, &dest, watermark).await;
    TopicSummary {
        topic: topic.name.clone(),
        watermark,
        outcome: TopicOutcome::Collection(outcome),
    }
}
