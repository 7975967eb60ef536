use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::HarvestError;
use crate::types::Topic;

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_RESULTS: u64 = 10_000_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
///
/// Built once by a binary and handed to each component; nothing reads the
/// environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Layout
    pub data_dir: PathBuf,
    pub topics: Vec<Topic>,

    // Collection
    pub search_api_token: String,
    pub search_api_url: Option<String>,
    pub page_size: u32,
    pub max_results: u64,
    pub request_timeout: Duration,

    // Labeling
    pub database_url: String,
    pub model_path: PathBuf,
    pub artifact_path: PathBuf,
}

impl Config {
    /// Config for the collection stage (search token required, no database).
    pub fn collect_from_env() -> Result<Self, HarvestError> {
        Self::from_lookup(|key| env::var(key).ok(), Stage::Collect)
    }

    /// Config for the import/merge stage (database required, no search token).
    pub fn label_from_env() -> Result<Self, HarvestError> {
        Self::from_lookup(|key| env::var(key).ok(), Stage::Label)
    }

    /// Config for the batch audit: layout and topics only, no secrets.
    pub fn audit_from_env() -> Result<Self, HarvestError> {
        Self::from_lookup(|key| env::var(key).ok(), Stage::Audit)
    }

    /// Config with defaults only, for tests and local tooling.
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            model_path: data_dir.join("ml_models").join("linear_model.json"),
            artifact_path: data_dir.join("labels").join("labels.json"),
            data_dir,
            topics: Topic::builtin(),
            search_api_token: String::new(),
            search_api_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_results: DEFAULT_MAX_RESULTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            database_url: String::new(),
        }
    }

    pub fn from_lookup<F>(lookup: F, stage: Stage) -> Result<Self, HarvestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(lookup("HARVEST_DATA_DIR").unwrap_or_else(|| "files".into()));
        let mut config = Self::local(&data_dir);

        if let Some(names) = lookup("HARVEST_TOPICS") {
            config.topics = parse_topics(&names)?;
        }
        if let Some(v) = lookup("HARVEST_PAGE_SIZE") {
            config.page_size = parse_number("HARVEST_PAGE_SIZE", &v)?;
            if config.page_size == 0 {
                return Err(HarvestError::Config("HARVEST_PAGE_SIZE must be positive".into()));
            }
        }
        if let Some(v) = lookup("HARVEST_MAX_RESULTS") {
            config.max_results = parse_number("HARVEST_MAX_RESULTS", &v)?;
        }
        if let Some(v) = lookup("SEARCH_API_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_number("SEARCH_API_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("HARVEST_MODEL_PATH") {
            config.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("HARVEST_ARTIFACT_PATH") {
            config.artifact_path = PathBuf::from(v);
        }
        config.search_api_url = lookup("SEARCH_API_URL");

        match stage {
            Stage::Collect => {
                config.search_api_token = required(&lookup, "SEARCH_API_TOKEN")?;
            }
            Stage::Label => {
                config.database_url = required(&lookup, "DATABASE_URL")?;
            }
            Stage::Audit => {}
        }

        Ok(config)
    }

    /// Directory holding one topic's batch files.
    pub fn topic_dir(&self, topic: &Topic) -> PathBuf {
        self.target_root().join(&topic.name)
    }

    pub fn target_root(&self) -> PathBuf {
        self.data_dir.join("target_tweets")
    }

    /// Keep only the named topics, preserving configured order.
    pub fn select_topics(&mut self, names: &[String]) -> Result<(), HarvestError> {
        if names.is_empty() {
            return Ok(());
        }
        for name in names {
            if !self.topics.iter().any(|t| &t.name == name) {
                return Err(HarvestError::Config(format!("topic {name:?} is not configured")));
            }
        }
        self.topics.retain(|t| names.contains(&t.name));
        Ok(())
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        let topics: Vec<&str> = self.topics.iter().map(|t| t.name.as_str()).collect();
        info!(
            data_dir = %self.data_dir.display(),
            ?topics,
            page_size = self.page_size,
            max_results = self.max_results,
            search_api_url = self.search_api_url.as_deref().unwrap_or("<default>"),
            search_api_token = redact(&self.search_api_token),
            database_url = redact(&self.database_url),
            model_path = %self.model_path.display(),
            artifact_path = %self.artifact_path.display(),
            "Loaded configuration"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collect,
    Label,
    /// Reads batch files only.
    Audit,
}

fn required<F>(lookup: &F, key: &str) -> Result<String, HarvestError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| HarvestError::Config(format!("{key} environment variable is required")))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, HarvestError> {
    value
        .trim()
        .parse()
        .map_err(|_| HarvestError::Config(format!("{key} must be a number, got {value:?}")))
}

fn parse_topics(names: &str) -> Result<Vec<Topic>, HarvestError> {
    let topics: Vec<Topic> = names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(Topic::from_name)
        .collect();
    if topics.is_empty() {
        return Err(HarvestError::Config("HARVEST_TOPICS lists no topics".into()));
    }
    if let Some(bad) = topics.iter().find(|t| !is_valid_topic_name(&t.name)) {
        return Err(HarvestError::Config(format!(
            "topic name {:?} must be lowercase ascii letters",
            bad.name
        )));
    }
    Ok(topics)
}

/// Topic names end up in directory and batch file names, so keep them plain.
fn is_valid_topic_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase())
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}
