// Load collected batch files into the target-posts collection, tagging each
// post with its topic. Re-importing is idempotent and keeps resolved labels.

use std::collections::HashSet;

use harvest_collector::{list_batches, read_batch};
use harvest_common::{Config, PostRecord};
use tracing::{info, warn};

use crate::error::Result;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub batches: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Records without any text.
    pub skipped: usize,
}

pub async fn import_batches<D>(store: &D, config: &Config) -> Result<ImportReport>
where
    D: DocumentStore + ?Sized,
{
    let mut report = ImportReport::default();
    let mut seen: HashSet<u64> = HashSet::new();

    for topic in &config.topics {
        let dir = config.topic_dir(topic);
        let batches = list_batches(&dir, &topic.name)?;
        info!(topic = %topic.name, batches = batches.len(), "Importing batches");

        for batch in &batches {
            report.batches += 1;
            for record in read_batch(&batch.path)? {
                if !seen.insert(record.id) {
                    continue;
                }
                let Some(text) = record.content() else {
                    warn!(post_id = record.id, file = %batch.path.display(), "Record has no text, skipping");
                    report.skipped += 1;
                    continue;
                };
                let post = PostRecord::new(record.id, text, &topic.name);
                if store.upsert_target_post(&post).await? {
                    report.inserted += 1;
                } else {
                    report.updated += 1;
                }
            }
        }
    }

    info!(
        batches = report.batches,
        inserted = report.inserted,
        updated = report.updated,
        skipped = report.skipped,
        "Import finished"
    );
    Ok(report)
}
