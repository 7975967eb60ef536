//! Watermark resolution: the highest post id already collected for a topic.
//!
//! Only the most recent batch is read. That is sound as long as the search
//! API hands out ids that are larger than every id of any earlier run; the
//! collector rejects pages that break this, and [`audit_batches`] checks the
//! whole history.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::batch::{list_batches, read_batch_ids};
use crate::error::Result;

/// Highest post id in the newest batch of `topic`, or `None` when the topic
/// has never been collected. A corrupt or empty newest batch is an error.
pub fn resolve_watermark(dir: &Path, topic: &str) -> Result<Option<u64>> {
    let batches = list_batches(dir, topic)?;

    let Some(latest) = batches.last() else {
        debug!(topic, "No batches found, collecting without lower bound");
        return Ok(None);
    };

    let ids = read_batch_ids(&latest.path)?;
    let watermark = ids.into_iter().max();
    debug!(
        topic,
        file = %latest.path.display(),
        watermark = ?watermark,
        "Resolved watermark"
    );
    Ok(watermark)
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditIssue {
    /// The batch could not be read as a list of records.
    Unreadable { file: PathBuf, reason: String },
    /// The batch holds ids at or below the maximum of earlier batches.
    Overlap {
        file: PathBuf,
        min_id: u64,
        prior_max: u64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub batches: usize,
    pub records: usize,
    /// Maximum id across every readable batch.
    pub global_max: Option<u64>,
    /// What [`resolve_watermark`] would return (None if the newest batch is unreadable).
    pub latest_max: Option<u64>,
    pub issues: Vec<AuditIssue>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.global_max == self.latest_max
    }
}

/// Check every batch of a topic, oldest first: each batch's smallest id must
/// be above the largest id of all batches before it. Read-only.
pub fn audit_batches(dir: &Path, topic: &str) -> Result<AuditReport> {
    let batches = list_batches(dir, topic)?;
    let mut report = AuditReport {
        batches: batches.len(),
        ..Default::default()
    };

    for (idx, batch) in batches.iter().enumerate() {
        let is_latest = idx + 1 == batches.len();
        let ids = match read_batch_ids(&batch.path) {
            Ok(ids) => ids,
            Err(e) => {
                report.issues.push(AuditIssue::Unreadable {
                    file: batch.path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        report.records += ids.len();
        let (Some(&min_id), Some(&max_id)) = (ids.iter().min(), ids.iter().max()) else {
            continue;
        };

        if let Some(prior_max) = report.global_max {
            if min_id <= prior_max {
                report.issues.push(AuditIssue::Overlap {
                    file: batch.path.clone(),
                    min_id,
                    prior_max,
                });
            }
        }
        report.global_max = Some(report.global_max.map_or(max_id, |m| m.max(max_id)));
        if is_latest {
            report.latest_max = Some(max_id);
        }
    }

    info!(
        topic,
        batches = report.batches,
        records = report.records,
        issues = report.issues.len(),
        "Audited batches"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_batch(dir: &Path, name: &str, ids: &[u64]) {
        let body: String = ids
            .iter()
            .map(|id| format!("{{\"id\":{id},\"full_text\":\"post {id}\"}}\n"))
            .collect();
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn empty_directory_has_no_watermark() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_watermark(dir.path(), "topic").unwrap(), None);
    }

    #[test]
    fn watermark_is_max_of_single_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(dir.path(), "topic-20180101000000000.txt", &[5, 9, 3]);
        assert_eq!(resolve_watermark(dir.path(), "topic").unwrap(), Some(9));
    }

    #[test]
    fn watermark_reads_only_the_newest_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(dir.path(), "topic-20180101000000000.txt", &[1, 2]);
        write_batch(dir.path(), "topic-20180201000000000.txt", &[30, 20]);
        // Corrupt history is not read.
        fs::write(dir.path().join("topic-20170101000000000.txt"), "garbage").unwrap();
        assert_eq!(resolve_watermark(dir.path(), "topic").unwrap(), Some(30));
    }

    #[test]
    fn corrupt_newest_batch_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(dir.path(), "topic-20180101000000000.txt", &[1, 2]);
        fs::write(dir.path().join("topic-20180201000000000.txt"), "{\"text\":\"no id\"}\n").unwrap();
        assert!(resolve_watermark(dir.path(), "topic").is_err());
    }

    #[test]
    fn audit_accepts_increasing_batches() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(dir.path(), "topic-20180101000000000.txt", &[3, 2, 1]);
        write_batch(dir.path(), "topic-20180108000000000.txt", &[9, 4]);
        let report = audit_batches(dir.path(), "topic").unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.records, 5);
        assert_eq!(report.global_max, Some(9));
    }

    #[test]
    fn audit_flags_overlap_and_stale_watermark() {
        let dir = tempfile::tempdir().unwrap();
        write_batch(dir.path(), "topic-20180101000000000.txt", &[10, 8]);
        write_batch(dir.path(), "topic-20180108000000000.txt", &[7, 6]);
        let report = audit_batches(dir.path(), "topic").unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.latest_max, Some(7));
        assert_eq!(report.global_max, Some(10));
        assert!(matches!(
            report.issues.as_slice(),
            [AuditIssue::Overlap { min_id: 6, prior_max: 10, .. }]
        ));
    }
}
