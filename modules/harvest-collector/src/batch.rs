//! Batch files: one NDJSON file per collection run per topic.
//!
//! Names are `{topic}-{YYYYMMDDHHMMSSmmm}.txt`. The timestamp is UTC,
//! zero-padded and fixed width, so byte order of names equals chronological
//! order of runs. Listing still sorts on the parsed timestamp.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use search_client::Tweet;

use crate::error::{CollectError, Result};

const EXTENSION: &str = ".txt";
const TIMESTAMP_WIDTH: usize = 17;

// ---------------------------------------------------------------------------
// BatchName
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchName {
    pub topic: String,
    pub created_at: DateTime<Utc>,
}

impl BatchName {
    pub fn new(topic: &str, created_at: DateTime<Utc>) -> Result<Self> {
        if topic.is_empty() || topic.contains(['-', '/', '\\']) {
            return Err(CollectError::BatchName(format!(
                "topic {topic:?} cannot be used in a file name"
            )));
        }
        if !(1000..=9999).contains(&created_at.year()) {
            return Err(CollectError::BatchName(format!(
                "year {} does not fit the fixed-width timestamp",
                created_at.year()
            )));
        }
        // Sub-millisecond precision is not representable in the name.
        let created_at = created_at
            .with_nanosecond(created_at.timestamp_subsec_millis() * 1_000_000)
            .unwrap_or(created_at);
        Ok(Self {
            topic: topic.to_string(),
            created_at,
        })
    }

    pub fn timestamp(&self) -> String {
        let t = &self.created_at;
        format!(
            "{:04}{:02}{:02}{:02}{:02}{:02}{:03}",
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second(),
            t.timestamp_subsec_millis()
        )
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}{}", self.topic, self.timestamp(), EXTENSION)
    }

    pub fn parse(file_name: &str) -> Result<Self> {
        let invalid = || CollectError::BatchName(file_name.to_string());

        let stem = file_name.strip_suffix(EXTENSION).ok_or_else(invalid)?;
        let (topic, ts) = stem.rsplit_once('-').ok_or_else(invalid)?;
        if topic.is_empty() || ts.len() != TIMESTAMP_WIDTH || !ts.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let field = |range: std::ops::Range<usize>| -> u32 {
            // Digits-only was checked above.
            ts[range].parse().unwrap_or(0)
        };
        let created_at = NaiveDate::from_ymd_opt(field(0..4) as i32, field(4..6), field(6..8))
            .and_then(|d| d.and_hms_milli_opt(field(8..10), field(10..12), field(12..14), field(14..17)))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .ok_or_else(invalid)?;

        Ok(Self {
            topic: topic.to_string(),
            created_at,
        })
    }
}

/// A batch file on disk with its parsed name.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub name: BatchName,
    pub path: PathBuf,
}

/// List a topic's batch files, oldest first. A missing directory has no batches.
/// Files that are not batches of `topic` are skipped.
pub fn list_batches(dir: &Path, topic: &str) -> Result<Vec<BatchFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CollectError::io(dir, e)),
    };

    let mut batches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CollectError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match BatchName::parse(file_name) {
            Ok(name) if name.topic == topic => batches.push(BatchFile { name, path }),
            Ok(name) => debug!(file = file_name, other_topic = %name.topic, "Skipping batch of another topic"),
            Err(_) => debug!(file = file_name, "Skipping non-batch file"),
        }
    }

    batches.sort_by(|a, b| {
        a.name
            .created_at
            .cmp(&b.name.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(batches)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RecordId {
    id: u64,
}

/// Read every post identifier in a batch, in file order.
///
/// Fails on the first line that is not a JSON object with an unsigned `id`,
/// and on a file with no records at all.
pub fn read_batch_ids(path: &Path) -> Result<Vec<u64>> {
    let file = File::open(path).map_err(|e| CollectError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut ids = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CollectError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RecordId =
            serde_json::from_str(&line).map_err(|e| CollectError::CorruptBatch {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: e.to_string(),
            })?;
        ids.push(record.id);
    }

    if ids.is_empty() {
        return Err(CollectError::EmptyBatch(path.to_path_buf()));
    }
    Ok(ids)
}

/// Read full records from a batch, in file order.
pub fn read_batch(path: &Path) -> Result<Vec<Tweet>> {
    let file = File::open(path).map_err(|e| CollectError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CollectError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Tweet = serde_json::from_str(&line).map_err(|e| CollectError::CorruptBatch {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Appends pages to a new batch file. Never opens an existing file: a batch
/// is written by exactly one run.
pub struct BatchWriter {
    path: PathBuf,
    out: Option<BufWriter<File>>,
}

impl BatchWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| CollectError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: Some(BufWriter::new(file)),
        })
    }

    /// Append one page, one record per line, and flush it to the file.
    pub fn append(&mut self, page: &[Tweet]) -> Result<()> {
        let path = &self.path;
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| CollectError::io(path, std::io::ErrorKind::BrokenPipe.into()))?;
        for record in page {
            serde_json::to_writer(&mut *out, record).map_err(|e| CollectError::io(path, e.into()))?;
            out.write_all(b"\n").map_err(|e| CollectError::io(path, e))?;
        }
        out.flush().map_err(|e| CollectError::io(path, e))
    }

    /// Flush and sync the completed batch.
    pub fn finish(mut self) -> Result<PathBuf> {
        if let Some(out) = self.out.take() {
            let file = out
                .into_inner()
                .map_err(|e| CollectError::io(&self.path, e.into_error()))?;
            file.sync_all().map_err(|e| CollectError::io(&self.path, e))?;
        }
        Ok(self.path.clone())
    }

    /// Close and delete the file so no partial batch survives.
    pub fn discard(mut self) {
        drop(self.out.take());
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(file = %self.path.display(), "Discarded batch file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(file = %self.path.display(), error = %e, "Failed to remove batch file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(y, mo, d)
                .unwrap()
                .and_hms_milli_opt(h, mi, s, ms)
                .unwrap(),
        )
    }

    #[test]
    fn name_is_fixed_width_and_zero_padded() {
        let name = BatchName::new("interdisciplinary", at(2018, 7, 5, 3, 4, 9, 7)).unwrap();
        assert_eq!(name.timestamp(), "20180705030409007");
        assert_eq!(name.file_name(), "interdisciplinary-20180705030409007.txt");
    }

    #[test]
    fn name_parses_back() {
        let name = BatchName::new("multidisciplinary", at(2019, 12, 31, 23, 59, 58, 999)).unwrap();
        let parsed = BatchName::parse(&name.file_name()).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn lexicographic_order_matches_chronological_order() {
        let base = at(2018, 1, 9, 9, 59, 59, 998);
        let stamps = [
            base,
            base + Duration::milliseconds(1),
            base + Duration::milliseconds(2),
            base + Duration::seconds(1),
            base + Duration::days(1),
            base + Duration::days(40),
            base + Duration::days(400),
        ];
        let mut names: Vec<String> = stamps
            .iter()
            .rev()
            .map(|t| BatchName::new("t", *t).unwrap().file_name())
            .collect();
        names.sort();
        let expected: Vec<String> = stamps
            .iter()
            .map(|t| BatchName::new("t", *t).unwrap().file_name())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "interdisciplinary.txt",
            "interdisciplinary-2018.txt",
            "interdisciplinary-20180705030409007.json",
            "-20180705030409007.txt",
            "interdisciplinary-2018070503040900x.txt",
            "interdisciplinary-20181305030409007.txt",
        ] {
            assert!(BatchName::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn rejects_topics_that_break_the_name() {
        assert!(BatchName::new("a-b", Utc::now()).is_err());
        assert!(BatchName::new("", Utc::now()).is_err());
    }

    #[test]
    fn listing_skips_foreign_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "topic-20180102000000000.txt",
            "topic-20180101000000000.txt",
            "other-20180103000000000.txt",
            "notes.md",
        ] {
            fs::write(dir.path().join(name), "{\"id\":1}\n").unwrap();
        }
        let batches = list_batches(dir.path(), "topic").unwrap();
        let names: Vec<String> = batches.iter().map(|b| b.name.file_name()).collect();
        assert_eq!(
            names,
            ["topic-20180101000000000.txt", "topic-20180102000000000.txt"]
        );
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let batches = list_batches(&dir.path().join("absent"), "topic").unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn writer_refuses_to_reopen_existing_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topic-20180101000000000.txt");
        fs::write(&path, "{\"id\":1}\n").unwrap();
        assert!(BatchWriter::create(&path).is_err());
    }

    #[test]
    fn corrupt_line_is_reported_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topic-20180101000000000.txt");
        fs::write(&path, "{\"id\":1}\nnot json\n").unwrap();
        match read_batch_ids(&path) {
            Err(CollectError::CorruptBatch { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt batch, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topic-20180101000000000.txt");
        fs::write(&path, "\n").unwrap();
        assert!(matches!(
            read_batch_ids(&path),
            Err(CollectError::EmptyBatch(_))
        ));
    }
}
