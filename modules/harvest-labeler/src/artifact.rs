//! The label artifact: one `[post_id, label_code, topic_code]` row per
//! labeled post, written as a single JSON array that replaces any previous
//! artifact.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LabelError, Result};

/// `(post_id, label_code, topic_code)`, serialized as a three-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRow(pub u64, pub u8, pub u8);

impl LabelRow {
    pub fn post_id(&self) -> u64 {
        self.0
    }

    pub fn label_code(&self) -> u8 {
        self.1
    }

    pub fn topic_code(&self) -> u8 {
        self.2
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelArtifact {
    rows: Vec<LabelRow>,
}

impl LabelArtifact {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: LabelRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[LabelRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the artifact to `path`, replacing any previous one. The rows go
    /// to a temp file next to `path` first, which is then renamed over it.
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| LabelError::io(dir, e))?;

        let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| LabelError::io(dir, e))?;
        {
            let mut out = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut out, &self.rows)?;
            out.flush().map_err(|e| LabelError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| LabelError::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| LabelError::io(path, e.error))?;

        info!(path = %path.display(), rows = self.rows.len(), "Wrote label artifact");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|e| LabelError::io(path, e))?;
        let rows: Vec<LabelRow> = serde_json::from_slice(&raw)?;
        Ok(Self { rows })
    }
}
