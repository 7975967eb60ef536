//! Paginated collection of one topic into one batch file.
//!
//! The collector walks backward through the search results of a single run:
//! the first page is the newest posts above the watermark, every following
//! page asks for posts at or below `cursor - 1`, where `cursor` is the oldest
//! id of the previous page. The walk stops when a page comes back empty, when
//! the result ceiling is hit, or on the first remote error.

use std::path::{Path, PathBuf};

use search_client::{SearchParams, Tweet};
use tracing::{debug, error, info};

use crate::batch::BatchWriter;
use crate::error::CollectError;
use crate::search::PostSearch;

/// Result of asking the remote side for one page.
#[derive(Debug)]
pub enum PageOutcome {
    Records(Vec<Tweet>),
    /// Nothing left within the requested bounds.
    Exhausted,
    Fault(String),
}

/// Result of one collection run for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// At least one record was written; the batch file is complete.
    Collected {
        file: PathBuf,
        count: u64,
        pages: u32,
        /// Highest id of the run, i.e. the next run's watermark.
        newest_id: u64,
        oldest_id: u64,
    },
    /// Nothing newer than the watermark; no batch file was left behind.
    Empty,
    /// The run was aborted; no batch file was left behind.
    Fault(String),
}

/// Paging state within one run.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    /// Oldest id seen so far in this run.
    oldest: Option<u64>,
    count: u64,
}

impl Cursor {
    /// Inclusive upper bound for the next page, `None` on the first page.
    /// Returns `Err(())` when the previous page ended at id 0 and nothing
    /// older can exist.
    fn upper_bound(&self) -> Result<Option<u64>, ()> {
        match self.oldest {
            None => Ok(None),
            Some(0) => Err(()),
            Some(id) => Ok(Some(id - 1)),
        }
    }
}

pub struct Collector<S> {
    search: S,
    page_size: u32,
    max_results: u64,
}

impl<S: PostSearch> Collector<S> {
    pub fn new(search: S, page_size: u32, max_results: u64) -> Self {
        Self {
            search,
            page_size: page_size.max(1),
            max_results,
        }
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    /// Collect every post matching `query` above `watermark` into a new batch
    /// file at `dest`. The file is removed again unless the run ends with at
    /// least one record and no fault.
    pub async fn collect(&self, query: &str, dest: &Path, watermark: Option<u64>) -> CollectOutcome {
        let mut writer = match BatchWriter::create(dest) {
            Ok(writer) => writer,
            Err(e) => {
                error!(file = %dest.display(), error = %e, "Cannot create batch file");
                return CollectOutcome::Fault(e.to_string());
            }
        };

        let mut cursor = Cursor::default();
        let mut pages: u32 = 0;
        let mut newest_id: Option<u64> = None;

        while cursor.count < self.max_results {
            let Ok(max_id) = cursor.upper_bound() else {
                debug!("Reached id 0, nothing older to fetch");
                break;
            };

            let remaining = self.max_results - cursor.count;
            let count = u64::from(self.page_size).min(remaining) as u32;
            let params = SearchParams::new(query, count)
                .since_id(watermark)
                .max_id(max_id);

            match self.fetch_page(&params).await {
                PageOutcome::Exhausted if cursor.count == 0 => {
                    info!(query, "No posts found, no batch file created");
                    writer.discard();
                    return CollectOutcome::Empty;
                }
                PageOutcome::Exhausted => {
                    debug!(query, "No more posts, search exhausted");
                    break;
                }
                PageOutcome::Fault(reason) => {
                    error!(query, error = %reason, collected = cursor.count, "Collection aborted, discarding batch");
                    writer.discard();
                    return CollectOutcome::Fault(reason);
                }
                PageOutcome::Records(page) => {
                    if let Err(e) = writer.append(&page) {
                        error!(error = %e, "Failed to write page, discarding batch");
                        writer.discard();
                        return CollectOutcome::Fault(e.to_string());
                    }
                    newest_id.get_or_insert(page[0].id);
                    cursor.count += page.len() as u64;
                    cursor.oldest = page.last().map(|t| t.id);
                    pages += 1;
                    debug!(
                        page = pages,
                        page_len = page.len(),
                        collected = cursor.count,
                        oldest = ?cursor.oldest,
                        "Downloaded page"
                    );
                }
            }
        }

        let (Some(newest_id), Some(oldest_id)) = (newest_id, cursor.oldest) else {
            // Ceiling of zero: nothing was requested.
            writer.discard();
            return CollectOutcome::Empty;
        };

        match writer.finish() {
            Ok(file) => CollectOutcome::Collected {
                file,
                count: cursor.count,
                pages,
                newest_id,
                oldest_id,
            },
            Err(e) => {
                error!(file = %dest.display(), error = %e, "Failed to finalize batch");
                remove_quietly(dest);
                CollectOutcome::Fault(e.to_string())
            }
        }
    }

    /// Request one page and check it against the bounds it was asked for.
    pub async fn fetch_page(&self, params: &SearchParams) -> PageOutcome {
        let page = match self.search.search_page(params).await {
            Ok(page) => page,
            Err(e) => return PageOutcome::Fault(CollectError::from(e).to_string()),
        };
        if page.is_empty() {
            return PageOutcome::Exhausted;
        }
        match check_page(&page, params) {
            Ok(()) => PageOutcome::Records(page),
            Err(e) => PageOutcome::Fault(e.to_string()),
        }
    }
}

/// A page must be strictly newest-first and stay inside the requested bounds.
/// Anything else would break the no-duplicates guarantee across runs.
fn check_page(page: &[Tweet], params: &SearchParams) -> Result<(), CollectError> {
    for pair in page.windows(2) {
        if pair[1].id >= pair[0].id {
            return Err(CollectError::Precondition(format!(
                "page not in descending id order ({} then {})",
                pair[0].id, pair[1].id
            )));
        }
    }
    // Sorted descending, so the first and last records are the extremes.
    let (newest, oldest) = (page[0].id, page[page.len() - 1].id);
    if let Some(since_id) = params.since_id {
        if oldest <= since_id {
            return Err(CollectError::Precondition(format!(
                "id {oldest} is not above watermark {since_id}"
            )));
        }
    }
    if let Some(max_id) = params.max_id {
        if newest > max_id {
            return Err(CollectError::Precondition(format!(
                "id {newest} is above page bound {max_id}"
            )));
        }
    }
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            error!(file = %path.display(), error = %e, "Failed to remove batch file");
        }
    }
}
