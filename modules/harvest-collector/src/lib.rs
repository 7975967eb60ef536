pub mod batch;
pub mod collector;
pub mod error;
pub mod run;
pub mod search;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod watermark;

pub use batch::{list_batches, read_batch, read_batch_ids, BatchFile, BatchName, BatchWriter};
pub use collector::{CollectOutcome, Collector, PageOutcome};
pub use error::{CollectError, Result};
pub use run::{run_collection, TopicOutcome, TopicSummary};
pub use search::PostSearch;
pub use watermark::{audit_batches, resolve_watermark, AuditIssue, AuditReport};
