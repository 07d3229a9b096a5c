//! Change-stream access and replay.
//!
//! - `record`: Native record model and the invocation envelope
//! - `sequence`: Sequence number ordering and ranges
//! - `replay`: Recovering the batch a failed invocation originally received

mod record;
mod replay;
pub mod sequence;

use async_trait::async_trait;

use crate::error::ServiceError;

pub use record::{AttributeValue, ChangeRecord, Identity, Image, StreamEvent, StreamRecord};
pub use replay::StreamReplayer;
pub use sequence::{Position, SequenceRange};

/// One page of records read through a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<ChangeRecord>,
    /// Cursor for the next read, or `None` once the shard is closed and drained.
    pub next_cursor: Option<String>,
}

/// Trait for reading records from a change-stream shard.
#[async_trait]
pub trait StreamService: Send + Sync {
    /// Open a cursor positioned at `sequence_number` (inclusive).
    ///
    /// Returns `None` if the stream hands out no cursor for that position.
    async fn open_cursor(
        &self,
        stream_arn: &str,
        shard_id: &str,
        sequence_number: &str,
    ) -> Result<Option<String>, ServiceError>;

    /// Read up to `limit` records from `cursor`.
    async fn fetch_next(&self, cursor: &str, limit: i32) -> Result<RecordPage, ServiceError>;
}
