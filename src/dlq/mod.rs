//! Dead-letter queue records and access.
//!
//! # Components
//!
//! - [`FailedItem`] - The record describing one failed invocation
//! - [`QueueService`] - Receive and batch-delete operations on the queue

mod item;
mod queue;

pub use item::{FailedItem, RequestContext, ResponseContext, StreamBatchInfo};
pub use queue::{DeleteEntry, DeleteFailure, DeleteOutcome, QueueMessage, QueueService};
