//! Dead-letter queue access.
//!
//! The engine only needs two operations from the queue: a long-polling
//! receive and a batched delete. `QueueService` abstracts them so the engine
//! can run against SQS or an in-memory queue in tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ServiceError;

/// A message received from the dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned identifier, stable across receives.
    pub message_id: String,
    /// Opaque handle required to delete this receipt of the message.
    pub receipt_handle: String,
    /// Raw message body.
    pub body: String,
}

/// One entry of a batch delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    /// Identifier unique within the request.
    pub id: String,
    pub receipt_handle: String,
}

impl DeleteEntry {
    /// Build the entry for the message at `index` in its batch.
    pub fn for_message(index: usize, message: &QueueMessage) -> Self {
        Self {
            id: format!("msg{index}"),
            receipt_handle: message.receipt_handle.clone(),
        }
    }
}

/// An entry the queue refused to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub id: String,
    pub message: String,
}

/// Result of a batch delete that reached the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub failed: Vec<DeleteFailure>,
}

impl DeleteOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Trait for the queue holding failed-invocation records.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Receive up to `max_messages` messages, waiting up to `wait_time` for
    /// the first one to arrive.
    ///
    /// An empty result means the queue had nothing visible within the wait.
    async fn receive(
        &self,
        max_messages: i32,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, ServiceError>;

    /// Delete the given receipts in one request.
    ///
    /// Entries the queue refuses are reported in the outcome; only a failure
    /// of the request as a whole is an error.
    async fn delete_batch(&self, entries: Vec<DeleteEntry>) -> Result<DeleteOutcome, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_entry_ids_follow_batch_position() {
        let message = QueueMessage {
            message_id: "a1".to_string(),
            receipt_handle: "rh-a1".to_string(),
            body: "{}".to_string(),
        };

        let entry = DeleteEntry::for_message(7, &message);
        assert_eq!(entry.id, "msg7");
        assert_eq!(entry.receipt_handle, "rh-a1");
    }

    #[test]
    fn test_delete_outcome_completeness() {
        assert!(DeleteOutcome::default().is_complete());

        let partial = DeleteOutcome {
            failed: vec![DeleteFailure {
                id: "msg0".to_string(),
                message: "ReceiptHandleIsInvalid".to_string(),
            }],
        };
        assert!(!partial.is_complete());
    }
}
