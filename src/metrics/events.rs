//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence during a redrive run.
//! Events implement the `InternalEvent` trait which emits the corresponding
//! Prometheus metric.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

use crate::error::FailureKind;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Where a redriven payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// The stored request payload was sent verbatim.
    Direct,
    /// The payload was rebuilt from the change stream.
    Stream,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Direct => "direct",
            PayloadKind::Stream => "stream",
        }
    }
}

/// Event emitted when a receive call returns messages.
pub struct MessagesReceived {
    pub count: usize,
}

impl InternalEvent for MessagesReceived {
    fn emit(self) {
        trace!(count = self.count, "Messages received");
        counter!("redrive_messages_received_total").increment(self.count as u64);
    }
}

/// Event emitted when redriven messages are deleted from the queue.
pub struct MessagesDeleted {
    pub count: usize,
}

impl InternalEvent for MessagesDeleted {
    fn emit(self) {
        trace!(count = self.count, "Messages deleted");
        counter!("redrive_messages_deleted_total").increment(self.count as u64);
    }
}

/// Event emitted when the queue refuses to delete some entries of a batch.
pub struct DeleteFailures {
    pub count: usize,
}

impl InternalEvent for DeleteFailures {
    fn emit(self) {
        trace!(count = self.count, "Delete failures");
        counter!("redrive_delete_failures_total").increment(self.count as u64);
    }
}

/// Event emitted when a message was invoked successfully.
pub struct ItemRedriven {
    pub source: PayloadKind,
}

impl InternalEvent for ItemRedriven {
    fn emit(self) {
        trace!(source = self.source.as_str(), "Item redriven");
        counter!("redrive_items_redriven_total", "source" => self.source.as_str()).increment(1);
    }
}

/// Event emitted when a message could not be redriven.
pub struct ItemFailed {
    pub kind: FailureKind,
}

impl InternalEvent for ItemFailed {
    fn emit(self) {
        trace!(kind = self.kind.as_str(), "Item failed");
        counter!("redrive_items_failed_total", "kind" => self.kind.as_str()).increment(1);
    }
}

/// Event emitted for every page read from the change stream.
pub struct StreamRecordsFetched {
    pub count: usize,
}

impl InternalEvent for StreamRecordsFetched {
    fn emit(self) {
        trace!(count = self.count, "Stream records fetched");
        counter!("redrive_stream_fetches_total").increment(1);
        counter!("redrive_stream_records_total").increment(self.count as u64);
    }
}

// ============================================================================
// Histogram events for timing
// ============================================================================

/// Event emitted when a stream replay finds its record.
pub struct ReplayCompleted {
    pub duration: Duration,
    pub fetches: usize,
}

impl InternalEvent for ReplayCompleted {
    fn emit(self) {
        trace!(
            duration_ms = self.duration.as_millis(),
            fetches = self.fetches,
            "Replay completed"
        );
        histogram!("redrive_replay_duration_seconds").record(self.duration.as_secs_f64());
        histogram!("redrive_replay_fetches").record(self.fetches as f64);
    }
}

/// Event emitted when a function invocation returns.
pub struct InvokeCompleted {
    pub duration: Duration,
}

impl InternalEvent for InvokeCompleted {
    fn emit(self) {
        trace!(duration_ms = self.duration.as_millis(), "Invoke completed");
        histogram!("redrive_invoke_duration_seconds").record(self.duration.as_secs_f64());
    }
}

/// Event emitted when a received batch has been fully handled.
pub struct BatchCompleted {
    pub duration: Duration,
}

impl InternalEvent for BatchCompleted {
    fn emit(self) {
        trace!(duration_ms = self.duration.as_millis(), "Batch completed");
        histogram!("redrive_batch_duration_seconds").record(self.duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_values() {
        assert_eq!(PayloadKind::Direct.as_str(), "direct");
        assert_eq!(PayloadKind::Stream.as_str(), "stream");
        assert_eq!(FailureKind::ReplayExhausted.as_str(), "replay_exhausted");
    }

    #[test]
    fn test_emit_without_recorder_is_noop() {
        crate::emit!(MessagesReceived { count: 3 });
        crate::emit!(ItemFailed {
            kind: FailureKind::FunctionExecution
        });
        crate::emit!(ReplayCompleted {
            duration: Duration::from_millis(5),
            fetches: 2,
        });
    }
}
