//! Error types for redrive using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase. Nothing here is recovered locally:
//! every error aborts the current run and surfaces to the caller.

use snafu::prelude::*;

/// Boxed error produced by an underlying SDK or service client.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============ Service Errors ============

/// A queue, stream or function call failed at the service layer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ServiceError {
    /// The request itself failed (network, throttling, auth, ...).
    #[snafu(display("{operation} request failed"))]
    Request {
        operation: &'static str,
        source: BoxError,
    },

    /// The service answered without a field the caller depends on.
    #[snafu(display("{operation} response is missing {field}"))]
    IncompleteResponse {
        operation: &'static str,
        field: &'static str,
    },
}

// ============ Replay Errors ============

/// Why a stream walk ended without finding a record in range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The stream did not hand out a cursor for the start position.
    NoCursor,
    /// The shard is closed and has no more records.
    ShardClosed,
    /// A record past the end of the range was reached first.
    PassedEnd { seen: String },
    /// The per-item fetch bound was hit.
    FetchLimit { fetches: usize },
}

impl std::fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExhaustReason::NoCursor => write!(f, "no cursor for start position"),
            ExhaustReason::ShardClosed => write!(f, "shard closed"),
            ExhaustReason::PassedEnd { seen } => write!(f, "reached sequence number {seen}"),
            ExhaustReason::FetchLimit { fetches } => write!(f, "gave up after {fetches} fetches"),
        }
    }
}

/// Errors that can occur while replaying a change-stream batch.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReplayError {
    /// A required position field is missing or empty.
    #[snafu(display("Stream batch info is missing {field}"))]
    MissingBatchField { field: &'static str },

    /// The range was walked without yielding a record.
    #[snafu(display(
        "No record in [{start}, {end}] on shard {shard_id}: {reason}"
    ))]
    ReplayExhausted {
        shard_id: String,
        start: String,
        end: String,
        reason: ExhaustReason,
    },

    /// A stream call failed.
    #[snafu(display("Stream read failed"))]
    StreamTransport { source: ServiceError },

    /// The replayed record could not be serialized.
    #[snafu(display("Failed to encode replayed record"))]
    ReplayEncode { source: serde_json::Error },

    /// Shutdown was requested while reading the stream.
    #[snafu(display("Replay cancelled"))]
    ReplayCancelled,
}

// ============ Item Errors ============

/// Coarse classification of a per-item failure, used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MalformedItem,
    UnresolvablePayload,
    ReplayExhausted,
    Transport,
    FunctionExecution,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MalformedItem => "malformed_item",
            FailureKind::UnresolvablePayload => "unresolvable_payload",
            FailureKind::ReplayExhausted => "replay_exhausted",
            FailureKind::Transport => "transport",
            FailureKind::FunctionExecution => "function_execution",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

/// Errors that can occur while redriving a single dead-letter message.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ItemError {
    /// The message body is not a valid failed-item record.
    #[snafu(display("Malformed failed item"))]
    MalformedItem { source: serde_json::Error },

    /// Neither a stored payload nor stream batch info is present.
    #[snafu(display("No payload or stream batch info for request {request_id}"))]
    UnresolvablePayload { request_id: String },

    /// Reconstructing the payload from the stream failed.
    #[snafu(display("Stream replay failed"))]
    Replay { source: ReplayError },

    /// The invoke call itself failed.
    #[snafu(display("Invoking {function_arn} failed"))]
    InvokeTransport {
        function_arn: String,
        source: ServiceError,
    },

    /// The function ran and reported an error.
    #[snafu(display(
        "{function_arn} returned {function_error} (status {status_code})"
    ))]
    FunctionExecution {
        function_arn: String,
        status_code: i32,
        function_error: String,
    },

    /// Shutdown was requested while the item was in flight.
    #[snafu(display("Item cancelled"))]
    ItemCancelled,
}

impl ItemError {
    /// Classify this error for logging and metrics.
    pub fn kind(&self) -> FailureKind {
        match self {
            ItemError::MalformedItem { .. } => FailureKind::MalformedItem,
            ItemError::UnresolvablePayload { .. } => FailureKind::UnresolvablePayload,
            ItemError::Replay { source } => match source {
                ReplayError::StreamTransport { .. } => FailureKind::Transport,
                ReplayError::ReplayCancelled => FailureKind::Cancelled,
                ReplayError::MissingBatchField { .. } => FailureKind::UnresolvablePayload,
                ReplayError::ReplayExhausted { .. } | ReplayError::ReplayEncode { .. } => {
                    FailureKind::ReplayExhausted
                }
            },
            ItemError::InvokeTransport { .. } => FailureKind::Transport,
            ItemError::FunctionExecution { .. } => FailureKind::FunctionExecution,
            ItemError::ItemCancelled => FailureKind::Cancelled,
        }
    }

    /// Returns true if this failure came from a shutdown request.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == FailureKind::Cancelled
    }
}

// ============ Redrive Error (run level) ============

/// Errors that abort a redrive run.
///
/// Batches are numbered from 1 and items within a batch from 0.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RedriveError {
    /// Receiving a batch from the queue failed.
    #[snafu(display("Receiving batch {batch} failed"))]
    Receive { batch: usize, source: ServiceError },

    /// A message in the batch could not be redriven.
    #[snafu(display("Batch {batch}, item {index} (message {message_id}) failed"))]
    Item {
        batch: usize,
        index: usize,
        message_id: String,
        source: ItemError,
    },

    /// Deleting the redriven messages failed.
    #[snafu(display("Deleting batch {batch} failed"))]
    Delete { batch: usize, source: ServiceError },

    /// Shutdown was requested.
    #[snafu(display("Redrive cancelled during batch {batch}"))]
    Cancelled { batch: usize },
}

impl RedriveError {
    /// The failure kind of the offending item, if the run aborted on one.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            RedriveError::Item { source, .. } => Some(source.kind()),
            RedriveError::Cancelled { .. } => Some(FailureKind::Cancelled),
            RedriveError::Receive { .. } | RedriveError::Delete { .. } => {
                Some(FailureKind::Transport)
            }
        }
    }
}

// ============ Config Errors ============

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// No queue to drain.
    #[snafu(display("Queue URL cannot be empty"))]
    EmptyQueueUrl,

    /// Receive batch size outside what the queue accepts.
    #[snafu(display("receive.max_messages must be between 1 and 10, got {value}"))]
    InvalidMaxMessages { value: i32 },

    /// Long-poll wait outside what the queue accepts.
    #[snafu(display("receive.wait_time_secs must be between 0 and 20, got {value}"))]
    InvalidWaitTime { value: i32 },

    /// Replay would never fetch anything.
    #[snafu(display("replay.max_fetches must be greater than 0"))]
    ZeroMaxFetches,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Metrics Errors ============

/// Errors that can occur during metrics initialization.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MetricsError {
    /// Failed to initialize Prometheus recorder.
    #[snafu(display("Failed to initialize Prometheus recorder"))]
    PrometheusInit {
        source: metrics_exporter_prometheus::BuildError,
    },
}

// ============ App Error (top-level) ============

/// Top-level errors for the redrive binary.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum AppError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Address parsing error.
    #[snafu(display("Failed to parse address"))]
    AddressParse { source: std::net::AddrParseError },

    /// Metrics error.
    #[snafu(display("Metrics error"))]
    Metrics { source: MetricsError },

    /// The redrive run aborted.
    #[snafu(display("Redrive failed"))]
    Redrive { source: RedriveError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_error_kinds() {
        let exhausted = ItemError::Replay {
            source: ReplayError::ReplayExhausted {
                shard_id: "shardId-1".to_string(),
                start: "100".to_string(),
                end: "200".to_string(),
                reason: ExhaustReason::ShardClosed,
            },
        };
        assert_eq!(exhausted.kind(), FailureKind::ReplayExhausted);

        let transport = ItemError::Replay {
            source: ReplayError::StreamTransport {
                source: ServiceError::IncompleteResponse {
                    operation: "GetRecords",
                    field: "Records",
                },
            },
        };
        assert_eq!(transport.kind(), FailureKind::Transport);

        assert!(ItemError::ItemCancelled.is_cancelled());
        assert!(
            ItemError::Replay {
                source: ReplayError::ReplayCancelled
            }
            .is_cancelled()
        );
    }

    #[test]
    fn test_redrive_error_identifies_message() {
        let err = RedriveError::Item {
            batch: 2,
            index: 3,
            message_id: "m-42".to_string(),
            source: ItemError::FunctionExecution {
                function_arn: "arn:aws:lambda:eu-west-1:123:function:f".to_string(),
                status_code: 200,
                function_error: "Unhandled".to_string(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("Batch 2"));
        assert!(text.contains("item 3"));
        assert!(text.contains("m-42"));
        assert_eq!(err.failure_kind(), Some(FailureKind::FunctionExecution));
    }

    #[test]
    fn test_exhaust_reason_display() {
        let reason = ExhaustReason::PassedEnd {
            seen: "300".to_string(),
        };
        assert_eq!(reason.to_string(), "reached sequence number 300");
        assert_eq!(
            ExhaustReason::FetchLimit { fetches: 5 }.to_string(),
            "gave up after 5 fetches"
        );
    }
}
