//! The failed-invocation record found on the dead-letter queue.
//!
//! Field names follow the record Lambda writes for a failed asynchronous or
//! stream-triggered invocation. The request and response payloads are kept as
//! raw JSON text so they survive a decode/encode cycle byte for byte.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use snafu::prelude::*;

use crate::error::{ItemError, MalformedItemSnafu};

/// One dead-letter record describing a failed invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    /// Format tag of the record.
    #[serde(default)]
    pub version: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "requestContext")]
    pub request_context: RequestContext,
    #[serde(rename = "responseContext", default)]
    pub response_context: ResponseContext,
    /// The original invocation input, when it could be stored inline.
    #[serde(
        rename = "requestPayload",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub request_payload: Option<Box<RawValue>>,
    /// What the failed invocation returned. Informational only.
    #[serde(
        rename = "responsePayload",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_payload: Option<Box<RawValue>>,
    /// Position of the originating batch, for stream-triggered invocations.
    #[serde(
        rename = "DDBStreamBatchInfo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stream_batch_info: Option<StreamBatchInfo>,
}

/// What was invoked and why it ended up on the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub request_id: String,
    pub function_arn: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub approximate_invoke_count: u32,
}

/// How the original invocation failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseContext {
    #[serde(default)]
    pub status_code: i32,
    #[serde(default)]
    pub executed_version: String,
    #[serde(default)]
    pub function_error: String,
}

/// Position of a change-stream batch within its shard.
///
/// Sequence numbers are inclusive bounds. The arrival times and batch size
/// are carried for reporting only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamBatchInfo {
    #[serde(default)]
    pub shard_id: String,
    #[serde(default)]
    pub start_sequence_number: String,
    #[serde(default)]
    pub end_sequence_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approximate_arrival_of_first_record: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approximate_arrival_of_last_record: Option<DateTime<Utc>>,
    #[serde(default)]
    pub batch_size: u32,
    #[serde(default)]
    pub stream_arn: String,
}

impl FailedItem {
    /// Decode a queue message body.
    pub fn decode(body: &str) -> Result<Self, ItemError> {
        serde_json::from_str(body).context(MalformedItemSnafu)
    }

    /// The stored request payload. A JSON `null` decodes as absent.
    pub fn stored_payload(&self) -> Option<&RawValue> {
        self.request_payload.as_deref()
    }
}
