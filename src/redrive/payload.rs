//! Payload resolution for a failed item.

use bytes::Bytes;
use serde_json::value::RawValue;
use snafu::prelude::*;

use crate::dlq::{FailedItem, StreamBatchInfo};
use crate::error::{ItemError, ReplaySnafu, UnresolvablePayloadSnafu};
use crate::metrics::events::PayloadKind;
use crate::stream::StreamReplayer;

/// Where the payload for a redrive comes from.
#[derive(Debug, Clone, Copy)]
pub enum PayloadSource<'a> {
    /// The request payload stored on the item, sent verbatim.
    Direct(&'a RawValue),
    /// A change-stream batch that has to be replayed.
    Stream(&'a StreamBatchInfo),
}

impl<'a> PayloadSource<'a> {
    /// Choose the payload source for `item`.
    ///
    /// A stored request payload always wins, so an item carrying both never
    /// touches the stream.
    pub fn for_item(item: &'a FailedItem) -> Result<Self, ItemError> {
        if let Some(raw) = item.stored_payload() {
            return Ok(PayloadSource::Direct(raw));
        }
        match &item.stream_batch_info {
            Some(info) => Ok(PayloadSource::Stream(info)),
            None => UnresolvablePayloadSnafu {
                request_id: &item.request_context.request_id,
            }
            .fail(),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            PayloadSource::Direct(_) => PayloadKind::Direct,
            PayloadSource::Stream(_) => PayloadKind::Stream,
        }
    }

    /// Produce the bytes to invoke the function with.
    pub async fn resolve(self, replayer: &StreamReplayer) -> Result<Bytes, ItemError> {
        match self {
            PayloadSource::Direct(raw) => Ok(Bytes::copy_from_slice(raw.get().as_bytes())),
            PayloadSource::Stream(info) => replayer.replay(info).await.context(ReplaySnafu),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(extra: &str) -> FailedItem {
        let body = format!(
            r#"{{"version":"1.0","timestamp":"2024-05-01T10:00:00Z","requestContext":{{"requestId":"req-1","functionArn":"fn"}}{extra}}}"#
        );
        FailedItem::decode(&body).unwrap()
    }

    const BATCH_INFO: &str = r#","DDBStreamBatchInfo":{"shardId":"s","startSequenceNumber":"1","endSequenceNumber":"2","streamArn":"arn"}"#;

    #[test]
    fn test_stored_payload_is_direct() {
        let item = item(r#","requestPayload":{"a": 1}"#);
        let source = PayloadSource::for_item(&item).unwrap();

        assert_eq!(source.kind(), PayloadKind::Direct);
        assert!(matches!(source, PayloadSource::Direct(raw) if raw.get() == r#"{"a": 1}"#));
    }

    #[test]
    fn test_stored_payload_wins_over_batch_info() {
        let item = item(&format!(r#","requestPayload":[1,2]{BATCH_INFO}"#));
        let source = PayloadSource::for_item(&item).unwrap();
        assert_eq!(source.kind(), PayloadKind::Direct);
    }

    #[test]
    fn test_batch_info_is_stream() {
        let item = item(BATCH_INFO);
        let source = PayloadSource::for_item(&item).unwrap();

        assert_eq!(source.kind(), PayloadKind::Stream);
        assert!(matches!(source, PayloadSource::Stream(info) if info.shard_id == "s"));
    }

    #[test]
    fn test_neither_is_unresolvable() {
        let item = item("");
        let err = PayloadSource::for_item(&item).unwrap_err();

        match err {
            ItemError::UnresolvablePayload { request_id } => assert_eq!(request_id, "req-1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
