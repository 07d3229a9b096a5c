//! Stream replay.
//!
//! A stream-triggered failure is recorded with only the position of its
//! batch. To redrive it, the shard is walked from the start of that range one
//! record at a time and the first record inside the range is re-delivered as
//! a single-record batch in the shape the function originally received.

use bytes::Bytes;
use snafu::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dlq::StreamBatchInfo;
use crate::emit;
use crate::error::{
    ExhaustReason, MissingBatchFieldSnafu, ReplayCancelledSnafu, ReplayEncodeSnafu, ReplayError,
    ReplayExhaustedSnafu, StreamTransportSnafu,
};
use crate::metrics::events::{ReplayCompleted, StreamRecordsFetched};

use super::record::{ChangeRecord, StreamEvent};
use super::sequence::{Position, SequenceRange};
use super::StreamService;

/// Records requested per fetch.
const FETCH_LIMIT: i32 = 1;

/// Validated position of the batch to replay.
struct ReplayTarget<'a> {
    stream_arn: &'a str,
    shard_id: &'a str,
    range: SequenceRange,
}

impl<'a> ReplayTarget<'a> {
    fn from_info(info: &'a StreamBatchInfo) -> Result<Self, ReplayError> {
        let required = [
            ("streamArn", &info.stream_arn),
            ("shardId", &info.shard_id),
            ("startSequenceNumber", &info.start_sequence_number),
            ("endSequenceNumber", &info.end_sequence_number),
        ];
        for (field, value) in required {
            ensure!(!value.is_empty(), MissingBatchFieldSnafu { field });
        }

        Ok(Self {
            stream_arn: &info.stream_arn,
            shard_id: &info.shard_id,
            range: SequenceRange::new(
                info.start_sequence_number.as_str(),
                info.end_sequence_number.as_str(),
            ),
        })
    }

    fn exhausted(&self, reason: ExhaustReason) -> ReplayError {
        ReplayExhaustedSnafu {
            shard_id: self.shard_id,
            start: self.range.start(),
            end: self.range.end(),
            reason,
        }
        .build()
    }
}

/// Rebuilds stream-triggered invocation payloads.
pub struct StreamReplayer {
    streams: Arc<dyn StreamService>,
    max_fetches: usize,
    shutdown: CancellationToken,
}

impl StreamReplayer {
    /// Create a replayer that gives up on a range after `max_fetches` reads.
    pub fn new(
        streams: Arc<dyn StreamService>,
        max_fetches: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            streams,
            max_fetches,
            shutdown,
        }
    }

    /// Recover the payload of the batch described by `info`.
    ///
    /// Returns the serialized `{"Records": [record]}` envelope for the first
    /// record whose sequence number lies in the batch's range.
    pub async fn replay(&self, info: &StreamBatchInfo) -> Result<Bytes, ReplayError> {
        let started = Instant::now();
        let target = ReplayTarget::from_info(info)?;

        let (record, fetches) = self.find_first_in_range(&target).await?;
        let payload = StreamEvent::single(record)
            .to_payload()
            .context(ReplayEncodeSnafu)?;

        emit!(ReplayCompleted {
            duration: started.elapsed(),
            fetches,
        });
        debug!(
            shard_id = target.shard_id,
            fetches,
            bytes = payload.len(),
            "Replayed stream record"
        );
        Ok(payload)
    }

    async fn find_first_in_range(
        &self,
        target: &ReplayTarget<'_>,
    ) -> Result<(ChangeRecord, usize), ReplayError> {
        let cursor = self
            .shutdown
            .run_until_cancelled(self.streams.open_cursor(
                target.stream_arn,
                target.shard_id,
                target.range.start(),
            ))
            .await
            .context(ReplayCancelledSnafu)?
            .context(StreamTransportSnafu)?;
        let mut cursor = cursor.ok_or_else(|| target.exhausted(ExhaustReason::NoCursor))?;

        let mut fetches = 0;
        loop {
            if fetches >= self.max_fetches {
                return Err(target.exhausted(ExhaustReason::FetchLimit { fetches }));
            }

            let page = self
                .shutdown
                .run_until_cancelled(self.streams.fetch_next(&cursor, FETCH_LIMIT))
                .await
                .context(ReplayCancelledSnafu)?
                .context(StreamTransportSnafu)?;
            fetches += 1;
            emit!(StreamRecordsFetched {
                count: page.records.len()
            });

            for record in page.records {
                let Some(sequence_number) = record.sequence_number() else {
                    warn!(
                        shard_id = target.shard_id,
                        "Skipping stream record without a sequence number"
                    );
                    continue;
                };

                match target.range.position(sequence_number) {
                    Position::Before => {
                        debug!(sequence_number, "Skipping record before range");
                    }
                    Position::Within => return Ok((record, fetches)),
                    Position::After => {
                        return Err(target.exhausted(ExhaustReason::PassedEnd {
                            seen: sequence_number.to_string(),
                        }));
                    }
                }
            }

            match page.next_cursor {
                Some(next) => cursor = next,
                None => return Err(target.exhausted(ExhaustReason::ShardClosed)),
            }
        }
    }
}
