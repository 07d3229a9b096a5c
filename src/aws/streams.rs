//! DynamoDB Streams shard reader.

use async_trait::async_trait;
use aws_sdk_dynamodbstreams::Client;
use aws_sdk_dynamodbstreams::primitives::Blob;
use aws_sdk_dynamodbstreams::types::{self as sdk, ShardIteratorType};
use chrono::DateTime;
use snafu::prelude::*;
use std::collections::HashMap;

use crate::error::{IncompleteResponseSnafu, RequestSnafu, ServiceError};
use crate::stream::{
    AttributeValue, ChangeRecord, Identity, Image, RecordPage, StreamRecord, StreamService,
};

use super::boxed;

const GET_SHARD_ITERATOR: &str = "GetShardIterator";
const GET_RECORDS: &str = "GetRecords";

/// Reads change records from DynamoDB Streams.
pub struct DynamoDbStreams {
    client: Client,
}

impl DynamoDbStreams {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamService for DynamoDbStreams {
    async fn open_cursor(
        &self,
        stream_arn: &str,
        shard_id: &str,
        sequence_number: &str,
    ) -> Result<Option<String>, ServiceError> {
        let output = self
            .client
            .get_shard_iterator()
            .stream_arn(stream_arn)
            .shard_id(shard_id)
            .shard_iterator_type(ShardIteratorType::AtSequenceNumber)
            .sequence_number(sequence_number)
            .send()
            .await
            .map_err(boxed)
            .context(RequestSnafu {
                operation: GET_SHARD_ITERATOR,
            })?;

        Ok(output.shard_iterator)
    }

    async fn fetch_next(&self, cursor: &str, limit: i32) -> Result<RecordPage, ServiceError> {
        let output = self
            .client
            .get_records()
            .shard_iterator(cursor)
            .limit(limit)
            .send()
            .await
            .map_err(boxed)
            .context(RequestSnafu {
                operation: GET_RECORDS,
            })?;

        let records = output
            .records
            .unwrap_or_default()
            .into_iter()
            .map(change_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordPage {
            records,
            next_cursor: output.next_shard_iterator,
        })
    }
}

fn change_record(record: sdk::Record) -> Result<ChangeRecord, ServiceError> {
    Ok(ChangeRecord {
        aws_region: record.aws_region,
        dynamodb: record.dynamodb.map(stream_record).transpose()?,
        event_id: record.event_id,
        event_name: record.event_name.map(|name| name.as_str().to_string()),
        event_source: record.event_source,
        event_version: record.event_version,
        user_identity: record.user_identity.map(|identity| Identity {
            principal_id: identity.principal_id,
            kind: identity.r#type,
        }),
    })
}

fn stream_record(record: sdk::StreamRecord) -> Result<StreamRecord, ServiceError> {
    Ok(StreamRecord {
        approximate_creation_date_time: record
            .approximate_creation_date_time
            .and_then(|time| DateTime::from_timestamp(time.secs(), time.subsec_nanos())),
        keys: record.keys.map(image).transpose()?,
        new_image: record.new_image.map(image).transpose()?,
        old_image: record.old_image.map(image).transpose()?,
        sequence_number: record.sequence_number,
        size_bytes: record.size_bytes,
        stream_view_type: record
            .stream_view_type
            .map(|view| view.as_str().to_string()),
    })
}

fn image(attributes: HashMap<String, sdk::AttributeValue>) -> Result<Image, ServiceError> {
    attributes
        .into_iter()
        .map(|(name, value)| Ok::<_, ServiceError>((name, attribute_value(value)?)))
        .collect()
}

fn attribute_value(value: sdk::AttributeValue) -> Result<AttributeValue, ServiceError> {
    Ok(match value {
        sdk::AttributeValue::B(blob) => AttributeValue::B(blob.into_inner()),
        sdk::AttributeValue::Bool(flag) => AttributeValue::Bool(flag),
        sdk::AttributeValue::Bs(blobs) => {
            AttributeValue::Bs(blobs.into_iter().map(Blob::into_inner).collect())
        }
        sdk::AttributeValue::L(values) => AttributeValue::L(
            values
                .into_iter()
                .map(attribute_value)
                .collect::<Result<_, _>>()?,
        ),
        sdk::AttributeValue::M(map) => AttributeValue::M(image(map)?),
        sdk::AttributeValue::N(number) => AttributeValue::N(number),
        sdk::AttributeValue::Ns(numbers) => AttributeValue::Ns(numbers),
        sdk::AttributeValue::Null(flag) => AttributeValue::Null(flag),
        sdk::AttributeValue::S(text) => AttributeValue::S(text),
        sdk::AttributeValue::Ss(texts) => AttributeValue::Ss(texts),
        _ => {
            return IncompleteResponseSnafu {
                operation: GET_RECORDS,
                field: "AttributeValue",
            }
            .fail();
        }
    })
}
