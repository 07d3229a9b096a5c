//! SQS dead-letter queue.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::{DeleteMessageBatchRequestEntry, Message};
use snafu::prelude::*;
use std::time::Duration;

use crate::dlq::{DeleteEntry, DeleteFailure, DeleteOutcome, QueueMessage, QueueService};
use crate::error::{IncompleteResponseSnafu, RequestSnafu, ServiceError};

use super::boxed;

const RECEIVE: &str = "ReceiveMessage";
const DELETE_BATCH: &str = "DeleteMessageBatch";

/// A dead-letter queue hosted on SQS.
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl QueueService for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, ServiceError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time.as_secs() as i32)
            .send()
            .await
            .map_err(boxed)
            .context(RequestSnafu { operation: RECEIVE })?;

        output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(queue_message)
            .collect()
    }

    async fn delete_batch(&self, entries: Vec<DeleteEntry>) -> Result<DeleteOutcome, ServiceError> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .receipt_handle(entry.receipt_handle)
                    .build()
                    .map_err(boxed)
                    .context(RequestSnafu {
                        operation: DELETE_BATCH,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(boxed)
            .context(RequestSnafu {
                operation: DELETE_BATCH,
            })?;

        let failed = output
            .failed()
            .iter()
            .map(|entry| DeleteFailure {
                id: entry.id().to_string(),
                message: entry.message().unwrap_or(entry.code()).to_string(),
            })
            .collect();

        Ok(DeleteOutcome { failed })
    }
}

fn queue_message(message: Message) -> Result<QueueMessage, ServiceError> {
    let missing = |field| IncompleteResponseSnafu {
        operation: RECEIVE,
        field,
    };

    Ok(QueueMessage {
        message_id: message.message_id.context(missing("MessageId"))?,
        receipt_handle: message.receipt_handle.context(missing("ReceiptHandle"))?,
        body: message.body.context(missing("Body"))?,
    })
}
