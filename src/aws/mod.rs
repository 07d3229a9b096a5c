//! AWS implementations of the queue, stream and function services.
//!
//! - `sqs`: [`SqsQueue`] over `ReceiveMessage` / `DeleteMessageBatch`
//! - `streams`: [`DynamoDbStreams`] over `GetShardIterator` / `GetRecords`
//! - `lambda`: [`LambdaFunctions`] over synchronous `Invoke`

mod lambda;
mod sqs;
mod streams;

pub use lambda::LambdaFunctions;
pub use sqs::SqsQueue;
pub use streams::DynamoDbStreams;

use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use std::sync::Arc;
use tracing::debug;

use crate::config::AwsConfig;
use crate::error::BoxError;
use crate::redrive::Services;

/// Build SDK clients from the default provider chain plus `config` overrides.
pub async fn services(config: &AwsConfig, queue_url: &str) -> Services {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(endpoint) = &config.endpoint_url {
        debug!("Using custom AWS endpoint {}", endpoint);
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;

    Services {
        queue: Arc::new(SqsQueue::new(
            aws_sdk_sqs::Client::new(&sdk_config),
            queue_url,
        )),
        streams: Arc::new(DynamoDbStreams::new(aws_sdk_dynamodbstreams::Client::new(
            &sdk_config,
        ))),
        functions: Arc::new(LambdaFunctions::new(aws_sdk_lambda::Client::new(
            &sdk_config,
        ))),
    }
}

fn boxed<E>(error: E) -> BoxError
where
    E: std::error::Error + Send + Sync + 'static,
{
    Box::new(error)
}
