//! Lambda invocation.

use async_trait::async_trait;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use bytes::Bytes;
use snafu::prelude::*;

use crate::error::{RequestSnafu, ServiceError};
use crate::invoke::{FunctionService, InvokeOutcome};

use super::boxed;

/// Invokes Lambda functions synchronously.
pub struct LambdaFunctions {
    client: Client,
}

impl LambdaFunctions {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionService for LambdaFunctions {
    async fn invoke(
        &self,
        function_arn: &str,
        payload: Bytes,
    ) -> Result<InvokeOutcome, ServiceError> {
        let output = self
            .client
            .invoke()
            .function_name(function_arn)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(payload.to_vec()))
            .send()
            .await
            .map_err(boxed)
            .context(RequestSnafu {
                operation: "Invoke",
            })?;

        Ok(InvokeOutcome {
            status_code: output.status_code,
            function_error: output.function_error,
            executed_version: output.executed_version,
            payload: output
                .payload
                .map(|blob| Bytes::from(blob.into_inner()))
                .unwrap_or_default(),
        })
    }
}
