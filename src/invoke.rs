//! Function invocation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ServiceError;

/// What a synchronous invocation returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeOutcome {
    pub status_code: i32,
    /// Set when the function itself failed (e.g. `Unhandled`).
    pub function_error: Option<String>,
    pub executed_version: Option<String>,
    pub payload: Bytes,
}

impl InvokeOutcome {
    /// A successful invocation returning `payload`.
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self {
            status_code: 200,
            payload: payload.into(),
            ..Default::default()
        }
    }
}

/// Trait for invoking the target function.
#[async_trait]
pub trait FunctionService: Send + Sync {
    /// Invoke `function_arn` synchronously with `payload`.
    ///
    /// A function-level failure is reported through
    /// [`InvokeOutcome::function_error`], not as an `Err`.
    async fn invoke(&self, function_arn: &str, payload: Bytes)
    -> Result<InvokeOutcome, ServiceError>;
}
