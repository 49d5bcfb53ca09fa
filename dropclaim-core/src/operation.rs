//! Operation wrapper.
//!
//! Runs a unit of async work and turns every failure into an
//! [`OperationResult::Failure`] instead of propagating it. Everything above
//! the data-access layer consumes these results, never raw errors.

use std::future::Future;

use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

use crate::classify::{classify, RawFailure};
use crate::error::{ClassifiedError, ErrorContext, Result};
use crate::retry::{with_retry, RetryConfig};

/// Context key holding the operation name.
pub const OPERATION_KEY: &str = "operation";

/// Context key holding the per-failure diagnostic identifier.
pub const ERROR_ID_KEY: &str = "error_id";

/// Outcome of a wrapped operation: either data or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult<T> {
    Success(T),
    Failure(ClassifiedError),
}

impl<T> OperationResult<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        match self {
            Self::Success(data) => OperationResult::Success(f(data)),
            Self::Failure(err) => OperationResult::Failure(err),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Run `operation` once.
pub async fn run<T, E, F, Fut>(name: &str, context: ErrorContext, operation: F) -> OperationResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<RawFailure>,
{
    debug!(operation = name, "operation started");
    match operation().await {
        Ok(data) => {
            debug!(operation = name, "operation completed");
            OperationResult::Success(data)
        }
        Err(raw) => OperationResult::Failure(report_failure(name, context, raw)),
    }
}

/// Run `operation` under [`with_retry`].
pub async fn run_with_retry<T, E, F, Fut>(
    name: &str,
    context: ErrorContext,
    config: &RetryConfig,
    operation: F,
) -> OperationResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<RawFailure>,
{
    debug!(operation = name, max_retries = config.max_retries, "operation started");
    match with_retry(operation, config).await {
        Ok(data) => {
            debug!(operation = name, "operation completed");
            OperationResult::Success(data)
        }
        Err(err) => OperationResult::Failure(report_failure(name, context, err)),
    }
}

/// Classify, stamp and log a failure.
fn report_failure(name: &str, context: ErrorContext, raw: impl Into<RawFailure>) -> ClassifiedError {
    let error_id = Uuid::new_v4().to_string();
    let err = classify(raw, ErrorContext::new())
        .with_context_map(context)
        .with_context(OPERATION_KEY, name)
        .with_context(ERROR_ID_KEY, error_id.clone());

    error!(
        operation = name,
        error_id = %error_id,
        kind = %err.kind(),
        retryable = err.is_retryable(),
        "{}",
        err.message()
    );
    err
}
