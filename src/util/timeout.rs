//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::ChatcastError;

/// Wrap a future with a timeout. The inner future is dropped when the
/// deadline passes.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ChatcastError>>,
) -> Result<T, ChatcastError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ChatcastError::Timeout(duration.as_millis() as u64)),
    }
}
