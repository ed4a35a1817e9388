//! Timeout utilities for browser operations
//!
//! Every call into Chromium goes through [`with_page_timeout`] so a stuck
//! renderer cannot hang a scanner or worker indefinitely.

use std::future::Future;
use std::time::Duration;

use crate::error::BrowserError;

/// Run `operation` under `tokio::time::timeout`.
///
/// Expiry becomes [`BrowserError::Timeout`] naming `operation_name`; an
/// operation failure is passed through unchanged.
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T, BrowserError>
where
    F: Future<Output = Result<T, BrowserError>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(BrowserError::timeout(operation_name, timeout)),
    }
}

/// Keep `resource` only if `settle` succeeds; otherwise hand it to `discard`.
///
/// Used for tabs that exist before their first load finishes, so a slow or
/// failed load does not leave the target open.
pub async fn settle_or_discard<T, F, D, DF>(
    resource: T,
    settle: F,
    discard: D,
) -> Result<T, BrowserError>
where
    F: Future<Output = Result<(), BrowserError>>,
    D: FnOnce(T) -> DF,
    DF: Future<Output = ()>,
{
    match settle.await {
        Ok(()) => Ok(resource),
        Err(e) => {
            discard(resource).await;
            Err(e)
        }
    }
}
