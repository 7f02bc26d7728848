//! Order-preserving concurrent fan-out for batch operations.
//!
//! Every entry of a batch gets its own task, so concurrency equals the batch
//! length and nothing queues behind a slow entry. Results are reassembled in
//! input order regardless of completion order.

use crate::error::ExtendedClientError;
use std::future::Future;
use tracing::debug;

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;

/// Run `work` once per input concurrently and return outputs in input order
///
/// All tasks run to completion before this returns, so no worker outlives the
/// batch call. If any worker fails, the failure of the earliest failing entry
/// is returned; work already done by the other entries is not undone.
///
/// # Errors
///
/// - The error returned by the earliest failing entry
/// - [`ExtendedClientError::BatchWorker`] if a worker task panicked or was
///   cancelled
pub async fn map_ordered<T, R, F, Fut>(inputs: Vec<T>, work: F) -> Result<Vec<R>, ExtendedClientError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, ExtendedClientError>> + Send + 'static,
{
    let count = inputs.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    debug!(count, "Dispatching batch workers");

    let handles: Vec<_> = inputs
        .into_iter()
        .map(|input| tokio::spawn(work(input)))
        .collect();

    let mut outputs = Vec::with_capacity(count);
    let mut first_error = None;

    for (index, handle) in handles.into_iter().enumerate() {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ExtendedClientError::BatchWorker {
                message: format!("worker for entry {} did not complete: {}", index, e),
            }),
        };

        match result {
            Ok(output) => outputs.push(output),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(outputs),
    }
}
