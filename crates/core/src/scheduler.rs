use std::{future::Future, num::NonZeroUsize};

use tokio::task::JoinSet;
use tracing::debug;

use crate::error::Result;

/// Upper bound on concurrent slide jobs. Most of their cost is waiting on the
/// speech provider or the encoder, not on local CPU.
pub const MAX_BATCH_SIZE: usize = 4;

/// `max(1, min(available - 1, MAX_BATCH_SIZE))`: one core always stays free.
pub fn batch_size_for(available_parallelism: usize) -> usize {
    available_parallelism
        .saturating_sub(1)
        .min(MAX_BATCH_SIZE)
        .max(1)
}

pub fn default_batch_size() -> usize {
    let available = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    batch_size_for(available)
}

/// Runs `task` over `jobs` in fixed-size batches: jobs inside a batch run
/// concurrently, batches run one after another. Results come back in job
/// order whatever order the tasks finished in.
///
/// The first failing job aborts the rest of its batch and no later batch is
/// started. Any degrade-instead-of-fail policy belongs inside `task`.
pub async fn run_batched<J, T, F, Fut>(jobs: Vec<J>, batch_size: usize, task: F) -> Result<Vec<T>>
where
    J: Send + 'static,
    T: Send + 'static,
    F: Fn(usize, J) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let batch_size = batch_size.max(1);
    let total = jobs.len();
    let mut results: Vec<(usize, T)> = Vec::with_capacity(total);
    let mut pending = jobs.into_iter().enumerate().peekable();
    let mut batch_no = 0;

    while pending.peek().is_some() {
        let mut set = JoinSet::new();
        for (index, job) in pending.by_ref().take(batch_size) {
            let fut = task(index, job);
            set.spawn(async move { fut.await.map(|value| (index, value)) });
        }
        debug!(batch = batch_no, jobs = set.len(), total, "batch started");

        while let Some(joined) = set.join_next().await {
            let failure = match joined {
                Ok(Ok(item)) => {
                    results.push(item);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => e.into(),
            };
            // Siblings must be gone before the caller cleans up their files.
            set.abort_all();
            while set.join_next().await.is_some() {}
            return Err(failure);
        }
        batch_no += 1;
    }

    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, value)| value).collect())
}
