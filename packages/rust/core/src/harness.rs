//! The two-phase task harness.
//!
//! Phase one, `produce`, walks the source site: fetches fan out through
//! the bounded fetcher and are gathered back in listed order, failing the
//! run on the first transport error. Phase two feeds the produced parse
//! items to the merge engine one at a time, in listed order, so merge
//! stages never interleave; per-document errors are logged and counted,
//! not fatal.

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use parldata_crawler::Fetcher;
use parldata_shared::{ParldataError, ParseItem, Result};

use crate::engine::{MergeEngine, Outcome};

/// One unit of scraping work against the source site.
pub trait Task {
    fn name(&self) -> &'static str;

    /// Walk the site and produce parse items, in the order they should be
    /// fed to the merge engine.
    fn produce(
        &self,
        fetcher: &Fetcher,
    ) -> impl Future<Output = Result<Vec<ParseItem>>> + Send;

    /// The serialized insertion phase. The default feeds every item to
    /// the merge engine in listed order; tasks with post-insert
    /// bookkeeping override it and usually delegate back to
    /// [`insert_items`].
    fn after(
        &self,
        items: Vec<ParseItem>,
        engine: &MergeEngine<'_>,
    ) -> impl Future<Output = Result<RunStats>> + Send
    where
        Self: Sync,
    {
        insert_items(self.name(), items, engine)
    }
}

/// What one task run did, as recorded in the run history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub inserted: u64,
    pub merged: u64,
    pub skipped: u64,
}

/// Await a batch of subtasks concurrently and return their results in
/// the listed order. The first failure aborts the remainder and becomes
/// the batch's error.
pub async fn gather<F, T>(futures: Vec<F>) -> Result<Vec<T>>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    for (index, future) in futures.into_iter().enumerate() {
        set.spawn(async move { (index, future.await) });
    }

    let mut results: Vec<(usize, T)> = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        let (index, result) = joined
            .map_err(|e| ParldataError::Network(format!("fan-out worker failed: {e}")))?;
        match result {
            Ok(value) => results.push((index, value)),
            Err(e) => {
                set.abort_all();
                return Err(e);
            }
        }
    }
    results.sort_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, value)| value).collect())
}

/// Feed items to the merge engine one at a time, in listed order.
/// Per-document errors are logged with their context and counted as
/// skips; anything else aborts the phase.
pub async fn insert_items(
    task: &'static str,
    items: Vec<ParseItem>,
    engine: &MergeEngine<'_>,
) -> Result<RunStats> {
    let mut stats = RunStats::default();
    for item in &items {
        match engine.insert(item).await {
            Ok(Outcome::Inserted) => stats.inserted += 1,
            Ok(Outcome::Merged) => stats.merged += 1,
            Err(e) if e.is_per_document() => {
                warn!(task, kind = %item.kind, error = %e, "skipping item");
                stats.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(stats)
}

/// Run one task end to end: produce, then the serialized insertion
/// phase, with the run recorded in the store's history. A failed run
/// still gets its history row finished, carrying the error instead of
/// stats.
pub async fn run_task<T: Task + Sync>(task: &T, fetcher: &Fetcher) -> Result<RunStats> {
    let store = fetcher.store();
    let run_id = store.insert_task_run(task.name()).await?;
    info!(task = task.name(), run_id, "task starting");

    match execute(task, fetcher).await {
        Ok(stats) => {
            let stats_json = serde_json::to_string(&stats)
                .map_err(|e| ParldataError::Storage(e.to_string()))?;
            store.finish_task_run(&run_id, &stats_json).await?;
            info!(
                task = task.name(),
                inserted = stats.inserted,
                merged = stats.merged,
                skipped = stats.skipped,
                "task finished"
            );
            Ok(stats)
        }
        Err(e) => {
            let payload = serde_json::json!({"error": e.to_string()}).to_string();
            if let Err(finish_error) = store.finish_task_run(&run_id, &payload).await {
                warn!(
                    task = task.name(),
                    run_id,
                    error = %finish_error,
                    "failed to record task failure"
                );
            }
            Err(e)
        }
    }
}

async fn execute<T: Task + Sync>(task: &T, fetcher: &Fetcher) -> Result<RunStats> {
    let items = task.produce(fetcher).await?;
    info!(task = task.name(), items = items.len(), "produce phase complete");

    let engine = MergeEngine::new(fetcher.store());
    task.after(items, &engine).await
}
