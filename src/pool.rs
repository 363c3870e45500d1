//! Bounded concurrent executor for homogeneous batches of fallible work.
//!
//! Every fan-out in the playground (story scoring, headline relevance,
//! story matching, category fetch) goes through [`execute_in_pool`]. The
//! pool lives only for one call: a fresh semaphore caps how many tasks run
//! at once, results come back in submission order, and a failing task
//! leaves `None` in its slot instead of aborting the batch.

use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;

type TaskFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// One unit of work: an operation name and the not-yet-started call.
///
/// The future is lazy; it only begins executing once the pool hands it a
/// worker slot.
pub struct Task<T> {
    operation: &'static str,
    future: TaskFuture<T>,
}

impl<T> Task<T> {
    pub fn new<F>(operation: &'static str, future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            operation,
            future: Box::pin(future),
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

/// Results of a batch together with how many tasks failed.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Slot `i` holds task `i`'s value, or `None` if it failed
    pub results: Vec<Option<T>>,
    pub failures: usize,
}

/// Run all `tasks` with at most `max_workers` in flight and collect their
/// results by submission index.
///
/// The batch is assumed homogeneous: the failure total is reported under the
/// first task's operation name.
pub async fn run_tasks<T>(tasks: Vec<Task<T>>, max_workers: usize) -> BatchOutcome<T>
where
    T: Send + 'static,
{
    let operation = match tasks.first() {
        Some(task) => task.operation,
        None => {
            return BatchOutcome {
                results: Vec::new(),
                failures: 0,
            }
        }
    };

    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut handles = Vec::with_capacity(tasks.len());

    for task in tasks {
        let sem = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .context("Worker pool closed before task could start")?;
            task.future.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    let mut failures = 0usize;

    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(value)) => results.push(Some(value)),
            Ok(Err(e)) => {
                tracing::warn!(task = index, "Error in {operation} task: {e:#}");
                failures += 1;
                results.push(None);
            }
            Err(join_err) => {
                tracing::warn!(task = index, "Panic in {operation} task: {join_err}");
                failures += 1;
                results.push(None);
            }
        }
    }

    if failures > 0 {
        tracing::warn!("Total errors in {operation}: {failures}");
    }

    BatchOutcome { results, failures }
}

/// [`run_tasks`] without the failure count.
pub async fn execute_in_pool<T>(tasks: Vec<Task<T>>, max_workers: usize) -> Vec<Option<T>>
where
    T: Send + 'static,
{
    run_tasks(tasks, max_workers).await.results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        // Earlier tasks sleep longer so they finish last
        let tasks: Vec<Task<usize>> = (0..6)
            .map(|i| {
                Task::new("delayed_identity", async move {
                    tokio::time::sleep(Duration::from_millis(((6 - i) * 5) as u64)).await;
                    Ok(i)
                })
            })
            .collect();

        let results = execute_in_pool(tasks, 6).await;
        assert_eq!(
            results,
            vec![Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_cap() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<Task<()>> = (0..20)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                Task::new("tracked", async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        let outcome = run_tasks(tasks, 3).await;
        assert_eq!(outcome.results.len(), 20);
        assert_eq!(outcome.failures, 0);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {peak}");
        assert!(peak >= 2, "tasks never overlapped");
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_counted() {
        let tasks: Vec<Task<u32>> = (0..5u32)
            .map(|i| {
                Task::new("maybe_fail", async move {
                    if i == 1 || i == 3 {
                        anyhow::bail!("model refused item {i}");
                    }
                    Ok(i * 10)
                })
            })
            .collect();

        let outcome = run_tasks(tasks, 2).await;
        assert_eq!(outcome.failures, 2);
        assert_eq!(
            outcome.results,
            vec![Some(0), None, Some(20), None, Some(40)]
        );
    }

    #[tokio::test]
    async fn test_panicking_task_leaves_sentinel() {
        let tasks = vec![
            Task::new("panicky", async { Ok(1) }),
            Task::new("panicky", async {
                if true {
                    panic!("boom");
                }
                Ok(2)
            }),
            Task::new("panicky", async { Ok(3) }),
        ];

        let outcome = run_tasks(tasks, 1).await;
        assert_eq!(outcome.results, vec![Some(1), None, Some(3)]);
        assert_eq!(outcome.failures, 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcome = run_tasks::<()>(Vec::new(), 4).await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.failures, 0);
    }

    #[tokio::test]
    async fn test_zero_workers_still_runs_everything() {
        let tasks: Vec<Task<i32>> = (0..3)
            .map(|i| Task::new("serial", async move { Ok(i) }))
            .collect();
        let results = execute_in_pool(tasks, 0).await;
        assert_eq!(results, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_task_reports_operation_name() {
        let task: Task<()> = Task::new("score_story", async { Ok(()) });
        assert_eq!(task.operation(), "score_story");
    }
}
