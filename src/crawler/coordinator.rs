//! Crawl coordinator - runs every prefix crawl across a bounded worker pool
//!
//! This module contains the orchestration logic of a harvest run:
//! - Spawning one crawl task per prefix
//! - Bounding concurrency with a semaphore
//! - Merging finished crawls into the shared aggregate
//! - Fail-fast cancellation when any prefix exhausts its retries

use crate::crawler::fetcher::PageSource;
use crate::crawler::prefix_crawler::{crawl_prefix, CrawlResult, PrefixOutcome};
use crate::output::HarvestReport;
use crate::state::RetryPolicy;
use crate::HarvestError;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Names and truncated prefixes collected so far
#[derive(Debug, Default)]
struct Aggregate {
    names: Vec<String>,
    incomplete: Vec<String>,
}

impl Aggregate {
    fn merge(&mut self, result: CrawlResult) {
        if result.truncated {
            self.incomplete.push(result.prefix);
        }
        self.names.extend(result.names);
    }
}

/// What a finished crawl task reports back
#[derive(Debug)]
enum TaskReport {
    Merged {
        prefix: String,
        names: usize,
        truncated: bool,
    },
    Cancelled,
}

/// Main harvest coordinator structure
pub struct Coordinator<S: PageSource> {
    source: Arc<S>,
    policy: RetryPolicy,
    workers: usize,
    cancel: CancellationToken,
}

impl<S: PageSource> Coordinator<S> {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `source` - Page source shared by all crawl tasks
    /// * `policy` - Retry ceiling and backoff for every page
    /// * `workers` - Maximum number of prefixes crawled at once (at least 1)
    pub fn new(source: Arc<S>, policy: RetryPolicy, workers: usize) -> Self {
        Self::with_cancellation(source, policy, workers, CancellationToken::new())
    }

    /// Creates a coordinator that also stops when `cancel` is triggered
    pub fn with_cancellation(
        source: Arc<S>,
        policy: RetryPolicy,
        workers: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            policy,
            workers: workers.max(1),
            cancel,
        }
    }

    /// Token cancelled when the run aborts
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls every prefix and aggregates the results
    ///
    /// Completions are observed in the order they finish. The first fatal
    /// error is returned immediately: the shared token is cancelled so queued
    /// crawls never start and backing-off crawls give up, and no report is
    /// produced.
    ///
    /// # Errors
    ///
    /// * [`HarvestError::RetryExhausted`] - a prefix failed past its retry ceiling
    /// * [`HarvestError::TaskFailed`] - a crawl task panicked
    /// * [`HarvestError::Cancelled`] - the token was cancelled from outside
    pub async fn run(&self, prefixes: Vec<String>) -> Result<HarvestReport, HarvestError> {
        let total = prefixes.len();
        let start_time = std::time::Instant::now();
        tracing::info!(
            "Crawling {} prefixes with {} workers",
            total,
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let aggregate = Arc::new(Mutex::new(Aggregate::default()));
        let mut tasks = JoinSet::new();

        for prefix in prefixes {
            tasks.spawn(crawl_task(
                Arc::clone(&self.source),
                prefix,
                self.policy,
                Arc::clone(&semaphore),
                Arc::clone(&aggregate),
                self.cancel.clone(),
            ));
        }

        let mut completed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let report = match joined {
                Ok(Ok(report)) => report,
                Ok(Err(error)) => {
                    tracing::error!("{}", error);
                    tracing::error!("Halting all remaining prefix crawls");
                    self.abort(tasks);
                    return Err(error);
                }
                Err(join_error) => {
                    tracing::error!("Crawl task failed: {}", join_error);
                    self.abort(tasks);
                    return Err(HarvestError::TaskFailed(join_error.to_string()));
                }
            };

            if let TaskReport::Merged {
                prefix,
                names,
                truncated,
            } = report
            {
                completed += 1;
                tracing::debug!(
                    "Prefix '{}' merged: {} names{}",
                    prefix,
                    names,
                    if truncated { " (truncated)" } else { "" }
                );

                // Progress reporting every 10 prefixes
                if completed % 10 == 0 || completed == total {
                    let rate = completed as f64 / start_time.elapsed().as_secs_f64().max(1e-9);
                    tracing::info!(
                        "Progress: {}/{} prefixes crawled, {:.2} prefixes/sec",
                        completed,
                        total,
                        rate
                    );
                }
            }
        }

        if self.cancel.is_cancelled() {
            tracing::warn!("Harvest cancelled after {}/{} prefixes", completed, total);
            return Err(HarvestError::Cancelled);
        }

        let aggregate = std::mem::take(&mut *aggregate.lock().await);
        tracing::info!(
            "Crawl completed: {} prefixes in {:?}",
            completed,
            start_time.elapsed()
        );

        Ok(HarvestReport::from_aggregate(
            aggregate.names,
            aggregate.incomplete,
        ))
    }

    /// Cancels outstanding work without waiting for it
    ///
    /// Tasks keep running detached until they reach a cancellation point;
    /// a fetch already in flight is allowed to finish.
    fn abort(&self, mut tasks: JoinSet<Result<TaskReport, HarvestError>>) {
        self.cancel.cancel();
        tasks.detach_all();
    }
}

/// Body of one spawned crawl task
///
/// Waits for a worker permit (or cancellation), crawls the prefix, and merges
/// the result into the shared aggregate. A failed crawl cancels the shared
/// token before its permit is released.
async fn crawl_task<S: PageSource>(
    source: Arc<S>,
    prefix: String,
    policy: RetryPolicy,
    semaphore: Arc<Semaphore>,
    aggregate: Arc<Mutex<Aggregate>>,
    cancel: CancellationToken,
) -> Result<TaskReport, HarvestError> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(TaskReport::Cancelled),
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return Ok(TaskReport::Cancelled),
        },
    };

    let outcome = match crawl_prefix(source.as_ref(), &prefix, &policy, &cancel).await {
        Ok(outcome) => outcome,
        Err(error) => {
            // Cancel while the permit is held so no queued prefix can start
            cancel.cancel();
            return Err(error);
        }
    };

    match outcome {
        PrefixOutcome::Completed(result) => {
            let names = result.names.len();
            let truncated = result.truncated;
            aggregate.lock().await.merge(result);
            Ok(TaskReport::Merged {
                prefix,
                names,
                truncated,
            })
        }
        PrefixOutcome::Cancelled => Ok(TaskReport::Cancelled),
    }
}
