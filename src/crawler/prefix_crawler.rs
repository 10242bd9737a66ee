//! Per-prefix crawl loop
//!
//! Drives a [`PageSource`] and the page classifier through the
//! [`CrawlState`] machine until the prefix reaches a terminal state. Each
//! crawl owns its accumulator and hands back an immutable [`CrawlResult`].

use crate::crawler::classifier::classify_page;
use crate::crawler::fetcher::{PageRequest, PageSource};
use crate::state::{CrawlState, RetryPolicy, Termination};
use crate::HarvestError;
use tokio_util::sync::CancellationToken;

/// Names collected for one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    /// The search prefix
    pub prefix: String,

    /// Raw names in the order the registry listed them
    pub names: Vec<String>,

    /// True if the listing overflowed and only a part was retrieved
    pub truncated: bool,
}

/// How a prefix crawl task ended without a fatal error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixOutcome {
    /// The crawl reached a terminal state and produced a result
    Completed(CrawlResult),

    /// The run was cancelled before this crawl finished
    Cancelled,
}

/// Crawls every page of one prefix
///
/// Cancellation is observed before each fetch and while waiting out a
/// backoff; a fetch already in flight is allowed to finish.
///
/// # Errors
///
/// Returns [`HarvestError::RetryExhausted`] when one page fails
/// `policy.max_retries` times in a row.
pub async fn crawl_prefix<S>(
    source: &S,
    prefix: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<PrefixOutcome, HarvestError>
where
    S: PageSource + ?Sized,
{
    let mut names = Vec::new();
    let mut state = CrawlState::initial();
    let mut pages = 0u32;

    loop {
        state = match state {
            CrawlState::Fetching { offset, failures } => {
                if cancel.is_cancelled() {
                    tracing::debug!("Prefix '{}' cancelled before offset {}", prefix, offset);
                    return Ok(PrefixOutcome::Cancelled);
                }

                let request = PageRequest::new(prefix, offset);
                match source.fetch_page(&request).await {
                    Ok(body) => {
                        pages += 1;
                        let outcome = classify_page(&body, offset);
                        let next = CrawlState::after_page(offset, outcome, &mut names);
                        tracing::debug!(
                            "Prefix '{}' offset {}: {} ({} names so far)",
                            prefix,
                            offset,
                            next,
                            names.len()
                        );
                        next
                    }
                    Err(failure) => {
                        tracing::warn!(
                            "Fetch failed for prefix '{}' at offset {} (attempt {}/{}): {}",
                            prefix,
                            offset,
                            failures + 1,
                            policy.max_retries,
                            failure
                        );
                        CrawlState::after_failure(offset, failures, failure, policy)
                    }
                }
            }

            CrawlState::Backoff {
                offset,
                failures,
                delay,
            } => {
                tracing::debug!(
                    "Prefix '{}' backing off for {:.2}s before retrying offset {}",
                    prefix,
                    delay.as_secs_f64(),
                    offset
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("Prefix '{}' cancelled during backoff", prefix);
                        return Ok(PrefixOutcome::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => CrawlState::Fetching { offset, failures },
                }
            }

            CrawlState::Done(termination) => {
                if termination == Termination::Overflow {
                    tracing::warn!(
                        "Prefix '{}' has too many species to extract; keeping the first {} names",
                        prefix,
                        names.len()
                    );
                }
                tracing::debug!(
                    "Prefix '{}' finished after {} pages with {} names",
                    prefix,
                    pages,
                    names.len()
                );
                return Ok(PrefixOutcome::Completed(CrawlResult {
                    prefix: prefix.to_string(),
                    names,
                    truncated: termination.is_truncated(),
                }));
            }

            CrawlState::Failed {
                attempts,
                last_failure,
            } => {
                tracing::error!(
                    "Giving up on prefix '{}' after {} attempts: {}",
                    prefix,
                    attempts,
                    last_failure
                );
                return Err(HarvestError::RetryExhausted {
                    prefix: prefix.to_string(),
                    attempts,
                    last: last_failure,
                });
            }
        };
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crawler::fetcher::FetchFailure;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Page source replaying canned responses per prefix
    ///
    /// Once a prefix's script runs out, `fallback` answers every request.
    pub(crate) struct ScriptedSource {
        scripts: Mutex<HashMap<String, VecDeque<Result<String, FetchFailure>>>>,
        fallback: Result<String, FetchFailure>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(fallback: Result<String, FetchFailure>) -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                fallback,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn script(
            self,
            prefix: &str,
            responses: Vec<Result<String, FetchFailure>>,
        ) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(prefix.to_string(), responses.into());
            self
        }

        pub(crate) fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn requests_for(&self, prefix: &str) -> usize {
            self.requests()
                .iter()
                .filter(|r| r.prefix == prefix)
                .count()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<String, FetchFailure> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&request.prefix)
                .and_then(|queue| queue.pop_front());
            tokio::task::yield_now().await;
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    pub(crate) fn list_page(names: &[&str]) -> String {
        let rows: String = names
            .iter()
            .map(|name| format!("<li><i>{}</i></li>", name))
            .collect();
        format!(
            r#"<ul class="list-group aphia_core_list_group_hover">{}</ul>"#,
            rows
        )
    }

    pub(crate) fn detail_page(name: &str) -> String {
        format!(
            r#"<ol class="aphia_core_breadcrumb-classification"><li><i>Animalia</i></li><li><i>{}</i></li></ol>"#,
            name
        )
    }

    pub(crate) const EMPTY_PAGE: &str = "<html><body>No results</body></html>";

    pub(crate) fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base: 0.0,
        }
    }

    async fn run(source: &ScriptedSource, prefix: &str, policy: RetryPolicy) -> PrefixOutcome {
        crawl_prefix(source, prefix, &policy, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let source = ScriptedSource::new(Ok(EMPTY_PAGE.to_string()));
        let outcome = run(&source, "xq", fast_policy(3)).await;

        assert_eq!(
            outcome,
            PrefixOutcome::Completed(CrawlResult {
                prefix: "xq".to_string(),
                names: vec![],
                truncated: false,
            })
        );
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_single_redirected_result() {
        let source = ScriptedSource::new(Ok(detail_page("Example species")));
        let outcome = run(&source, "ex", fast_policy(3)).await;

        let PrefixOutcome::Completed(result) = outcome else {
            panic!("expected a completed crawl");
        };
        assert_eq!(result.names, vec!["Example species"]);
        assert!(!result.truncated);
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_pages_are_merged_until_exhausted() {
        let source = ScriptedSource::new(Ok(EMPTY_PAGE.to_string())).script(
            "ab",
            vec![
                Ok(list_page(&["Abra alba", "Abra nitida"])),
                Ok(list_page(&["Abra prismatica"])),
            ],
        );
        let outcome = run(&source, "ab", fast_policy(3)).await;

        let PrefixOutcome::Completed(result) = outcome else {
            panic!("expected a completed crawl");
        };
        assert_eq!(
            result.names,
            vec!["Abra alba", "Abra nitida", "Abra prismatica"]
        );
        assert!(!result.truncated);

        let offsets: Vec<u32> = source.requests().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 100, 200]);
    }

    #[tokio::test]
    async fn test_overflow_truncates() {
        let source = ScriptedSource::new(Ok(list_page(&["Abra alba"])));
        let outcome = run(&source, "ab", fast_policy(3)).await;

        let PrefixOutcome::Completed(result) = outcome else {
            panic!("expected a completed crawl");
        };
        assert!(result.truncated);
        // Offsets 0..=4900 are extracted, the page at 5000 overflows
        assert_eq!(result.names.len(), 50);
        assert_eq!(source.requests().len(), 51);
        assert_eq!(source.requests().last().map(|r| r.offset), Some(5000));
    }

    #[tokio::test]
    async fn test_transient_failure_retries_same_offset() {
        let source = ScriptedSource::new(Ok(EMPTY_PAGE.to_string())).script(
            "ab",
            vec![
                Ok(list_page(&["Abra alba"])),
                Err(FetchFailure::Status(503)),
                Err(FetchFailure::Network("reset".to_string())),
                Ok(list_page(&["Abra nitida"])),
                Err(FetchFailure::Status(502)),
                Err(FetchFailure::Status(502)),
            ],
        );
        let outcome = run(&source, "ab", fast_policy(3)).await;

        let PrefixOutcome::Completed(result) = outcome else {
            panic!("expected a completed crawl");
        };
        assert_eq!(result.names, vec!["Abra alba", "Abra nitida"]);

        // Failure counts reset after each successful page
        let offsets: Vec<u32> = source.requests().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 100, 100, 100, 200, 200, 200]);
    }

    #[tokio::test]
    async fn test_retry_exhausted_after_ceiling() {
        let source = ScriptedSource::new(Err(FetchFailure::Status(503)));
        let result = crawl_prefix(&source, "zz", &fast_policy(3), &CancellationToken::new()).await;

        match result {
            Err(HarvestError::RetryExhausted {
                prefix,
                attempts,
                last,
            }) => {
                assert_eq!(prefix, "zz");
                assert_eq!(attempts, 3);
                assert_eq!(last, FetchFailure::Status(503));
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
        assert_eq!(source.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let source = ScriptedSource::new(Ok(EMPTY_PAGE.to_string()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = crawl_prefix(&source, "ab", &fast_policy(3), &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, PrefixOutcome::Cancelled);
        assert!(source.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_during_backoff() {
        let source = std::sync::Arc::new(ScriptedSource::new(Err(FetchFailure::Status(500))));
        let cancel = CancellationToken::new();
        let policy = RetryPolicy {
            max_retries: 5,
            backoff_base: 60.0,
        };

        let task = {
            let source = source.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { crawl_prefix(&*source, "ab", &policy, &cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("crawl did not observe cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(outcome, PrefixOutcome::Cancelled);
        assert_eq!(source.requests().len(), 1);
    }
}
