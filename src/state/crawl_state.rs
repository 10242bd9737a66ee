/// Crawl state definitions for a single prefix
///
/// This module defines the states a prefix crawl moves through and the pure
/// transition functions between them. No I/O happens here; the prefix crawler
/// performs the fetches and sleeps and asks this module where to go next.
use crate::crawler::{FetchFailure, PageOutcome};
use std::fmt;
use std::time::Duration;

/// Number of results the registry returns per page
pub const PAGE_SIZE: u32 = 100;

/// Last offset that is still paginated; a list page beyond it is an overflow
pub const OVERFLOW_OFFSET: u32 = 4900;

/// How a successful prefix crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Single redirected result, or pagination ran out naturally
    Success,

    /// The very first page carried no result list
    Empty,

    /// The listing is deeper than the crawl is willing to page through
    Overflow,
}

impl Termination {
    /// Returns true if the prefix's result set was cut short
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Overflow)
    }
}

/// Retry and backoff settings for page fetches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Number of failed attempts after which a page is given up on
    pub max_retries: u32,

    /// Backoff base in seconds
    pub backoff_base: f64,
}

impl RetryPolicy {
    /// Wait before the next attempt after `failures` consecutive failures
    ///
    /// The delay is `backoff_base ^ failures` seconds. Values too large to
    /// represent saturate at [`Duration::MAX`].
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
        let seconds = self.backoff_base.powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 2.0,
        }
    }
}

/// Represents the current state of a prefix crawl
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlState {
    // ===== Active States =====
    /// Next page at `offset` is about to be requested
    Fetching { offset: u32, failures: u32 },

    /// Waiting out a backoff before retrying the same offset
    Backoff {
        offset: u32,
        failures: u32,
        delay: Duration,
    },

    // ===== Terminal States =====
    /// Crawl finished and yields a result
    Done(Termination),

    /// Every attempt for one page failed; fatal for the whole run
    Failed {
        attempts: u32,
        last_failure: FetchFailure,
    },
}

impl CrawlState {
    /// Starting state of every prefix crawl
    pub fn initial() -> Self {
        Self::Fetching {
            offset: 0,
            failures: 0,
        }
    }

    /// Transition taken when the fetch at `offset` failed
    ///
    /// The failure count includes this failure. Reaching the retry ceiling
    /// fails the crawl; anything below it backs off and retries the same
    /// offset.
    pub fn after_failure(
        offset: u32,
        failures: u32,
        failure: FetchFailure,
        policy: &RetryPolicy,
    ) -> Self {
        let failures = failures + 1;

        if failures >= policy.max_retries {
            return Self::Failed {
                attempts: failures,
                last_failure: failure,
            };
        }

        Self::Backoff {
            offset,
            failures,
            delay: policy.delay_for(failures),
        }
    }

    /// Transition taken after the page at `offset` was fetched and classified
    ///
    /// `names` is the crawl's accumulator; list pages append to it and a
    /// single redirected result replaces it.
    pub fn after_page(offset: u32, outcome: PageOutcome, names: &mut Vec<String>) -> Self {
        match outcome {
            PageOutcome::SingleResult(name) => {
                names.clear();
                names.push(name);
                Self::Done(Termination::Success)
            }
            PageOutcome::Empty if names.is_empty() => Self::Done(Termination::Empty),
            PageOutcome::Empty => Self::Done(Termination::Success),
            PageOutcome::Overflow => Self::Done(Termination::Overflow),
            PageOutcome::ListPage(page_names) => {
                names.extend(page_names);
                Self::Fetching {
                    offset: offset + PAGE_SIZE,
                    failures: 0,
                }
            }
        }
    }

    /// Returns true if no further processing happens in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed { .. })
    }

    /// Short name used in log output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetching { .. } => "fetching",
            Self::Backoff { .. } => "retry_backoff",
            Self::Done(Termination::Success) => "done_success",
            Self::Done(Termination::Empty) => "done_empty",
            Self::Done(Termination::Overflow) => "done_overflow",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_retries: u32, backoff_base: f64) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base,
        }
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(
            CrawlState::initial(),
            CrawlState::Fetching {
                offset: 0,
                failures: 0
            }
        );
        assert!(!CrawlState::initial().is_terminal());
    }

    #[test]
    fn test_failure_backs_off_at_same_offset() {
        let state =
            CrawlState::after_failure(300, 0, FetchFailure::Status(503), &policy(3, 2.0));
        assert_eq!(
            state,
            CrawlState::Backoff {
                offset: 300,
                failures: 1,
                delay: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn test_failure_at_ceiling_fails() {
        let state =
            CrawlState::after_failure(0, 2, FetchFailure::Status(500), &policy(3, 2.0));
        assert_eq!(
            state,
            CrawlState::Failed {
                attempts: 3,
                last_failure: FetchFailure::Status(500)
            }
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn test_single_attempt_ceiling_fails_immediately() {
        let state = CrawlState::after_failure(
            0,
            0,
            FetchFailure::Network("connection refused".to_string()),
            &policy(1, 2.0),
        );
        assert!(matches!(state, CrawlState::Failed { attempts: 1, .. }));
    }

    #[test]
    fn test_backoff_strictly_increasing() {
        let policy = policy(10, 2.0);
        let delays: Vec<Duration> = (1..=6).map(|n| policy.delay_for(n)).collect();
        for pair in delays.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
        assert_eq!(delays[0], Duration::from_secs(2));
        assert_eq!(delays[2], Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_fractional_base() {
        let policy = policy(3, 1.5);
        assert_eq!(policy.delay_for(2), Duration::from_secs_f64(2.25));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = policy(u32::MAX, 1e300);
        assert_eq!(policy.delay_for(5), Duration::MAX);
    }

    #[test]
    fn test_list_page_resets_failures_and_advances() {
        let mut names = vec!["Abra alba".to_string()];
        let state = CrawlState::after_page(
            100,
            PageOutcome::ListPage(vec!["Abra nitida".to_string()]),
            &mut names,
        );

        assert_eq!(
            state,
            CrawlState::Fetching {
                offset: 200,
                failures: 0
            }
        );
        assert_eq!(names, vec!["Abra alba", "Abra nitida"]);

        // The next failure starts the backoff from the base value again
        let retry = CrawlState::after_failure(200, 0, FetchFailure::Status(502), &policy(3, 2.0));
        assert!(matches!(
            retry,
            CrawlState::Backoff { failures: 1, delay, .. } if delay == Duration::from_secs(2)
        ));
    }

    #[test]
    fn test_empty_list_page_keeps_fetching() {
        let mut names = Vec::new();
        let state = CrawlState::after_page(0, PageOutcome::ListPage(vec![]), &mut names);
        assert_eq!(
            state,
            CrawlState::Fetching {
                offset: 100,
                failures: 0
            }
        );
        assert!(names.is_empty());
    }

    #[test]
    fn test_single_result_replaces_accumulator() {
        let mut names = vec!["Stale name".to_string()];
        let state = CrawlState::after_page(
            0,
            PageOutcome::SingleResult("Example species".to_string()),
            &mut names,
        );
        assert_eq!(state, CrawlState::Done(Termination::Success));
        assert_eq!(names, vec!["Example species"]);
    }

    #[test]
    fn test_empty_first_page() {
        let mut names = Vec::new();
        let state = CrawlState::after_page(0, PageOutcome::Empty, &mut names);
        assert_eq!(state, CrawlState::Done(Termination::Empty));
    }

    #[test]
    fn test_pagination_exhausted() {
        let mut names = vec!["Abra alba".to_string()];
        let state = CrawlState::after_page(200, PageOutcome::Empty, &mut names);
        assert_eq!(state, CrawlState::Done(Termination::Success));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_overflow_keeps_partial_names() {
        let mut names = vec!["Abra alba".to_string()];
        let state = CrawlState::after_page(5000, PageOutcome::Overflow, &mut names);
        assert_eq!(state, CrawlState::Done(Termination::Overflow));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_only_overflow_is_truncated() {
        assert!(Termination::Overflow.is_truncated());
        assert!(!Termination::Success.is_truncated());
        assert!(!Termination::Empty.is_truncated());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlState::initial()), "fetching");
        assert_eq!(
            format!("{}", CrawlState::Done(Termination::Overflow)),
            "done_overflow"
        );
    }
}
