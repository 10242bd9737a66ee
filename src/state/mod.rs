//! State module for tracking prefix crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the pagination/retry state machine of a single prefix crawl
//! - `Termination`: how a successful crawl ended (success, empty, overflow)
//! - `RetryPolicy`: retry ceiling and exponential backoff

mod crawl_state;

// Re-export main types
pub use crawl_state::{CrawlState, RetryPolicy, Termination, OVERFLOW_OFFSET, PAGE_SIZE};
