//! Aggregation of harvested names into the final report
//!
//! Turns the merged names of every prefix crawl into the final sorted,
//! deduplicated list and the counters shown in the run summary.

use std::collections::BTreeSet;

/// Non-name token the registry renders in italics next to author lists
pub const SENTINEL_NAME: &str = "et al.";

/// Final result of a harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Unique species names, sorted ascending
    pub names: Vec<String>,

    /// Number of names extracted before deduplication
    pub raw_count: usize,

    /// Prefixes with too many species to extract, sorted
    pub incomplete: Vec<String>,
}

impl HarvestReport {
    /// Builds the report from everything the crawls collected
    ///
    /// Sentinel tokens are dropped before `raw_count` is taken.
    pub fn from_aggregate(names: Vec<String>, mut incomplete: Vec<String>) -> Self {
        let names = remove_sentinel(names);
        let raw_count = names.len();

        let unique: BTreeSet<String> = names.into_iter().collect();

        incomplete.sort();
        incomplete.dedup();

        Self {
            names: unique.into_iter().collect(),
            raw_count,
            incomplete,
        }
    }

    /// Number of distinct names
    pub fn unique_count(&self) -> usize {
        self.names.len()
    }

    /// Returns true if every prefix was retrieved in full
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

/// Removes every occurrence of the sentinel token
pub fn remove_sentinel(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| name != SENTINEL_NAME)
        .collect()
}
