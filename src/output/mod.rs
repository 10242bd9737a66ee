//! Output module for harvest results
//!
//! This module handles:
//! - Aggregating crawled names into the final sorted, deduplicated report
//! - Writing the species names file

mod names_file;
pub mod report;

pub use names_file::{names_file_name, names_file_path, write_names_file};
pub use report::{remove_sentinel, HarvestReport, SENTINEL_NAME};
