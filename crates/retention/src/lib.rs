//! Retention policy
//!
//! Ranks files by recency (the later of `modified` and `print_start_time`)
//! and splits them into the files to keep and the files to archive.

pub mod partition;
pub mod recency;

pub use partition::{Partition, partition};
pub use recency::{FileRecord, Recency, records_from_index};
