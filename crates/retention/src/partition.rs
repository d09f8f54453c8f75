use tracing::debug;

use crate::recency::FileRecord;

/// Keep/archive split, both sides newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub keep: Vec<FileRecord>,
    pub archive: Vec<FileRecord>,
}

impl Partition {
    pub fn total(&self) -> usize {
        self.keep.len() + self.archive.len()
    }
}

/// Stable sort by recency descending; the first `keep_count` records are kept.
/// Ties keep their input order.
pub fn partition(mut records: Vec<FileRecord>, keep_count: usize) -> Partition {
    records.sort_by(|a, b| b.recency().cmp(&a.recency()));

    let split = keep_count.min(records.len());
    let archive = records.split_off(split);

    debug!("Partitioned {} files: keep {}, archive {}", split + archive.len(), split, archive.len());

    Partition { keep: records, archive }
}
