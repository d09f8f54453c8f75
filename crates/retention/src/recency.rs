use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

/// Comparable recency of a file. `Unknown` sorts below every known timestamp.
#[derive(Debug, Clone, Copy)]
pub enum Recency {
    Unknown,
    /// Seconds since the Unix epoch.
    At(f64),
}

impl Recency {
    /// `max(modified, print_start_time)`, with a missing value acting as negative infinity.
    pub fn resolve(modified: Option<f64>, print_start_time: Option<f64>) -> Self {
        match (modified, print_start_time) {
            (Some(m), Some(p)) => Recency::At(if p.total_cmp(&m).is_gt() { p } else { m }),
            (Some(t), None) | (None, Some(t)) => Recency::At(t),
            (None, None) => Recency::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Recency::At(_))
    }
}

impl Ord for Recency {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Recency::Unknown, Recency::Unknown) => Ordering::Equal,
            (Recency::Unknown, Recency::At(_)) => Ordering::Less,
            (Recency::At(_), Recency::Unknown) => Ordering::Greater,
            (Recency::At(a), Recency::At(b)) => a.total_cmp(b),
        }
    }
}

impl PartialOrd for Recency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Recency {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Recency {}

impl fmt::Display for Recency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recency::Unknown => write!(f, "unknown"),
            Recency::At(t) => write!(f, "{:.3}", t),
        }
    }
}

/// One entry of Moonraker's `gcode_metadata` namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    name: String,
    modified: Option<f64>,
    print_start_time: Option<f64>,
    recency: Recency,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, modified: Option<f64>, print_start_time: Option<f64>) -> Self {
        Self {
            name: name.into(),
            modified,
            print_start_time,
            recency: Recency::resolve(modified, print_start_time),
        }
    }

    /// Build a record from a raw metadata value. Non-numeric timestamps and
    /// non-object metadata count as missing.
    pub fn from_metadata(name: &str, metadata: &Value) -> Self {
        Self::new(
            name,
            timestamp(metadata, "modified"),
            timestamp(metadata, "print_start_time"),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modified(&self) -> Option<f64> {
        self.modified
    }

    pub fn print_start_time(&self) -> Option<f64> {
        self.print_start_time
    }

    pub fn recency(&self) -> Recency {
        self.recency
    }
}

fn timestamp(metadata: &Value, field: &str) -> Option<f64> {
    metadata
        .get(field)
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite())
}

/// Records in the order Moonraker listed them.
pub fn records_from_index(index: &Map<String, Value>) -> Vec<FileRecord> {
    index
        .iter()
        .map(|(name, metadata)| FileRecord::from_metadata(name, metadata))
        .collect()
}
