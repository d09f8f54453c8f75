//! Report text printed ahead of the move lines.

use std::fmt::Write;
use std::path::Path;

use gcode_archiver_mover::Mode;
use gcode_archiver_retention::{FileRecord, Partition, Recency};

/// Everything printed before the move lines. The blank separator is always there.
pub fn preamble(partition: &Partition, verbose: bool, mode: Mode, archive_dir: &Path) -> String {
    let mut out = String::new();
    if verbose {
        out.push_str(&listing(partition));
    }
    out.push('\n');

    if verbose {
        let _ = match mode {
            Mode::DryRun => writeln!(out, "Dry run. The following commands would be executed:"),
            Mode::Execute => writeln!(out, "Executing moves to archive: {}", archive_dir.display()),
        };
    }
    out
}

pub fn listing(partition: &Partition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recency metric = max(modified, print_start_time)");

    let _ = writeln!(out, "Keeping {} files:", partition.keep.len());
    for record in &partition.keep {
        let _ = writeln!(out, "{}", line("KEEP", record));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Archiving {} files:", partition.archive.len());
    for record in &partition.archive {
        let _ = writeln!(out, "{}", line("ARCH", record));
    }
    out
}

fn line(tag: &str, record: &FileRecord) -> String {
    let recency = record.recency();
    // unknown rows carry one extra space before the name
    let gap = if matches!(recency, Recency::Unknown) { "   " } else { "  " };
    format!("  {:<6} {}{}{}", tag, recency, gap, record.name())
}
