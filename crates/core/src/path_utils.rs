//! Path utilities
//!
//! Handles tilde expansion for directories given on the command line or in config.

use std::path::PathBuf;

/// Expands a leading tilde (`~` or `~/...`) to the user's home directory.
/// Examples:
/// "~/printer_data/gcode" -> "/home/pi/printer_data/gcode"
/// "~" -> "/home/pi"
/// "/tmp/foo" -> "/tmp/foo" (no change)
pub fn expand_tilde(path: &str) -> String {
    let Some(rest) = path.strip_prefix('~') else {
        return path.to_string();
    };

    // "~user/..." is left alone
    if !rest.is_empty() && !rest.starts_with('/') {
        return path.to_string();
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}{}", home.trim_end_matches('/'), rest)
}

/// Helper to convert a potentially tilde-containing string into a PathBuf.
pub fn get_path(path: &str) -> PathBuf {
    PathBuf::from(expand_tilde(path))
}
