//! The `ip:port#country` list format of `ip.txt` and `pyip.txt`.

use std::path::Path;

use crate::aggregate::AggregatedEntry;
use crate::config::NO_DATA_SENTINEL;

/// One line per entry in insertion order, or the sentinel line when empty.
pub fn serialize(entries: &[AggregatedEntry]) -> String {
    if entries.is_empty() {
        return format!("{}\n", NO_DATA_SENTINEL);
    }
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

pub fn write_list(path: &Path, entries: &[AggregatedEntry]) -> std::io::Result<()> {
    std::fs::write(path, serialize(entries))
}

pub fn write_sentinel(path: &Path) -> std::io::Result<()> {
    write_list(path, &[])
}

/// Parses list text into `(ip:port, country)` pairs.
///
/// Blank lines, comment lines and lines without `#` are skipped. The country
/// is everything after the first `#`.
pub fn parse_list(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('#'))
        .map(|(endpoint, country)| (endpoint.to_string(), country.to_string()))
        .collect()
}

/// Logs the first `limit` entries, numbered from 1.
pub fn log_preview(entries: &[AggregatedEntry], limit: usize) {
    for (i, entry) in entries.iter().take(limit).enumerate() {
        log::info!("   {:2}. {}", i + 1, entry);
    }
}
