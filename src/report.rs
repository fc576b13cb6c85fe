//! Reading the speed test tool's CSV reports.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ReportError;

/// One report line keyed by column header.
///
/// Headers are kept sorted so lookups never depend on the report's column
/// order.
pub type Row = BTreeMap<String, String>;

/// Reads every data row of a report with a header line.
///
/// Short rows keep only the columns they have. Values are stored untrimmed.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Number of data rows in a report.
pub fn count_rows(path: &Path) -> Result<usize, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;
    let mut count = 0;
    for record in reader.records() {
        record?;
        count += 1;
    }
    Ok(count)
}

/// Finds the first column whose header satisfies every marker group and
/// returns its trimmed value.
///
/// A header satisfies a group when it contains any marker of that group.
pub fn find_field<'a>(row: &'a Row, groups: &[&[&str]]) -> Option<&'a str> {
    row.iter()
        .find(|(header, _)| {
            groups
                .iter()
                .all(|markers| markers.iter().any(|m| header.contains(m)))
        })
        .map(|(_, value)| value.trim())
}
