//! Collecting per-region reports into one labelled list.

use std::fmt;

use log::{info, warn};

use crate::config::{HeaderMarkers, Region};
use crate::normalize::{normalize_row, Endpoint};
use crate::report::read_rows;
use crate::workspace::{Artifact, Workspace};

/// One output line: an endpoint and its country label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedEntry {
    pub endpoint: Endpoint,
    pub country: String,
}

impl AggregatedEntry {
    pub fn new(endpoint: Endpoint, country: impl Into<String>) -> Self {
        Self {
            endpoint,
            country: country.into(),
        }
    }
}

impl fmt::Display for AggregatedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.endpoint, self.country)
    }
}

/// How many entries one region contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionYield {
    pub code: &'static str,
    pub name: &'static str,
    /// `None` when the region's report was missing or unreadable.
    pub entries: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub entries: Vec<AggregatedEntry>,
    pub regions: Vec<RegionYield>,
}

/// Reads region reports in region order and labels every row with its region.
pub struct Aggregator<'a> {
    regions: &'a [Region],
    markers: &'a HeaderMarkers,
}

impl<'a> Aggregator<'a> {
    pub fn new(regions: &'a [Region], markers: &'a HeaderMarkers) -> Self {
        Self { regions, markers }
    }

    /// Nothing is deduplicated: an IP reported twice is listed twice.
    pub fn aggregate(&self, workspace: &Workspace) -> Aggregation {
        let mut aggregation = Aggregation::default();

        for region in self.regions {
            let Some(path) = workspace.cached(Artifact::RegionResult(region)) else {
                warn!("未找到 {} 的结果文件", region.name);
                aggregation.regions.push(RegionYield {
                    code: region.code,
                    name: region.name,
                    entries: None,
                });
                continue;
            };

            let entries = match read_rows(&path) {
                Ok(rows) => {
                    let before = aggregation.entries.len();
                    aggregation.entries.extend(
                        rows.iter()
                            .filter_map(|row| normalize_row(row, self.markers))
                            .map(|endpoint| AggregatedEntry::new(endpoint, region.name)),
                    );
                    let added = aggregation.entries.len() - before;
                    info!("读取 {}: {} 个IP", region.name, added);
                    Some(added)
                }
                Err(e) => {
                    warn!("读取 {} 失败: {}", region.name, e);
                    None
                }
            };
            aggregation.regions.push(RegionYield {
                code: region.code,
                name: region.name,
                entries,
            });
        }

        aggregation
    }
}

/// Entry count per country, highest first. Ties keep first-appearance order.
pub fn tally(entries: &[AggregatedEntry]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in entries {
        match counts.iter_mut().find(|(country, _)| *country == entry.country) {
            Some((_, n)) => *n += 1,
            None => counts.push((entry.country.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
