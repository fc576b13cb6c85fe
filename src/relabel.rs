//! Labelling the proxy round by first-round country.

use std::collections::HashMap;
use std::path::Path;

use crate::aggregate::AggregatedEntry;
use crate::config::{HeaderMarkers, UNKNOWN_COUNTRY};
use crate::normalize::normalize_row;
use crate::output::parse_list;
use crate::report::Row;

/// `ip:port` → country, built from `ip.txt`.
#[derive(Debug, Clone, Default)]
pub struct CountryLookup {
    countries: HashMap<String, String>,
}

impl CountryLookup {
    /// Later pairs overwrite earlier ones with the same key.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            countries: pairs.into_iter().collect(),
        }
    }

    /// Builds the lookup from a list file. An absent file gives an empty lookup.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_pairs(parse_list(&text)))
    }

    /// Country for an exact `ip:port` key, or `未知`.
    pub fn country_for(&self, key: &str) -> &str {
        self.countries
            .get(key)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_COUNTRY)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Normalizes proxy-round rows and labels each by lookup instead of region.
pub fn relabel(rows: &[Row], markers: &HeaderMarkers, lookup: &CountryLookup) -> Vec<AggregatedEntry> {
    rows.iter()
        .filter_map(|row| normalize_row(row, markers))
        .map(|endpoint| {
            let country = lookup.country_for(&endpoint.to_string()).to_string();
            AggregatedEntry::new(endpoint, country)
        })
        .collect()
}
