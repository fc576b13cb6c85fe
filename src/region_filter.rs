//! Splitting the region scan into per-region candidate lists.

use std::path::Path;

use log::warn;

use crate::config::{HeaderMarkers, Region, IP_PLACEHOLDER};
use crate::report::{find_field, read_rows, Row};

/// One line of the region scan: where the probe landed and which IP it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRow {
    pub colo: String,
    pub ip: String,
}

impl ScanRow {
    pub fn from_row(row: &Row, markers: &HeaderMarkers) -> Option<Self> {
        let ip = find_field(row, &[markers.ip, markers.address])?;
        if ip.is_empty() || ip == IP_PLACEHOLDER {
            return None;
        }
        let colo = find_field(row, &[markers.colo]).unwrap_or_default();
        Some(Self {
            colo: colo.to_string(),
            ip: ip.to_string(),
        })
    }
}

/// Loads the region scan report.
///
/// An absent or unreadable report yields no rows; callers then fall back to
/// the full IP list.
pub fn load_scan(path: &Path, markers: &HeaderMarkers) -> Vec<ScanRow> {
    if !path.is_file() {
        return Vec::new();
    }
    match read_rows(path) {
        Ok(rows) => rows
            .iter()
            .filter_map(|row| ScanRow::from_row(row, markers))
            .collect(),
        Err(e) => {
            warn!("读取地区IP失败: {}", e);
            Vec::new()
        }
    }
}

/// IPs whose colo belongs to `region`, in scan order. Repeats are kept.
pub fn candidates_for(scan: &[ScanRow], region: &Region) -> Vec<String> {
    scan.iter()
        .filter(|row| region.matches_colo(&row.colo))
        .map(|row| row.ip.clone())
        .collect()
}
