//! Compiled-in configuration.
//!
//! Nothing here is read from the environment or the command line. A `Config`
//! is built once in `main` and handed to every component that needs it.

use std::path::PathBuf;
use std::time::Duration;

/// Port assumed when a report row carries none.
pub const DEFAULT_PORT: &str = "443";

/// Label given to proxy-round entries with no first-round match.
pub const UNKNOWN_COUNTRY: &str = "未知";

/// The single line written to an output file that has no entries.
pub const NO_DATA_SENTINEL: &str = "# 暂无数据";

/// Placeholder the speed test tool writes for an IP it could not resolve.
pub const IP_PLACEHOLDER: &str = "N/A";

/// A product-level region grouping one or more Cloudflare colo codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Three-letter code, also used to name the region's files.
    pub code: &'static str,
    /// Display label written after `#` in the output files.
    pub name: &'static str,
    /// Colo codes that belong to this region.
    pub colos: &'static [&'static str],
}

impl Region {
    pub fn matches_colo(&self, colo: &str) -> bool {
        self.colos.iter().any(|c| c.eq_ignore_ascii_case(colo))
    }

    /// Lowercase code used as the file name stem (`hkg_result.csv`).
    pub fn file_stem(&self) -> String {
        self.code.to_ascii_lowercase()
    }
}

pub fn default_regions() -> Vec<Region> {
    vec![
        Region {
            code: "HKG",
            name: "香港",
            colos: &["HKG"],
        },
        Region {
            code: "NRT",
            name: "日本",
            colos: &["NRT", "KIX", "ITM", "FUK"],
        },
        Region {
            code: "ICN",
            name: "韩国",
            colos: &["ICN"],
        },
        Region {
            code: "LAX",
            name: "美国",
            colos: &["LAX", "SJC", "SEA", "SFO", "EWR", "IAD", "ORD", "DFW"],
        },
        Region {
            code: "SIN",
            name: "新加坡",
            colos: &["SIN"],
        },
    ]
}

/// Quality gates passed to every speed test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Number of IPs to download-test (`-dn`).
    pub count: u32,
    /// Download speed floor in MB/s (`-sl`).
    pub min_speed_mbps: u32,
    /// Average latency ceiling in ms (`-tl`).
    pub max_latency_ms: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            count: 20,
            min_speed_mbps: 100,
            max_latency_ms: 200,
        }
    }
}

/// Wall-clock limits for each blocking step.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub tool_download: Duration,
    pub tool_extract: Duration,
    pub ip_list_download: Duration,
    pub region_scan: Duration,
    pub region_test: Duration,
    pub region_fallback_test: Duration,
    pub proxy_test: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            tool_download: Duration::from_secs(120),
            tool_extract: Duration::from_secs(60),
            ip_list_download: Duration::from_secs(30),
            region_scan: Duration::from_secs(180),
            region_test: Duration::from_secs(600),
            region_fallback_test: Duration::from_secs(900),
            proxy_test: Duration::from_secs(900),
        }
    }
}

/// Substrings used to recognise report columns.
///
/// The tool localises its CSV headers and changes them between modes, so
/// columns are found by marker rather than by name or index. A header matches
/// a marker set when it contains any of the set's markers.
#[derive(Debug, Clone)]
pub struct HeaderMarkers {
    /// An IP column header must contain one of these...
    pub ip: &'static [&'static str],
    /// ...and one of these.
    pub address: &'static [&'static str],
    pub port: &'static [&'static str],
    pub colo: &'static [&'static str],
}

impl Default for HeaderMarkers {
    fn default() -> Self {
        Self {
            ip: &["IP"],
            address: &["地址", "Address", "address"],
            port: &["端口", "Port", "port"],
            colo: &["地区码", "Colo", "colo"],
        }
    }
}

/// Where the speed test executable comes from.
#[derive(Debug, Clone)]
pub struct ToolSource {
    pub executable: String,
    pub archive_url: String,
    pub archive_file: String,
}

/// Where the public IP range list comes from.
#[derive(Debug, Clone)]
pub struct IpListSource {
    pub url: String,
    pub file: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub tool: ToolSource,
    pub ip_list: IpListSource,
    /// URL probed by the latency-only region scan.
    pub probe_url: String,
    /// Latency ceiling for the region scan, high enough to keep every colo.
    pub scan_max_latency_ms: u32,
    pub regions: Vec<Region>,
    pub thresholds: Thresholds,
    pub timeouts: Timeouts,
    /// Pause between consecutive region tests.
    pub region_pause: Duration,
    pub markers: HeaderMarkers,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            tool: ToolSource {
                executable: "CloudflareST_proxy_linux_amd64".to_string(),
                archive_url: "https://github.com/byJoey/CloudflareSpeedTest/releases/download/v1.0/CloudflareST_proxy_linux_amd64.tar.gz".to_string(),
                archive_file: "speedtest.tar.gz".to_string(),
            },
            ip_list: IpListSource {
                url: "https://www.cloudflare.com/ips-v4".to_string(),
                file: "Cloudflare.txt".to_string(),
            },
            probe_url: "https://jhb.ovh".to_string(),
            scan_max_latency_ms: 9999,
            regions: default_regions(),
            thresholds: Thresholds::default(),
            timeouts: Timeouts::default(),
            region_pause: Duration::from_secs(2),
            markers: HeaderMarkers::default(),
        }
    }
}

impl Config {
    /// Same configuration rooted at another directory.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }
}
