//! On-disk artifacts and the file-presence cache.
//!
//! Every file the pipeline reads or writes is named by an [`Artifact`]. A
//! stage that may reuse earlier output asks [`Workspace::cached`] instead of
//! probing the filesystem itself.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::{Config, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact<'a> {
    /// The speed test executable.
    Tool,
    /// Downloaded `.tar.gz` containing the executable.
    ToolArchive,
    /// Public Cloudflare IPv4 range list.
    IpList,
    /// Latency-only scan of every colo (`region_scan.csv`).
    RegionScan,
    /// Temporary candidate IP list for one region.
    RegionCandidates(&'a Region),
    /// Speed test report for one region.
    RegionResult(&'a Region),
    /// Temporary `ip:port` list fed to the proxy round.
    ProxyCandidates,
    /// Speed test report of the proxy round.
    ProxyResult,
    /// `ip.txt`
    PreferredList,
    /// `pyip.txt`
    ProxyList,
}

impl fmt::Display for Artifact<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Tool => write!(f, "tool"),
            Artifact::ToolArchive => write!(f, "tool-archive"),
            Artifact::IpList => write!(f, "ip-list"),
            Artifact::RegionScan => write!(f, "region-scan"),
            Artifact::RegionCandidates(r) => write!(f, "{}-candidates", r.code),
            Artifact::RegionResult(r) => write!(f, "{}-result", r.code),
            Artifact::ProxyCandidates => write!(f, "proxy-candidates"),
            Artifact::ProxyResult => write!(f, "proxy-result"),
            Artifact::PreferredList => write!(f, "preferred-list"),
            Artifact::ProxyList => write!(f, "proxy-list"),
        }
    }
}

/// The working directory all artifacts live in.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    tool: String,
    tool_archive: String,
    ip_list: String,
}

impl Workspace {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.work_dir.clone(),
            tool: config.tool.executable.clone(),
            tool_archive: config.tool.archive_file.clone(),
            ip_list: config.ip_list.file.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name of an artifact, relative to the root.
    ///
    /// This is the form handed to the external tool, which runs inside the
    /// root directory.
    pub fn file_name(&self, artifact: Artifact<'_>) -> String {
        match artifact {
            Artifact::Tool => self.tool.clone(),
            Artifact::ToolArchive => self.tool_archive.clone(),
            Artifact::IpList => self.ip_list.clone(),
            Artifact::RegionScan => "region_scan.csv".to_string(),
            Artifact::RegionCandidates(region) => format!("{}_ips.txt", region.file_stem()),
            Artifact::RegionResult(region) => format!("{}_result.csv", region.file_stem()),
            Artifact::ProxyCandidates => "proxy_test.txt".to_string(),
            Artifact::ProxyResult => "proxy_result.csv".to_string(),
            Artifact::PreferredList => "ip.txt".to_string(),
            Artifact::ProxyList => "pyip.txt".to_string(),
        }
    }

    pub fn path(&self, artifact: Artifact<'_>) -> PathBuf {
        self.root.join(self.file_name(artifact))
    }

    /// Path of an artifact left by an earlier stage or run, if it exists.
    ///
    /// Presence is the only check. A stale file is treated as valid.
    pub fn cached(&self, artifact: Artifact<'_>) -> Option<PathBuf> {
        let path = self.path(artifact);
        if path.is_file() {
            debug!("cache hit for {}: {}", artifact, path.display());
            Some(path)
        } else {
            None
        }
    }

    /// Removes a temporary artifact. A missing file is not an error.
    pub fn discard(&self, artifact: Artifact<'_>) {
        let path = self.path(artifact);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_regions;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::new(&Config::default().with_work_dir(dir.path()))
    }

    #[test]
    fn test_region_artifacts_use_lowercase_stem() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        let regions = default_regions();
        assert_eq!(ws.file_name(Artifact::RegionResult(&regions[0])), "hkg_result.csv");
        assert_eq!(ws.file_name(Artifact::RegionCandidates(&regions[4])), "sin_ips.txt");
    }

    #[test]
    fn test_fixed_artifact_names() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        assert_eq!(ws.file_name(Artifact::RegionScan), "region_scan.csv");
        assert_eq!(ws.file_name(Artifact::PreferredList), "ip.txt");
        assert_eq!(ws.file_name(Artifact::ProxyList), "pyip.txt");
        assert_eq!(ws.file_name(Artifact::IpList), "Cloudflare.txt");
        assert_eq!(ws.path(Artifact::ProxyResult), dir.path().join("proxy_result.csv"));
    }

    #[test]
    fn test_cached_reflects_presence() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        assert!(ws.cached(Artifact::RegionScan).is_none());

        std::fs::write(ws.path(Artifact::RegionScan), "stale").unwrap();
        assert_eq!(ws.cached(Artifact::RegionScan), Some(ws.path(Artifact::RegionScan)));
    }

    #[test]
    fn test_discard_missing_file_is_silent() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        ws.discard(Artifact::ProxyCandidates);

        std::fs::write(ws.path(Artifact::ProxyCandidates), "1.1.1.1:443\n").unwrap();
        ws.discard(Artifact::ProxyCandidates);
        assert!(!ws.path(Artifact::ProxyCandidates).exists());
    }
}
