// End-to-end pipeline runs against a fake speed test tool.
//
// The tool executable and the IP list are pre-seeded in a temp workspace, so
// no network access or real binary is needed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use cf_region_ips::{
    Config, Invocation, Pipeline, PipelineError, SpeedTestTool, StageStatus, ToolError,
};
use tempfile::TempDir;

/// Writes a canned report for each known output name; any other invocation
/// behaves like a timeout.
struct FakeTool {
    work_dir: PathBuf,
    reports: HashMap<String, String>,
    calls: Mutex<Vec<(Invocation, Option<String>)>>,
}

impl FakeTool {
    fn new(work_dir: &Path, reports: &[(&str, &str)]) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            reports: reports
                .iter()
                .map(|(name, csv)| (name.to_string(), csv.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl SpeedTestTool for FakeTool {
    async fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
        let input = invocation
            .input
            .as_ref()
            .and_then(|name| std::fs::read_to_string(self.work_dir.join(name)).ok());
        self.calls.lock().unwrap().push((invocation.clone(), input));

        match self.reports.get(&invocation.output) {
            Some(csv) => {
                std::fs::write(self.work_dir.join(&invocation.output), csv)?;
                Ok(())
            }
            None => Err(ToolError::Timeout(invocation.timeout)),
        }
    }
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("CloudflareST_proxy_linux_amd64"), "").unwrap();
    std::fs::write(dir.path().join("Cloudflare.txt"), "104.16.0.0/13\n").unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn config(dir: &TempDir) -> Config {
    let mut config = Config::default().with_work_dir(dir.path());
    config.region_pause = Duration::ZERO;
    config
}

fn read(dir: &TempDir, name: &str) -> String {
    std::fs::read_to_string(dir.path().join(name)).unwrap()
}

fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
    args.windows(2).any(|w| w[0] == flag && w[1] == value)
}

const SCAN: &str = "IP 地址,已发送,已接收,丢包率,平均延迟,下载速度 (MB/s),地区码\n\
    104.16.1.1,4,4,0.00,80.1,0.00,HKG\n\
    104.16.2.2,4,4,0.00,90.3,0.00,KIX\n";

#[tokio::test]
async fn test_full_run_with_cached_region_scan() {
    let dir = workspace(&[("region_scan.csv", SCAN)]);
    let tool = FakeTool::new(
        dir.path(),
        &[
            ("hkg_result.csv", "IP 地址,端口,平均延迟\n104.16.1.1,443,80.1\n"),
            ("nrt_result.csv", "IP 地址,端口\n104.16.2.2,8443\n"),
            ("proxy_result.csv", "IP 地址,端口\n104.16.2.2,8443\n8.8.8.8,443\n"),
        ],
    );
    let pipeline = Pipeline::with_tool(config(&dir), tool);

    let summary = pipeline.run().await.expect("run should succeed");

    assert_eq!(summary.region_detection, StageStatus::Cached);
    assert_eq!(
        summary.region_tests,
        [
            ("HKG", StageStatus::Done),
            ("NRT", StageStatus::Done),
            ("ICN", StageStatus::Failed),
            ("LAX", StageStatus::Failed),
            ("SIN", StageStatus::Failed),
        ]
    );
    assert_eq!(summary.preferred_entries, 2);
    assert_eq!(summary.proxy_test, StageStatus::Done);
    assert_eq!(summary.proxy_entries, 2);

    assert_eq!(read(&dir, "ip.txt"), "104.16.1.1:443#香港\n104.16.2.2:8443#日本\n");
    assert_eq!(read(&dir, "pyip.txt"), "104.16.2.2:8443#日本\n8.8.8.8:443#未知\n");

    // Temporary candidate lists are cleaned up, reports are kept.
    for name in ["hkg_ips.txt", "nrt_ips.txt", "proxy_test.txt"] {
        assert!(!dir.path().join(name).exists(), "{name} should be removed");
    }
    assert!(dir.path().join("hkg_result.csv").exists());
}

#[tokio::test]
async fn test_invocations_follow_candidates_and_fallback() {
    let dir = workspace(&[("region_scan.csv", SCAN)]);
    let tool = FakeTool::new(
        dir.path(),
        &[
            ("hkg_result.csv", "IP 地址,端口\n104.16.1.1,443\n"),
            ("proxy_result.csv", "IP 地址,端口\n104.16.1.1,443\n"),
        ],
    );
    let pipeline = Pipeline::with_tool(config(&dir), &tool);
    pipeline.run().await.expect("run should succeed");

    let calls = tool.calls.lock().unwrap();
    assert_eq!(calls.len(), 6, "five regions plus the proxy round");
    assert!(calls
        .iter()
        .all(|(inv, _)| !inv.args().contains(&"-httping".to_string())));

    let (hkg, hkg_input) = &calls[0];
    assert!(has_pair(&hkg.args(), "-f", "hkg_ips.txt"));
    assert!(has_pair(&hkg.args(), "-o", "hkg_result.csv"));
    assert_eq!(hkg.colo_filter, None);
    assert_eq!(hkg_input.as_deref(), Some("104.16.1.1\n"));
    assert_eq!(hkg.timeout, Duration::from_secs(600));

    let (nrt, nrt_input) = &calls[1];
    assert!(has_pair(&nrt.args(), "-f", "nrt_ips.txt"));
    assert_eq!(nrt_input.as_deref(), Some("104.16.2.2\n"));

    let (icn, _) = &calls[2];
    assert!(has_pair(&icn.args(), "-f", "Cloudflare.txt"));
    assert!(has_pair(&icn.args(), "-cfcolo", "ICN"));
    assert_eq!(icn.timeout, Duration::from_secs(900));

    let (lax, _) = &calls[3];
    assert!(has_pair(&lax.args(), "-cfcolo", "LAX,SJC,SEA,SFO,EWR,IAD,ORD,DFW"));

    let (proxy, proxy_input) = &calls[5];
    assert!(has_pair(&proxy.args(), "-f", "proxy_test.txt"));
    assert!(has_pair(&proxy.args(), "-o", "proxy_result.csv"));
    assert_eq!(proxy_input.as_deref(), Some("104.16.1.1:443\n"));
}

#[tokio::test]
async fn test_region_detection_runs_scan_when_not_cached() {
    let dir = workspace(&[]);
    let tool = FakeTool::new(dir.path(), &[("region_scan.csv", SCAN)]);
    let pipeline = Pipeline::with_tool(config(&dir), &tool);

    assert_eq!(pipeline.detect_regions().await, StageStatus::Done);
    // Second call finds the report and does not touch the tool.
    assert_eq!(pipeline.detect_regions().await, StageStatus::Cached);

    let calls = tool.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let args = calls[0].0.args();
    assert!(args.contains(&"-httping".to_string()));
    assert!(args.contains(&"-dd".to_string()));
    assert!(has_pair(&args, "-url", "https://jhb.ovh"));
    assert!(has_pair(&args, "-o", "region_scan.csv"));
}

#[tokio::test]
async fn test_no_results_writes_sentinel_and_fails() {
    let dir = workspace(&[]);
    let tool = FakeTool::new(dir.path(), &[]);
    let pipeline = Pipeline::with_tool(config(&dir), &tool);

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::NoResults), "got {err:?}");
    assert_eq!(read(&dir, "ip.txt"), "# 暂无数据\n");
    assert!(!dir.path().join("pyip.txt").exists());

    // Scan failed, then every region fell back to the full list.
    let calls = tool.calls.lock().unwrap();
    assert_eq!(calls.len(), 6);
    assert!(calls[1..]
        .iter()
        .all(|(inv, _)| inv.colo_filter.is_some()));
}

#[tokio::test]
async fn test_single_region_report_produces_exact_line() {
    let dir = workspace(&[("hkg_result.csv", "IP 地址,端口\n104.16.1.1,443\n")]);
    let tool = FakeTool::new(dir.path(), &[]);
    let pipeline = Pipeline::with_tool(config(&dir), &tool);

    let aggregation = pipeline.generate_preferred_list().unwrap();
    assert_eq!(aggregation.entries.len(), 1);
    assert_eq!(read(&dir, "ip.txt"), "104.16.1.1:443#香港\n");
}

#[tokio::test]
async fn test_proxy_round_without_ip_list_degrades() {
    let dir = workspace(&[]);
    let tool = FakeTool::new(dir.path(), &[]);
    let pipeline = Pipeline::with_tool(config(&dir), &tool);

    assert_eq!(pipeline.test_proxy_round().await, StageStatus::Failed);
    assert!(tool.calls.lock().unwrap().is_empty());

    assert_eq!(pipeline.generate_proxy_list(), 0);
    assert_eq!(read(&dir, "pyip.txt"), "# 暂无数据\n");
}

#[tokio::test]
async fn test_proxy_round_skips_sentinel_ip_list() {
    let dir = workspace(&[("ip.txt", "# 暂无数据\n")]);
    let tool = FakeTool::new(dir.path(), &[]);
    let pipeline = Pipeline::with_tool(config(&dir), &tool);

    assert_eq!(pipeline.test_proxy_round().await, StageStatus::Failed);
    assert!(tool.calls.lock().unwrap().is_empty());
}
