//! The external speed test executable.
//!
//! The tool is a black box: it takes a candidate IP file and thresholds and
//! writes a CSV report. [`SpeedTestTool`] is the seam the pipeline calls
//! through so tests can substitute a fake.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use tokio::process::Command;

use crate::config::Thresholds;
use crate::error::ToolError;

/// Latency-only HTTP probing, used for the region scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbe {
    pub url: String,
    pub max_latency_ms: u32,
}

/// One run of the tool. File names are relative to the tool's working dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// `-f`; `None` uses the tool's built-in IP list.
    pub input: Option<String>,
    pub thresholds: Option<Thresholds>,
    /// `-cfcolo`, comma-separated colo codes.
    pub colo_filter: Option<String>,
    pub probe: Option<HttpProbe>,
    /// `-o`
    pub output: String,
    pub timeout: Duration,
}

impl Invocation {
    pub fn region_scan(probe: HttpProbe, output: impl Into<String>, timeout: Duration) -> Self {
        Self {
            input: None,
            thresholds: None,
            colo_filter: None,
            probe: Some(probe),
            output: output.into(),
            timeout,
        }
    }

    pub fn speed_test(
        input: impl Into<String>,
        thresholds: Thresholds,
        output: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            input: Some(input.into()),
            thresholds: Some(thresholds),
            colo_filter: None,
            probe: None,
            output: output.into(),
            timeout,
        }
    }

    pub fn with_colo_filter(mut self, colos: &[&str]) -> Self {
        self.colo_filter = Some(colos.join(","));
        self
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(probe) = &self.probe {
            args.extend([
                "-dd".to_string(),
                "-tl".to_string(),
                probe.max_latency_ms.to_string(),
                "-httping".to_string(),
                "-url".to_string(),
                probe.url.clone(),
            ]);
        }
        if let Some(input) = &self.input {
            args.extend(["-f".to_string(), input.clone()]);
        }
        if let Some(t) = &self.thresholds {
            args.extend([
                "-dn".to_string(),
                t.count.to_string(),
                "-sl".to_string(),
                t.min_speed_mbps.to_string(),
                "-tl".to_string(),
                t.max_latency_ms.to_string(),
            ]);
        }
        if let Some(colos) = &self.colo_filter {
            args.extend(["-cfcolo".to_string(), colos.clone()]);
        }
        args.extend(["-o".to_string(), self.output.clone()]);
        args
    }
}

pub trait SpeedTestTool {
    /// Runs the tool to completion or until the invocation's timeout.
    ///
    /// `Ok` means the process exited successfully; whether it wrote a report
    /// is for the caller to check.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<(), ToolError>> + Send;
}

impl<T: SpeedTestTool> SpeedTestTool for &T {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<(), ToolError>> + Send {
        (**self).run(invocation)
    }
}

/// The real executable, run inside the workspace directory.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
    work_dir: PathBuf,
}

impl ExternalTool {
    pub fn new(program: PathBuf, work_dir: PathBuf) -> Self {
        Self { program, work_dir }
    }
}

impl SpeedTestTool for ExternalTool {
    async fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
        let args = invocation.args();
        info!("执行命令: {} {}", self.program.display(), args.join(" "));

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("测速中 -> {}", invocation.output));
        spinner.enable_steady_tick(Duration::from_millis(120));

        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(invocation.timeout, child).await;
        spinner.finish_and_clear();

        let output = match result {
            Ok(output) => output?,
            Err(_) => {
                warn!("⏱️  命令超时 ({}秒)", invocation.timeout.as_secs());
                return Err(ToolError::Timeout(invocation.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("{}", stdout.trim_end());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("{}", stderr.trim_end());
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed(output.status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_scan_args() {
        let inv = Invocation::region_scan(
            HttpProbe {
                url: "https://jhb.ovh".to_string(),
                max_latency_ms: 9999,
            },
            "region_scan.csv",
            Duration::from_secs(180),
        );
        assert_eq!(
            inv.args(),
            ["-dd", "-tl", "9999", "-httping", "-url", "https://jhb.ovh", "-o", "region_scan.csv"]
        );
    }

    #[test]
    fn test_speed_test_args() {
        let inv = Invocation::speed_test(
            "hkg_ips.txt",
            Thresholds::default(),
            "hkg_result.csv",
            Duration::from_secs(600),
        );
        assert_eq!(
            inv.args(),
            ["-f", "hkg_ips.txt", "-dn", "20", "-sl", "100", "-tl", "200", "-o", "hkg_result.csv"]
        );
    }

    #[test]
    fn test_colo_filter_joins_codes() {
        let inv = Invocation::speed_test(
            "Cloudflare.txt",
            Thresholds::default(),
            "nrt_result.csv",
            Duration::from_secs(900),
        )
        .with_colo_filter(&["NRT", "KIX"]);
        let args = inv.args();
        let at = args.iter().position(|a| a == "-cfcolo").unwrap();
        assert_eq!(args[at + 1], "NRT,KIX");
        assert_eq!(&args[args.len() - 2..], ["-o", "nrt_result.csv"]);
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = ExternalTool::new(dir.path().join("no-such-tool"), dir.path().to_path_buf());
        let inv = Invocation::speed_test("a.txt", Thresholds::default(), "b.csv", Duration::from_secs(5));

        let err = tool.run(&inv).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn(_)), "got {err:?}");
    }
}
