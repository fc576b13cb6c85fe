//! Error types.
//!
//! Only [`PipelineError`] ever leaves the pipeline. The other enums are
//! caught at stage boundaries and turned into a logged warning.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Failures while fetching the tool archive or the IP list.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction did not finish within {0:?}")]
    ExtractTimeout(Duration),

    #[error("executable {0} not found after extraction")]
    MissingExecutable(PathBuf),
}

/// Failures of one external speed test invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to start speed test tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("speed test tool timed out after {0:?}")]
    Timeout(Duration),

    #[error("speed test tool exited with {0}")]
    Failed(ExitStatus),

    #[error("speed test tool produced no report at {0}")]
    MissingReport(PathBuf),
}

/// Failures reading a CSV report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Fatal errors. Any of these ends the run with exit code 1.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("speed test tool unavailable: {0}")]
    ToolUnavailable(#[source] DownloadError),

    #[error("IP list unavailable: {0}")]
    IpListUnavailable(#[source] DownloadError),

    #[error("no speed test results were aggregated")]
    NoResults,

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
