//! Cloudflare preferred-IP pipeline.
//!
//! Drives an external speed test tool once per region, then merges the
//! per-region CSV reports into `ip.txt` (`ip:port#country` per line). A second
//! round re-tests those endpoints and writes `pyip.txt`, labelled by the
//! first round's countries.

pub mod aggregate;
pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod region_filter;
pub mod relabel;
pub mod report;
pub mod tool;
pub mod workspace;

pub use aggregate::{AggregatedEntry, Aggregation, Aggregator};
pub use config::{Config, Region};
pub use error::{PipelineError, ToolError};
pub use pipeline::{Pipeline, RunSummary, StageStatus};
pub use tool::{Invocation, SpeedTestTool};
pub use workspace::{Artifact, Workspace};
