//! Stage orchestration.
//!
//! Stages run strictly in sequence. Only tool provisioning, IP list
//! provisioning and the first aggregation can abort the run; every other
//! stage logs a warning and reports [`StageStatus::Failed`].

mod lists;
mod prepare;
mod testing;

use std::time::{Duration, Instant};

use log::info;
use reqwest::Client;

use crate::config::Config;
use crate::error::PipelineError;
use crate::logging::section;
use crate::tool::ExternalTool;
use crate::workspace::{Artifact, Workspace};

pub use crate::tool::SpeedTestTool;

/// Outcome of a non-fatal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Done,
    /// Earlier output was found and reused.
    Cached,
    Failed,
}

impl StageStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, StageStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub region_detection: StageStatus,
    /// Region code and test outcome, in region order.
    pub region_tests: Vec<(&'static str, StageStatus)>,
    pub preferred_entries: usize,
    pub proxy_test: StageStatus,
    pub proxy_entries: usize,
    pub elapsed: Duration,
}

pub struct Pipeline<T> {
    config: Config,
    workspace: Workspace,
    tool: T,
    client: Client,
}

impl Pipeline<ExternalTool> {
    /// Pipeline driving the real executable inside `config.work_dir`.
    pub fn new(config: Config) -> Self {
        let workspace = Workspace::new(&config);
        let program = workspace.path(Artifact::Tool);
        let program = std::path::absolute(&program).unwrap_or(program);
        let tool = ExternalTool::new(program, workspace.root().to_path_buf());
        Self::with_tool(config, tool)
    }
}

impl<T: SpeedTestTool> Pipeline<T> {
    pub fn with_tool(config: Config, tool: T) -> Self {
        Self {
            workspace: Workspace::new(&config),
            config,
            tool,
            client: Client::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let start = Instant::now();

        self.ensure_tool().await?;
        self.ensure_ip_list().await?;

        let region_detection = self.detect_regions().await;

        section("步骤2: 测试各个地区");
        let region_tests = self.test_regions().await;
        let passed = region_tests.iter().filter(|(_, s)| s.is_success()).count();
        info!("{}/{} 个地区测速成功", passed, region_tests.len());

        let preferred = self.generate_preferred_list()?;

        let proxy_test = self.test_proxy_round().await;
        let proxy_entries = self.generate_proxy_list();

        let summary = RunSummary {
            region_detection,
            region_tests,
            preferred_entries: preferred.entries.len(),
            proxy_test,
            proxy_entries,
            elapsed: start.elapsed(),
        };
        info!(
            "run finished: {} preferred, {} proxy entries",
            summary.preferred_entries, summary.proxy_entries
        );
        Ok(summary)
    }
}
