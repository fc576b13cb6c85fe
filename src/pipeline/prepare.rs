//! Provisioning the tool and the IP list. Both are fatal when missing.

use log::{error, info};

use super::{Pipeline, SpeedTestTool, StageStatus};
use crate::download::{download_file, extract_executable};
use crate::error::PipelineError;
use crate::logging::section;
use crate::workspace::Artifact;

impl<T: SpeedTestTool> Pipeline<T> {
    pub(super) async fn ensure_tool(&self) -> Result<StageStatus, PipelineError> {
        section("步骤0: 下载测速工具");

        if let Some(path) = self.workspace.cached(Artifact::Tool) {
            info!("✓ 工具已存在: {}", path.display());
            return Ok(StageStatus::Cached);
        }

        let source = &self.config.tool;
        let timeouts = &self.config.timeouts;
        let archive = self.workspace.path(Artifact::ToolArchive);

        download_file(&self.client, &source.archive_url, &archive, timeouts.tool_download)
            .await
            .map_err(|e| {
                error!("下载失败: {}", e);
                PipelineError::ToolUnavailable(e)
            })?;

        let extracted = extract_executable(
            &archive,
            self.workspace.root(),
            &source.executable,
            timeouts.tool_extract,
        )
        .await;
        self.workspace.discard(Artifact::ToolArchive);

        let tool = extracted.map_err(|e| {
            error!("解压失败: {}", e);
            PipelineError::ToolUnavailable(e)
        })?;
        info!("✓ 工具准备完成: {}", tool.display());
        Ok(StageStatus::Done)
    }

    pub(super) async fn ensure_ip_list(&self) -> Result<StageStatus, PipelineError> {
        section("下载 Cloudflare IP 列表");

        if self.workspace.cached(Artifact::IpList).is_some() {
            info!("✓ IP列表已存在");
            return Ok(StageStatus::Cached);
        }

        let source = &self.config.ip_list;
        download_file(
            &self.client,
            &source.url,
            &self.workspace.path(Artifact::IpList),
            self.config.timeouts.ip_list_download,
        )
        .await
        .map_err(|e| {
            error!("IP列表下载失败: {}", e);
            PipelineError::IpListUnavailable(e)
        })?;

        info!("✓ IP列表下载完成");
        Ok(StageStatus::Done)
    }
}
