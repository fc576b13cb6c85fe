//! Stages that drive the external tool.

use std::path::Path;

use log::{info, warn};

use super::{Pipeline, SpeedTestTool, StageStatus};
use crate::config::Region;
use crate::logging::section;
use crate::output::parse_list;
use crate::region_filter::{candidates_for, load_scan, ScanRow};
use crate::report::count_rows;
use crate::tool::{HttpProbe, Invocation};
use crate::workspace::Artifact;

impl<T: SpeedTestTool> Pipeline<T> {
    /// Classifies colos with a latency-only scan. Skipped entirely when a
    /// scan report already exists.
    pub async fn detect_regions(&self) -> StageStatus {
        section("步骤1: 检测可用地区");

        if self.workspace.cached(Artifact::RegionScan).is_some() {
            info!("✓ 找到已有地区扫描结果，跳过检测");
            return StageStatus::Cached;
        }

        info!("🔍 开始扫描 Cloudflare 数据中心...");
        let invocation = Invocation::region_scan(
            HttpProbe {
                url: self.config.probe_url.clone(),
                max_latency_ms: self.config.scan_max_latency_ms,
            },
            self.workspace.file_name(Artifact::RegionScan),
            self.config.timeouts.region_scan,
        );

        if self.invoke(&invocation, Artifact::RegionScan).await {
            info!("✅ 地区检测完成");
            StageStatus::Done
        } else {
            warn!("地区检测失败，将使用默认配置");
            StageStatus::Failed
        }
    }

    /// Tests every region in order, pausing between regions.
    pub async fn test_regions(&self) -> Vec<(&'static str, StageStatus)> {
        let scan = load_scan(&self.workspace.path(Artifact::RegionScan), &self.config.markers);

        let mut results = Vec::with_capacity(self.config.regions.len());
        for (i, region) in self.config.regions.iter().enumerate() {
            if i > 0 && !self.config.region_pause.is_zero() {
                tokio::time::sleep(self.config.region_pause).await;
            }
            let status = self.test_region(region, &scan).await;
            results.push((region.code, status));
        }
        results
    }

    /// Tests one region against its scan candidates, or against the full IP
    /// list filtered by colo when the scan has none.
    pub async fn test_region(&self, region: &Region, scan: &[ScanRow]) -> StageStatus {
        section(&format!("测试地区: {} ({})", region.name, region.code));
        self.log_thresholds();

        let thresholds = self.config.thresholds;
        let timeouts = &self.config.timeouts;
        let output = self.workspace.file_name(Artifact::RegionResult(region));
        let candidates = candidates_for(scan, region);

        let ok = if candidates.is_empty() {
            warn!("未找到 {} 地区的IP，使用全量IP测试", region.name);
            let invocation = Invocation::speed_test(
                self.workspace.file_name(Artifact::IpList),
                thresholds,
                output,
                timeouts.region_fallback_test,
            )
            .with_colo_filter(region.colos);
            self.invoke(&invocation, Artifact::RegionResult(region)).await
        } else {
            info!("✓ 找到 {} 个 {} 地区的IP", candidates.len(), region.name);
            let list = Artifact::RegionCandidates(region);
            if let Err(e) = write_lines(&self.workspace.path(list), &candidates) {
                warn!("无法写入候选IP文件: {}", e);
                return StageStatus::Failed;
            }
            let invocation = Invocation::speed_test(
                self.workspace.file_name(list),
                thresholds,
                output,
                timeouts.region_test,
            );
            let ok = self.invoke(&invocation, Artifact::RegionResult(region)).await;
            self.workspace.discard(list);
            ok
        };

        if ok {
            self.log_report_size(Artifact::RegionResult(region), region.name);
            StageStatus::Done
        } else {
            warn!("{} 测速失败", region.name);
            StageStatus::Failed
        }
    }

    /// Re-tests the endpoints of `ip.txt` with the same thresholds.
    pub async fn test_proxy_round(&self) -> StageStatus {
        section("步骤4: 反代IP测速");

        let Some(path) = self.workspace.cached(Artifact::PreferredList) else {
            warn!("ip.txt 不存在，跳过反代测速");
            return StageStatus::Failed;
        };

        info!("📝 准备反代IP列表...");
        let endpoints: Vec<String> = match std::fs::read_to_string(&path) {
            Ok(text) => parse_list(&text).into_iter().map(|(endpoint, _)| endpoint).collect(),
            Err(e) => {
                warn!("读取 ip.txt 失败: {}", e);
                return StageStatus::Failed;
            }
        };
        if endpoints.is_empty() {
            warn!("没有可测试的IP");
            return StageStatus::Failed;
        }

        let list = Artifact::ProxyCandidates;
        if let Err(e) = write_lines(&self.workspace.path(list), &endpoints) {
            warn!("无法写入反代测试文件: {}", e);
            return StageStatus::Failed;
        }
        info!("✓ 准备测试 {} 个IP", endpoints.len());
        self.log_thresholds();

        let invocation = Invocation::speed_test(
            self.workspace.file_name(list),
            self.config.thresholds,
            self.workspace.file_name(Artifact::ProxyResult),
            self.config.timeouts.proxy_test,
        );
        let ok = self.invoke(&invocation, Artifact::ProxyResult).await;
        self.workspace.discard(list);

        if ok {
            self.log_report_size(Artifact::ProxyResult, "反代");
            StageStatus::Done
        } else {
            warn!("反代测速失败");
            StageStatus::Failed
        }
    }

    /// Runs the tool and checks that it left `report` behind.
    async fn invoke(&self, invocation: &Invocation, report: Artifact<'_>) -> bool {
        match self.tool.run(invocation).await {
            Ok(()) if self.workspace.cached(report).is_some() => true,
            Ok(()) => {
                warn!("测速工具未生成 {}", self.workspace.file_name(report));
                false
            }
            Err(e) => {
                warn!("{}", e);
                false
            }
        }
    }

    fn log_thresholds(&self) {
        let t = &self.config.thresholds;
        info!("📊 测试配置: 高质量测试");
        info!("   - IP数量: {}", t.count);
        info!("   - 速度下限: {} MB/s", t.min_speed_mbps);
        info!("   - 延迟上限: {} ms", t.max_latency_ms);
    }

    fn log_report_size(&self, report: Artifact<'_>, label: &str) {
        match count_rows(&self.workspace.path(report)) {
            Ok(n) => info!("✅ {} 测速完成，找到 {} 个优质IP", label, n),
            Err(e) => warn!("无法统计 {}: {}", self.workspace.file_name(report), e),
        }
    }
}

fn write_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    std::fs::write(path, text)
}
