//! Writing `ip.txt` and `pyip.txt`.

use log::{error, info, warn};

use super::{Pipeline, SpeedTestTool};
use crate::aggregate::{tally, AggregatedEntry, Aggregation, Aggregator};
use crate::error::PipelineError;
use crate::logging::section;
use crate::output::{log_preview, write_list, write_sentinel};
use crate::relabel::{relabel, CountryLookup};
use crate::report::read_rows;
use crate::workspace::Artifact;

const PREVIEW_LIMIT: usize = 10;

impl<T: SpeedTestTool> Pipeline<T> {
    /// Aggregates the region reports into `ip.txt`.
    ///
    /// With no entries the sentinel is written and the run is failed.
    pub fn generate_preferred_list(&self) -> Result<Aggregation, PipelineError> {
        section("步骤3: 生成优选IP列表 (ip.txt)");

        let aggregation =
            Aggregator::new(&self.config.regions, &self.config.markers).aggregate(&self.workspace);
        let path = self.workspace.path(Artifact::PreferredList);

        if aggregation.entries.is_empty() {
            error!("没有找到任何测速结果");
            write_sentinel(&path).map_err(|source| PipelineError::Write {
                path: path.clone(),
                source,
            })?;
            return Err(PipelineError::NoResults);
        }

        write_list(&path, &aggregation.entries).map_err(|source| PipelineError::Write {
            path: path.clone(),
            source,
        })?;
        info!("✅ 已生成 ip.txt，共 {} 个优质IP", aggregation.entries.len());
        report(&aggregation.entries, "IP分布统计", "前10个IP示例");
        Ok(aggregation)
    }

    /// Relabels the proxy round into `pyip.txt` and returns its entry count.
    ///
    /// Every failure is logged and leaves the sentinel in `pyip.txt`, except a
    /// report that cannot be read, which leaves `pyip.txt` untouched.
    pub fn generate_proxy_list(&self) -> usize {
        section("步骤5: 生成反代IP列表 (pyip.txt)");

        let path = self.workspace.path(Artifact::ProxyList);
        let Some(report_path) = self.workspace.cached(Artifact::ProxyResult) else {
            warn!("proxy_result.csv 不存在");
            self.write_proxy_sentinel();
            return 0;
        };

        let lookup = match CountryLookup::load(&self.workspace.path(Artifact::PreferredList)) {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!("读取 ip.txt 失败: {}", e);
                CountryLookup::default()
            }
        };

        let rows = match read_rows(&report_path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("读取反代结果失败: {}", e);
                return 0;
            }
        };

        let entries = relabel(&rows, &self.config.markers, &lookup);
        if entries.is_empty() {
            warn!("没有找到任何反代IP");
            self.write_proxy_sentinel();
            return 0;
        }

        if let Err(e) = write_list(&path, &entries) {
            warn!("无法写入 {}: {}", path.display(), e);
            return 0;
        }
        info!("✅ 已生成 pyip.txt，共 {} 个优质反代IP", entries.len());
        report(&entries, "反代IP分布统计", "前10个反代IP示例");
        entries.len()
    }

    fn write_proxy_sentinel(&self) {
        let path = self.workspace.path(Artifact::ProxyList);
        if let Err(e) = write_sentinel(&path) {
            warn!("无法写入 {}: {}", path.display(), e);
        }
    }
}

fn report(entries: &[AggregatedEntry], tally_title: &str, preview_title: &str) {
    info!("📊 {}:", tally_title);
    for (country, count) in tally(entries) {
        info!("   {}: {} 个", country, count);
    }
    info!("📝 {}:", preview_title);
    log_preview(entries, PREVIEW_LIMIT);
}
