use std::process;

use anyhow::{Context, Result};
use log::{error, info};

use cf_region_ips::logging::{init_logger, section};
use cf_region_ips::{Artifact, Config, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    init_logger().context("Failed to initialize logger")?;

    section(" Cloudflare IP 自动化测速");
    let config = Config::default();
    let t = config.thresholds;
    info!(
        " 配置: 高质量测试 ({}个IP, {}MB/s, {}ms)",
        t.count, t.min_speed_mbps, t.max_latency_ms
    );

    let pipeline = Pipeline::new(config);
    match pipeline.run().await {
        Ok(summary) => {
            let ws = pipeline.workspace();
            section("✅ 所有任务完成！");
            info!("⏱️  总耗时: {:.1} 分钟", summary.elapsed.as_secs_f64() / 60.0);
            info!("📦 生成的文件:");
            info!("   - {} (优选IP列表)", ws.file_name(Artifact::PreferredList));
            info!("   - {} (反代IP列表)", ws.file_name(Artifact::ProxyList));
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}
