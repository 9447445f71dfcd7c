//! 日志工具模块
//!
//! 提供日志初始化以及运行过程中横幅与统计信息的输出

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::RunSummary;

/// 初始化 tracing 日志
///
/// 默认级别为 info，可通过 `RUST_LOG` 覆盖；重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 历史指数导出");
    info!("🌐 目标页面: {}", config.target_url);
    info!("📅 年份范围: {}-{}", config.start_year, config.end_year);
    info!("📁 下载目录: {}", config.download_dir.display());
    info!("{}", "=".repeat(60));
}

/// 记录网格枚举结果
///
/// # 参数
/// - `total`: 去重后的网格数量
/// - `skipped_branches`: 未能加载而被跳过的分支数量
/// - `already_done`: 完成记录中已存在的数量
pub fn log_leaves_discovered(total: usize, skipped_branches: usize, already_done: usize) {
    info!("✓ 共发现 {} 个不重复的网格 ID", total);
    if skipped_branches > 0 {
        info!("⚠️ 有 {} 个分支未能加载，已跳过", skipped_branches);
    }
    info!("📋 其中 {} 个已完成，将导出剩余 {} 个\n", already_done, total.saturating_sub(already_done));
}

/// 记录单个网格开始处理
pub fn log_leaf_start(index: usize, total: usize, label: &str) {
    info!("\n{}", "─".repeat(30));
    info!("[{}/{}] 开始导出网格 {}", index, total, label);
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🔎 发现: {}", summary.discovered);
    info!("⏭️ 跳过(已完成): {}", summary.skipped);
    info!("✅ 成功: {}/{}", summary.succeeded, summary.attempted);
    info!("❌ 失败: {}", summary.failed);
    if summary.skipped_branches > 0 {
        info!("⚠️ 跳过分支: {}", summary.skipped_branches);
    }
    info!("{}", "=".repeat(60));
    info!("\n完成记录: {}", config.ledger_path().display());
}
