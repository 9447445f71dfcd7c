use std::path::Path;

use anyhow::Result;
use chromiumoxide::{Browser, BrowserConfig, Handler};
use tracing::{debug, error, info};

/// 启动浏览器（默认无头模式）
///
/// 窗口大小固定为 1600x1200，保证下拉框和导出按钮都在可视区域内。
pub async fn launch_browser(
    headless: bool,
    chrome_executable: Option<&Path>,
) -> Result<(Browser, Handler)> {
    info!("🚀 启动{}浏览器...", if headless { "无头" } else { "" });

    let mut builder = BrowserConfig::builder()
        .window_size(1600, 1200)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",              // 禁用沙盒，防止权限问题导致的崩溃
            "--disable-dev-shm-usage",   // 防止共享内存不足
        ]);
    builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(path) = chrome_executable {
        debug!("使用指定的浏览器: {}", path.display());
        builder = builder.chrome_executable(path);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        anyhow::anyhow!("配置浏览器失败: {}", e)
    })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        anyhow::anyhow!("启动浏览器失败: {}", e)
    })?;
    debug!("浏览器启动成功");

    Ok((browser, handler))
}
