//! 浏览器资源的获取
//!
//! 负责启动或连接浏览器、后台处理事件、设置下载目录，
//! 返回一个已经打开空白页的 [`BrowserHandle`]。

pub mod connection;
pub mod headless;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, Handler, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::Config;

pub use connection::connect_to_browser;
pub use headless::launch_browser;

/// 已就绪的浏览器资源
pub struct BrowserHandle {
    pub browser: Browser,
    pub page: Page,
    /// 后台事件循环
    pub handler_task: JoinHandle<()>,
    /// 是否由本程序启动（连接的外部浏览器不会被关闭）
    pub owned: bool,
}

/// 根据配置启动或连接浏览器，并把下载目录指向 `download_dir`
pub async fn open_browser(config: &Config, download_dir: &Path) -> Result<BrowserHandle> {
    let (browser, handler, owned) = match config.browser_debug_port {
        Some(port) => {
            let (browser, handler) = connect_to_browser(port).await?;
            (browser, handler, false)
        }
        None => {
            let (browser, handler) =
                launch_browser(config.headless, config.chrome_executable.as_deref()).await?;
            (browser, handler, true)
        }
    };

    let handler_task = spawn_handler(handler);

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    set_download_dir(&browser, download_dir).await?;

    let page = browser
        .new_page("about:blank")
        .await
        .context("创建新页面失败")?;

    Ok(BrowserHandle {
        browser,
        page,
        handler_task,
        owned,
    })
}

/// 在后台处理浏览器事件
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

/// 允许下载，并让文件直接落在下载目录中
async fn set_download_dir(browser: &Browser, download_dir: &Path) -> Result<()> {
    let absolute = download_dir
        .canonicalize()
        .with_context(|| format!("下载目录不可用: {}", download_dir.display()))?;

    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(absolute.to_string_lossy().to_string())
        .build()
        .map_err(|e| anyhow::anyhow!("下载参数无效: {}", e))?;

    browser
        .execute(params)
        .await
        .context("设置下载目录失败")?;

    info!("📥 下载目录: {}", absolute.display());
    debug!("已允许浏览器下载");
    Ok(())
}
