use anyhow::Result;
use chromiumoxide::{Browser, Handler};
use tracing::{debug, error, info};

/// 连接到已经开启远程调试端口的浏览器
pub async fn connect_to_browser(port: u16) -> Result<(Browser, Handler)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    Ok((browser, handler))
}
