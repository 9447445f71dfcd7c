use anyhow::Result;
use prf_history_export::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    // 加载配置
    let config = Config::load()?;

    // 初始化并运行应用；单个网格的失败不影响退出码
    App::initialize(config).await?.run().await?;

    Ok(())
}
