//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建下载目录、启动或连接浏览器
//! 2. **资源管理**：唯一持有浏览器会话，任何退出路径都会释放
//! 3. **打开页面**：导航到目标页面并切到历史指数标签页
//! 4. **向下委托**：交给 `Orchestrator` 完成枚举和导出
//! 5. **全局统计**：输出最终结果

use anyhow::{Context, Result};
use tracing::{error, warn};

use crate::browser;
use crate::config::Config;
use crate::error::ExportError;
use crate::infrastructure::{ChromeDriver, SessionDriver};
use crate::orchestrator::leaf_processor::{Orchestrator, RunSummary};
use crate::services::Ledger;
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    driver: ChromeDriver,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        tokio::fs::create_dir_all(&config.download_dir)
            .await
            .with_context(|| format!("无法创建下载目录: {}", config.download_dir.display()))?;

        let handle = browser::open_browser(&config, &config.download_dir)
            .await
            .map_err(|e| ExportError::Session(format!("{:#}", e)))?;

        Ok(Self {
            config,
            driver: ChromeDriver::new(handle),
        })
    }

    /// 运行应用主逻辑
    ///
    /// 无论成功与否都会关闭浏览器会话。
    pub async fn run(mut self) -> Result<RunSummary> {
        match run_and_close(&mut self.driver, &self.config).await {
            Ok(summary) => {
                logging::print_final_stats(&summary, &self.config);
                Ok(summary)
            }
            Err(e) => {
                error!("❌ 运行终止: {}", e);
                Err(e.into())
            }
        }
    }
}

/// 执行一次完整的导出，结束后（包括出错时）关闭会话
pub async fn run_and_close<D: SessionDriver>(
    driver: &mut D,
    config: &Config,
) -> Result<RunSummary, ExportError> {
    let result = run_session(&*driver, config).await;

    if let Err(e) = driver.close().await {
        warn!("释放浏览器会话失败: {}", e);
    }
    result
}

/// 打开目标页面并执行一次完整的导出
pub async fn run_session<D: SessionDriver>(driver: &D, config: &Config) -> Result<RunSummary, ExportError> {
    driver
        .open(&config.target_url)
        .await
        .map_err(|e| ExportError::Session(format!("无法打开 {}: {:#}", config.target_url, e)))?;

    if !driver
        .click_text(&config.tab_text)
        .await
        .map_err(|e| ExportError::Session(format!("{:#}", e)))?
    {
        warn!("⚠️ 未找到标签页 '{}'", config.tab_text);
    }

    let ledger = Ledger::open(config.ledger_path())
        .map_err(|e| ExportError::Session(format!("{:#}", e)))?;

    Orchestrator::new(driver, config, ledger)?.run().await
}
