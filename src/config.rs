//! 程序配置
//!
//! 加载顺序：默认值 → `$PRF_CONFIG` 指向的 TOML 文件 → 环境变量

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::utils::poll::PollPolicy;

/// 页面控件的 CSS 选择器
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub region: String,
    pub sub_region: String,
    pub grid: String,
    pub start_year: String,
    pub end_year: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            region: "select#State, select[name='State']".to_string(),
            sub_region: "select#County, select[name='County']".to_string(),
            grid: "select#GridId, select[name='GridId']".to_string(),
            start_year: "select#HistoricalStartYear, select[name='HistoricalStartYear']"
                .to_string(),
            end_year: "select#HistoricalEndYear, select[name='HistoricalEndYear']".to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 目标URL
    pub target_url: String,
    /// 历史指数所在的标签页文字
    pub tab_text: String,
    /// 导出按钮文字
    pub export_button_text: String,
    /// 站点下载时使用的固定文件名
    pub download_file_name: String,
    /// 下载目录
    pub download_dir: PathBuf,
    /// 完成记录文件，未设置时放在下载目录中
    pub ledger_file: Option<PathBuf>,
    pub start_year: u16,
    pub end_year: u16,
    /// 单次等待的超时时间（秒）
    pub poll_timeout_secs: u64,
    /// 首次轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 两个网格之间的礼貌性延迟（毫秒）
    pub throttle_ms: u64,
    /// 设置后连接已有浏览器，而不是启动无头浏览器
    pub browser_debug_port: Option<u16>,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub selectors: Selectors,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://public-rma.fpac.usda.gov/apps/PRF".to_string(),
            tab_text: "Historical Indexes".to_string(),
            export_button_text: "Export to CSV".to_string(),
            download_file_name: "HistoricalIndexes.csv".to_string(),
            download_dir: PathBuf::from("data/PRF_Historical"),
            ledger_file: None,
            start_year: 1940,
            end_year: 2025,
            poll_timeout_secs: 60,
            poll_interval_ms: 500,
            throttle_ms: 1000,
            browser_debug_port: None,
            headless: true,
            chrome_executable: None,
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    /// 按 默认值 → TOML → 环境变量 的顺序加载并校验配置
    pub fn load() -> Result<Self> {
        let base = match std::env::var("PRF_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_env_overrides(self) -> Self {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }

        Self {
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            download_dir: std::env::var("DOWNLOAD_DIR").map(PathBuf::from).unwrap_or(self.download_dir),
            ledger_file: std::env::var("LEDGER_FILE").ok().map(PathBuf::from).or(self.ledger_file),
            start_year: parsed("START_YEAR").unwrap_or(self.start_year),
            end_year: parsed("END_YEAR").unwrap_or(self.end_year),
            poll_timeout_secs: parsed("POLL_TIMEOUT_SECS").unwrap_or(self.poll_timeout_secs),
            poll_interval_ms: parsed("POLL_INTERVAL_MS").unwrap_or(self.poll_interval_ms),
            throttle_ms: parsed("THROTTLE_MS").unwrap_or(self.throttle_ms),
            browser_debug_port: parsed("BROWSER_DEBUG_PORT").or(self.browser_debug_port),
            headless: parsed("HEADLESS").unwrap_or(self.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE")
                .ok()
                .map(PathBuf::from)
                .or(self.chrome_executable),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_year > self.end_year {
            return Err(ConfigError::InvalidYearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        if self.poll_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue {
                field: "poll_timeout_secs",
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "poll_interval_ms",
            });
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_file
            .clone()
            .unwrap_or_else(|| self.download_dir.join("_completed_grids.csv"))
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(self.poll_timeout_secs),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}
