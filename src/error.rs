use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 导出流程中的错误
///
/// `Selection` / `ExportTrigger` / `ArtifactTimeout` 只影响单个网格，
/// 由编排层捕获后继续；`Session` 和未隔离的 `Discovery` 会终止本次运行。
#[derive(Debug, Error)]
pub enum ExportError {
    /// 下级列表在等待时间内没有加载出来
    #[error("枚举失败 ({branch}): {reason}")]
    Discovery { branch: String, reason: String },

    /// 控件中找不到要求的选项
    #[error("控件 {control} 中找不到选项 '{value}'")]
    Selection { control: String, value: String },

    /// 找不到导出按钮
    #[error("找不到导出按钮: '{text}'")]
    ExportTrigger { text: String },

    /// 下载文件在等待时间内没有出现或没有写完
    #[error("等待下载文件超时 ({}, 已等待 {:?})", .path.display(), .waited)]
    ArtifactTimeout { path: PathBuf, waited: Duration },

    /// 浏览器会话建立或导航失败
    #[error("会话错误: {0}")]
    Session(String),

    #[error("文件操作失败: {0}")]
    Io(#[from] std::io::Error),

    /// 浏览器驱动返回的其他错误
    #[error(transparent)]
    Driver(#[from] anyhow::Error),
}

impl ExportError {
    pub fn selection(control: impl Into<String>, value: impl Into<String>) -> Self {
        ExportError::Selection {
            control: control.into(),
            value: value.into(),
        }
    }

    pub fn discovery(branch: impl Into<String>, reason: impl Into<String>) -> Self {
        ExportError::Discovery {
            branch: branch.into(),
            reason: reason.into(),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("年份范围无效: 起始 {start} 大于结束 {end}")]
    InvalidYearRange { start: u16, end: u16 },

    #[error("配置项 {field} 不能为 0")]
    ZeroValue { field: &'static str },
}

/// 应用程序结果类型
pub type ExportResult<T> = Result<T, ExportError>;
