//! # PRF History Export
//!
//! 从 PRF 历史指数页面批量导出每个网格的历史指数 CSV
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有浏览器资源，只暴露页面操作能力
//! - `SessionDriver` - 核心流程唯一依赖的页面操作接口
//! - `ChromeDriver` - 基于 Chromium 调试协议的实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `Enumerator` - 遍历 州 → 县 → 网格，得到去重后的网格列表
//! - `Ledger` - 追加写入、可重启恢复的完成记录
//! - `ArtifactWatcher` - 等待下载完成并改名
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个网格"的完整导出流程
//! - `SessionContext` - 页面当前已确认的选择
//! - `ExportFlow` - 重新选择路径 → 选年份 → 导出 → 等待文件 → 改名
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理浏览器会话的生命周期
//! - `orchestrator/leaf_processor` - 跳过已完成、软失败继续、限速
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, Selectors};
pub use error::{ConfigError, ExportError, ExportResult};
pub use infrastructure::{ChromeDriver, SessionDriver};
pub use models::{Leaf, LeafId, LeafPath, SelectOption, YearRange};
pub use orchestrator::{run_and_close, run_session, App, LeafOutcome, Orchestrator, RunSummary};
pub use services::{ArtifactWatcher, DiscoveryReport, Enumerator, Ledger};
pub use utils::logging as logger;
pub use utils::PollPolicy;
pub use workflow::{ExportFlow, SessionContext};
