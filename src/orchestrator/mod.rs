//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行、清理）
//! - 唯一持有浏览器会话（ChromeDriver）
//! - 输出全局统计信息
//!
//! ### `leaf_processor` - 网格导出编排器
//! - 一次性枚举全部网格
//! - 跳过已完成的网格，逐个导出其余网格
//! - 单个网格失败不影响后续网格
//!
//! ## 层次关系
//!
//! ```text
//! app (持有浏览器会话)
//!     ↓
//! leaf_processor (处理 Vec<Leaf>)
//!     ↓
//! workflow::ExportFlow (处理单个 Leaf)
//!     ↓
//! services (能力层：enumerator / ledger / artifact)
//!     ↓
//! infrastructure (基础设施：SessionDriver)
//! ```

pub mod app;
pub mod leaf_processor;

pub use app::{run_and_close, run_session, App};
pub use leaf_processor::{LeafOutcome, Orchestrator, RunSummary};
