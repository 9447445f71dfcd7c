//! 网格导出编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **一次性枚举**：运行开始时调用 `Enumerator` 得到全部网格
//! 2. **跳过已完成**：完成记录中已有的网格不再导出
//! 3. **逐个导出**：同一时间只导出一个网格（页面是共享的）
//! 4. **软失败**：单个网格失败只记录日志，继续下一个
//! 5. **限速**：每次导出后固定等待一段时间
//! 6. **统计输出**：汇总 发现 / 跳过 / 成功 / 失败

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ExportResult;
use crate::infrastructure::SessionDriver;
use crate::models::{Leaf, LeafId, YearRange};
use crate::services::{Enumerator, Ledger};
use crate::utils::logging;
use crate::workflow::ExportFlow;

/// 单个网格在一次运行中的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafOutcome {
    /// 完成记录中已存在
    Skipped,
    /// 导出成功并已写入完成记录
    Completed(PathBuf),
    /// 导出失败，未写入完成记录，下次运行会重试
    Failed(String),
}

/// 运行统计
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub discovered: usize,
    pub attempted: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_branches: usize,
    /// 失败的网格及原因，按处理顺序
    pub failures: Vec<(LeafId, String)>,
}

impl RunSummary {
    fn record(&mut self, id: &LeafId, outcome: &LeafOutcome) {
        match outcome {
            LeafOutcome::Skipped => self.skipped += 1,
            LeafOutcome::Completed(_) => {
                self.attempted += 1;
                self.succeeded += 1;
            }
            LeafOutcome::Failed(reason) => {
                self.attempted += 1;
                self.failed += 1;
                self.failures.push((id.clone(), reason.clone()));
            }
        }
    }
}

/// 网格导出编排器
///
/// 组合 枚举 / 完成记录 / 导出流程，不持有浏览器资源
pub struct Orchestrator<'a, D: SessionDriver> {
    driver: &'a D,
    config: &'a Config,
    ledger: Ledger,
    flow: ExportFlow<'a>,
    range: YearRange,
    throttle: Duration,
}

impl<'a, D: SessionDriver> Orchestrator<'a, D> {
    pub fn new(driver: &'a D, config: &'a Config, ledger: Ledger) -> ExportResult<Self> {
        Ok(Self {
            driver,
            config,
            ledger,
            flow: ExportFlow::new(config),
            range: YearRange::new(config.start_year, config.end_year)?,
            throttle: config.throttle(),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// 枚举全部网格并逐个导出
    ///
    /// 只有枚举阶段的致命错误会返回 `Err`，单个网格的失败都计入统计。
    pub async fn run(&mut self) -> ExportResult<RunSummary> {
        let report = Enumerator::new(&self.config.selectors, self.config.poll_policy())
            .discover(self.driver)
            .await?;

        let already_done = report
            .leaves
            .iter()
            .filter(|l| self.ledger.is_completed(&l.id))
            .count();
        logging::log_leaves_discovered(
            report.leaves.len(),
            report.skipped_branches.len(),
            already_done,
        );

        let mut summary = self.process_leaves(&report.leaves).await;
        summary.skipped_branches = report.skipped_branches.len();
        Ok(summary)
    }

    /// 按顺序处理给定的网格列表
    pub async fn process_leaves(&mut self, leaves: &[Leaf]) -> RunSummary {
        let mut summary = RunSummary {
            discovered: leaves.len(),
            ..Default::default()
        };

        for (index, leaf) in leaves.iter().enumerate() {
            let outcome = self.process_leaf(leaf, index + 1, leaves.len()).await;
            let attempted = !matches!(outcome, LeafOutcome::Skipped);
            summary.record(&leaf.id, &outcome);

            if attempted && !self.throttle.is_zero() {
                sleep(self.throttle).await;
            }
        }

        summary
    }

    /// 处理单个网格：Pending → Exporting → Completed | Failed
    async fn process_leaf(&mut self, leaf: &Leaf, index: usize, total: usize) -> LeafOutcome {
        if self.ledger.is_completed(&leaf.id) {
            return LeafOutcome::Skipped;
        }

        logging::log_leaf_start(index, total, &format!("{} ({})", leaf.id, leaf.path));

        let path = match self.flow.export_leaf(self.driver, leaf, self.range).await {
            Ok(path) => path,
            Err(e) => {
                warn!("[WARN] 网格 {} 导出失败: {}", leaf.id, e);
                return LeafOutcome::Failed(e.to_string());
            }
        };

        // 文件已落盘，写完成记录失败时下次运行会重新导出（文件名确定，直接覆盖）
        if let Err(e) = self.ledger.mark_completed(&leaf.id) {
            warn!("[WARN] 网格 {} 已导出，但写入完成记录失败: {:#}", leaf.id, e);
            return LeafOutcome::Failed(format!("写入完成记录失败: {}", e));
        }

        info!("✅ 网格 {} 完成: {}", leaf.id, path.display());
        LeafOutcome::Completed(path)
    }
}
