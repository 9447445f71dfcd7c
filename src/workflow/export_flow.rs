//! 单个网格的导出流程 - 流程层
//!
//! 流程顺序：
//! 1. 切到历史指数标签页，逐级确认 州 → 县 → 网格，选完后回读一次
//! 2. 选择起止年份
//! 3. 清理残留下载 → 点击导出
//! 4. 等待下载完成 → 改名为确定性的文件名

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ExportError, ExportResult};
use crate::infrastructure::SessionDriver;
use crate::models::{artifact_file_name, Leaf, SelectOption, YearRange};
use crate::services::ArtifactWatcher;
use crate::utils::PollPolicy;
use crate::workflow::session_ctx::SessionContext;

/// 整条路径最多重新选择的次数
const PATH_ATTEMPTS: u32 = 2;

/// 单个网格的导出流程
///
/// - 每次调用都从顶层重新确认路径，以页面上实际读到的选择为准
/// - 不持有浏览器，只通过 [`SessionDriver`] 操作页面
/// - 不写完成记录，由编排层决定
pub struct ExportFlow<'a> {
    config: &'a Config,
    watcher: ArtifactWatcher,
    policy: PollPolicy,
    ctx: SessionContext,
}

impl<'a> ExportFlow<'a> {
    pub fn new(config: &'a Config) -> Self {
        let policy = config.poll_policy();
        Self {
            config,
            watcher: ArtifactWatcher::new(
                config.download_dir.clone(),
                config.download_file_name.clone(),
                policy,
            ),
            policy,
            ctx: SessionContext::default(),
        }
    }

    /// 当前已确认的页面选择
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// 导出一个网格，返回最终文件路径
    pub async fn export_leaf<D: SessionDriver>(
        &mut self,
        driver: &D,
        leaf: &Leaf,
        range: YearRange,
    ) -> ExportResult<PathBuf> {
        self.assert_path(driver, leaf).await?;
        self.select_years(driver, range).await?;

        self.watcher.clear_stale().await?;

        info!("📤 点击导出: {}", self.config.export_button_text);
        if !driver.click_text(&self.config.export_button_text).await? {
            return Err(ExportError::ExportTrigger {
                text: self.config.export_button_text.clone(),
            });
        }

        self.watcher.wait_until_complete().await?;

        let final_name = artifact_file_name(&leaf.id, range, self.watcher.extension());
        let path = self.watcher.promote(&final_name).await?;
        info!("✓ 已保存 {}", final_name);
        Ok(path)
    }

    /// 切到标签页并从顶层开始重新确认完整路径
    ///
    /// 选完网格后再读一次三个控件；若某一级的值被异步刷新冲掉，
    /// 整条路径重来一次。
    async fn assert_path<D: SessionDriver>(&mut self, driver: &D, leaf: &Leaf) -> ExportResult<()> {
        let config = self.config;
        let selectors = &config.selectors;

        if !driver.click_text(&config.tab_text).await? {
            debug!("未找到标签页 '{}'，假定已在当前页", config.tab_text);
        }
        if !driver
            .wait_for_element(&selectors.region, self.policy.timeout)
            .await?
        {
            return Err(ExportError::selection(&selectors.region, "<控件不存在>"));
        }

        let levels = [
            (&selectors.region, &leaf.path.region, Some(&selectors.sub_region)),
            (&selectors.sub_region, &leaf.path.sub_region, Some(&selectors.grid)),
            (&selectors.grid, &leaf.path.grid, None),
        ];

        let mut attempt = 1;
        loop {
            self.ctx.reset();
            for (selector, option, child) in levels {
                self.assert_level(driver, selector, option, child.map(String::as_str))
                    .await?;
            }
            self.ctx.assert_region(&leaf.path.region);
            self.ctx.assert_sub_region(&leaf.path.sub_region);
            self.ctx.assert_grid(&leaf.path.grid);

            let Some((selector, value)) = self.lost_level(driver, &levels).await? else {
                debug!("已选择 {}", self.ctx);
                return Ok(());
            };
            if attempt >= PATH_ATTEMPTS {
                self.ctx.reset();
                return Err(ExportError::selection(selector, value));
            }
            warn!("⚠️ {} 的选择被页面刷新冲掉，重新选择路径", selector);
            attempt += 1;
        }
    }

    /// 确认一级下拉框选中 `option`
    ///
    /// 已经选中时不再触发 change；否则选择后等待下级控件真正刷新，
    /// 避免在旧的下级列表上继续选择。
    async fn assert_level<D: SessionDriver>(
        &self,
        driver: &D,
        selector: &str,
        option: &SelectOption,
        child: Option<&str>,
    ) -> ExportResult<()> {
        let value = option.value.as_str();
        let offered = self
            .policy
            .poll(move |_| async move {
                let options = driver.read_options(selector).await?;
                Ok(options.iter().any(|o| o.value == value).then_some(()))
            })
            .await?;
        if offered.is_none() {
            return Err(ExportError::selection(selector, value));
        }

        if driver.selected_value(selector).await?.as_deref() == Some(value) {
            debug!("{} 已是 {}", selector, value);
            return Ok(());
        }

        let before = match child {
            Some(child) => Some((
                driver.read_options(child).await?,
                driver.selected_value(child).await?,
            )),
            None => None,
        };

        driver.select_option(selector, value).await?;

        if let (Some(child), Some((options, selected))) = (child, before) {
            self.wait_repopulated(driver, child, &options, selected.as_deref())
                .await?;
        }
        Ok(())
    }

    /// 等待上级变化后下级控件刷新
    ///
    /// 下级列表与选择前不同，或下级原有的选中值被清掉，即视为已刷新。
    /// 两个上级的下级列表可能完全相同，所以超时后照常继续，
    /// 由后续的选项检查决定成败。
    async fn wait_repopulated<D: SessionDriver>(
        &self,
        driver: &D,
        child: &str,
        stale: &[SelectOption],
        stale_selected: Option<&str>,
    ) -> ExportResult<()> {
        let refreshed = self
            .policy
            .poll(move |_| async move {
                let options = driver.read_options(child).await?;
                if options.is_empty() {
                    return Ok(None);
                }
                if options.as_slice() != stale {
                    return Ok(Some(()));
                }
                let selected = driver.selected_value(child).await?;
                let cleared = stale_selected.is_some() && selected.as_deref() != stale_selected;
                Ok(cleared.then_some(()))
            })
            .await?;

        if refreshed.is_none() {
            debug!("{} 在等待时间内没有变化，按已刷新处理", child);
        }
        Ok(())
    }

    /// 找出选择后又丢失的一级，全部保持时返回 `None`
    async fn lost_level<'s, D: SessionDriver>(
        &self,
        driver: &D,
        levels: &[(&'s String, &'s SelectOption, Option<&'s String>)],
    ) -> ExportResult<Option<(&'s str, &'s str)>> {
        for &(selector, option, _) in levels {
            let selected = driver.selected_value(selector).await?;
            if selected.as_deref() != Some(option.value.as_str()) {
                return Ok(Some((selector.as_str(), option.value.as_str())));
            }
        }
        Ok(None)
    }

    /// 选择起止年份，年份必须与下拉框中的某个选项完全一致
    async fn select_years<D: SessionDriver>(&self, driver: &D, range: YearRange) -> ExportResult<()> {
        let selectors = &self.config.selectors;
        for (selector, year) in [
            (&selectors.start_year, range.start()),
            (&selectors.end_year, range.end()),
        ] {
            let wanted = year.to_string();
            let options = driver.read_options(selector).await?;
            let option = options
                .iter()
                .find(|o| o.label == wanted || o.value == wanted)
                .ok_or_else(|| ExportError::selection(selector.as_str(), wanted.as_str()))?;
            driver.select_option(selector, &option.value).await?;
        }
        debug!("已选择年份 {}-{}", range.start(), range.end());
        Ok(())
    }
}
