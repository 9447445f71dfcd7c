//! 网格枚举服务 - 业务能力层
//!
//! 逐级遍历 州 → 县 → 网格 三级联动下拉框，得到去重后的网格列表

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::Selectors;
use crate::error::{ExportError, ExportResult};
use crate::infrastructure::SessionDriver;
use crate::models::{Leaf, LeafId, LeafPath, SelectOption};
use crate::utils::PollPolicy;

/// 枚举结果
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// 去重后的网格，按首次发现的顺序
    pub leaves: Vec<Leaf>,
    /// 下级列表未能加载而被跳过的分支
    pub skipped_branches: Vec<String>,
    /// 在多个上级下重复出现的网格 ID
    pub non_unique: Vec<LeafId>,
}

/// 网格枚举服务
///
/// 职责：
/// - 选择上级选项后等待下级列表加载
/// - 单个分支加载失败时跳过该分支，继续其他分支
/// - 按 value 去重，保留首次出现的位置和路径
pub struct Enumerator<'a> {
    selectors: &'a Selectors,
    policy: PollPolicy,
}

impl<'a> Enumerator<'a> {
    pub fn new(selectors: &'a Selectors, policy: PollPolicy) -> Self {
        Self { selectors, policy }
    }

    /// 遍历整棵选择树
    ///
    /// 顶层列表读取失败或为空时整体失败；下级分支的失败（包括驱动报错）
    /// 只记录在报告里。
    pub async fn discover<D: SessionDriver>(&self, driver: &D) -> ExportResult<DiscoveryReport> {
        let regions = self
            .read_populated(driver, &self.selectors.region, &[])
            .await?
            .ok_or_else(|| ExportError::discovery("州列表", "顶层下拉框没有任何选项"))?;
        info!("🔎 共 {} 个州，开始枚举网格...", regions.len());

        let mut report = DiscoveryReport::default();
        let mut seen: HashMap<LeafId, LeafPath> = HashMap::new();
        let mut previous_counties: Vec<SelectOption> = Vec::new();
        let mut previous_grids: Vec<SelectOption> = Vec::new();

        for region in &regions {
            let counties = match self
                .select_and_read(
                    driver,
                    &self.selectors.region,
                    region,
                    &self.selectors.sub_region,
                    &previous_counties,
                )
                .await
            {
                Ok(Some(counties)) => counties,
                Ok(None) => {
                    warn!("⚠️ 州 {} 的县列表未能加载，跳过该分支", region.label);
                    report.skipped_branches.push(region.label.clone());
                    continue;
                }
                Err(e) => {
                    warn!("⚠️ 州 {} 枚举出错，跳过该分支: {}", region.label, e);
                    report.skipped_branches.push(region.label.clone());
                    continue;
                }
            };
            debug!("州 {}: {} 个县", region.label, counties.len());

            for county in &counties {
                let branch = format!("{} / {}", region.label, county.label);
                let grids = match self
                    .select_and_read(
                        driver,
                        &self.selectors.sub_region,
                        county,
                        &self.selectors.grid,
                        &previous_grids,
                    )
                    .await
                {
                    Ok(Some(grids)) => grids,
                    Ok(None) => {
                        warn!("⚠️ {} 的网格列表未能加载，跳过该分支", branch);
                        report.skipped_branches.push(branch);
                        continue;
                    }
                    Err(e) => {
                        warn!("⚠️ {} 枚举出错，跳过该分支: {}", branch, e);
                        report.skipped_branches.push(branch);
                        continue;
                    }
                };

                for grid in &grids {
                    let path = LeafPath {
                        region: region.clone(),
                        sub_region: county.clone(),
                        grid: grid.clone(),
                    };
                    let leaf = Leaf::new(path);

                    if let Some(first) = seen.get(&leaf.id) {
                        if first.region.value != region.value || first.sub_region.value != county.value {
                            warn!(
                                "⚠️ 网格 {} 同时出现在 [{}] 和 [{}] 下，按首次出现处理",
                                leaf.id, first, leaf.path
                            );
                            if !report.non_unique.contains(&leaf.id) {
                                report.non_unique.push(leaf.id.clone());
                            }
                        }
                        continue;
                    }

                    seen.insert(leaf.id.clone(), leaf.path.clone());
                    report.leaves.push(leaf);
                }
                previous_grids = grids;
            }
            previous_counties = counties;
        }

        info!(
            "✓ 枚举完成: {} 个网格，跳过 {} 个分支",
            report.leaves.len(),
            report.skipped_branches.len()
        );
        Ok(report)
    }

    /// 选择上级选项，再等待下级列表加载
    async fn select_and_read<D: SessionDriver>(
        &self,
        driver: &D,
        parent: &str,
        option: &SelectOption,
        child: &str,
        stale: &[SelectOption],
    ) -> ExportResult<Option<Vec<SelectOption>>> {
        driver.select_option(parent, &option.value).await?;
        self.read_populated(driver, child, stale).await
    }

    /// 等待下拉框加载出选项
    ///
    /// 选项非空且与上一个分支的列表不同时视为已加载；
    /// 若超时时列表非空但与上一个分支相同，也接受（两个分支确实可能相同）。
    /// 超时且列表仍为空时返回 `None`。
    async fn read_populated<D: SessionDriver>(
        &self,
        driver: &D,
        selector: &str,
        stale: &[SelectOption],
    ) -> ExportResult<Option<Vec<SelectOption>>> {
        let ready = self
            .policy
            .poll(move |_| async move {
                let options = driver.read_options(selector).await?;
                let fresh = !options.is_empty() && options.as_slice() != stale;
                Ok(fresh.then_some(options))
            })
            .await?;

        if ready.is_some() {
            return Ok(ready);
        }

        let last = driver.read_options(selector).await?;
        if last.is_empty() {
            Ok(None)
        } else {
            debug!("{} 的选项与上一个分支相同，按已加载处理", selector);
            Ok(Some(last))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::time::Duration;

    /// 内存中的三级联动下拉框
    struct TreeDriver {
        selectors: Selectors,
        tree: BTreeMap<&'static str, Vec<(&'static str, Vec<&'static str>)>>,
        region: RefCell<Option<String>>,
        county: RefCell<Option<String>>,
        /// 选择该值时驱动报错
        broken_select: Option<&'static str>,
        /// 该县下的网格列表读取时驱动报错
        broken_read: Option<&'static str>,
    }

    impl TreeDriver {
        fn new(tree: Vec<(&'static str, Vec<(&'static str, Vec<&'static str>)>)>) -> Self {
            Self {
                selectors: Selectors::default(),
                tree: tree.into_iter().collect(),
                region: RefCell::new(None),
                county: RefCell::new(None),
                broken_select: None,
                broken_read: None,
            }
        }

        fn opts(values: impl IntoIterator<Item = &'static str>) -> Vec<SelectOption> {
            values.into_iter().map(|v| SelectOption::new(v, v)).collect()
        }
    }

    impl SessionDriver for TreeDriver {
        async fn open(&self, _url: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn select_option(&self, selector: &str, value: &str) -> anyhow::Result<()> {
            if self.broken_select == Some(value) {
                anyhow::bail!("option {} vanished", value);
            }
            if selector == self.selectors.region {
                *self.region.borrow_mut() = Some(value.to_string());
                *self.county.borrow_mut() = None;
            } else if selector == self.selectors.sub_region {
                *self.county.borrow_mut() = Some(value.to_string());
            }
            Ok(())
        }

        async fn read_options(&self, selector: &str) -> anyhow::Result<Vec<SelectOption>> {
            let region = self.region.borrow().clone();
            let county = self.county.borrow().clone();
            let counties = region
                .as_deref()
                .and_then(|r| self.tree.get(r))
                .cloned()
                .unwrap_or_default();

            if selector == self.selectors.grid && county.is_some() && county.as_deref() == self.broken_read {
                anyhow::bail!("grid list of {:?} detached", county);
            }

            Ok(if selector == self.selectors.region {
                Self::opts(self.tree.keys().copied())
            } else if selector == self.selectors.sub_region {
                Self::opts(counties.iter().map(|(c, _)| *c))
            } else {
                let grids = counties
                    .into_iter()
                    .find(|(c, _)| Some(*c) == county.as_deref())
                    .map(|(_, g)| g)
                    .unwrap_or_default();
                Self::opts(grids)
            })
        }

        async fn selected_value(&self, selector: &str) -> anyhow::Result<Option<String>> {
            Ok(if selector == self.selectors.region {
                self.region.borrow().clone()
            } else if selector == self.selectors.sub_region {
                self.county.borrow().clone()
            } else {
                None
            })
        }

        async fn wait_for_element(&self, _selector: &str, _timeout: Duration) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn click_text(&self, _text: &str) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn close(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn policy() -> PollPolicy {
        PollPolicy::fixed(Duration::from_millis(30), Duration::from_millis(5))
    }

    fn ids(report: &DiscoveryReport) -> Vec<&str> {
        report.leaves.iter().map(|l| l.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_discover_walks_cross_product_in_order() {
        let driver = TreeDriver::new(vec![
            ("R1", vec![("C1", vec!["G1", "G2"]), ("C2", vec!["G3"])]),
            ("R2", vec![("C3", vec!["G4"])]),
        ]);
        let selectors = Selectors::default();
        let report = Enumerator::new(&selectors, policy())
            .discover(&driver)
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["G1", "G2", "G3", "G4"]);
        assert_eq!(report.leaves[2].path.sub_region.value, "C2");
        assert!(report.skipped_branches.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_leaf_keeps_first_position() {
        let driver = TreeDriver::new(vec![
            ("R1", vec![("C1", vec!["G1", "G2"])]),
            ("R2", vec![("C2", vec!["G2", "G3"])]),
        ]);
        let selectors = Selectors::default();
        let report = Enumerator::new(&selectors, policy())
            .discover(&driver)
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["G1", "G2", "G3"]);
        assert_eq!(report.leaves[1].path.region.value, "R1");
        assert_eq!(report.non_unique, vec![LeafId::new("G2")]);
    }

    #[tokio::test]
    async fn test_empty_branch_is_skipped_not_fatal() {
        let driver = TreeDriver::new(vec![
            ("R1", vec![("C1", vec![])]),
            ("R2", vec![]),
            ("R3", vec![("C3", vec!["G9"])]),
        ]);
        let selectors = Selectors::default();
        let report = Enumerator::new(&selectors, policy())
            .discover(&driver)
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["G9"]);
        assert_eq!(report.skipped_branches, vec!["R1 / C1".to_string(), "R2".to_string()]);
    }

    #[tokio::test]
    async fn test_identical_sibling_lists_are_accepted() {
        let driver = TreeDriver::new(vec![
            ("R1", vec![("C1", vec!["G1"])]),
            ("R2", vec![("C1", vec!["G1"])]),
        ]);
        let selectors = Selectors::default();
        let report = Enumerator::new(&selectors, policy())
            .discover(&driver)
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["G1"]);
        assert!(report.skipped_branches.is_empty());
        assert_eq!(report.non_unique, vec![LeafId::new("G1")]);
    }

    #[tokio::test]
    async fn test_driver_error_in_one_county_skips_only_that_branch() {
        let mut driver = TreeDriver::new(vec![
            ("R1", vec![("C1", vec!["G1"]), ("C2", vec!["G2"])]),
            ("R2", vec![("C3", vec!["G3"])]),
        ]);
        driver.broken_select = Some("C2");
        let selectors = Selectors::default();
        let report = Enumerator::new(&selectors, policy())
            .discover(&driver)
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["G1", "G3"]);
        assert_eq!(report.skipped_branches, vec!["R1 / C2".to_string()]);
    }

    #[tokio::test]
    async fn test_driver_error_while_reading_children_skips_branch() {
        let mut driver = TreeDriver::new(vec![
            ("R1", vec![("C1", vec!["G1"]), ("C2", vec!["G2"])]),
            ("R2", vec![("C3", vec!["G3"])]),
        ]);
        driver.broken_read = Some("C1");
        driver.broken_select = Some("R2");
        let selectors = Selectors::default();
        let report = Enumerator::new(&selectors, policy())
            .discover(&driver)
            .await
            .unwrap();

        assert_eq!(ids(&report), vec!["G2"]);
        assert_eq!(
            report.skipped_branches,
            vec!["R1 / C1".to_string(), "R2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_top_level_is_fatal() {
        let driver = TreeDriver::new(vec![]);
        let selectors = Selectors::default();
        let err = Enumerator::new(&selectors, policy())
            .discover(&driver)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Discovery { .. }));
    }
}
