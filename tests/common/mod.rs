#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use prf_history_export::{Config, SelectOption, Selectors, SessionDriver};
use tempfile::TempDir;

pub type Tree = Vec<(&'static str, Vec<(&'static str, Vec<&'static str>)>)>;

#[derive(Debug, Default, Clone)]
struct Selection {
    region: Option<String>,
    county: Option<String>,
    grid: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

/// 州切换后县列表尚未刷新时的页面状态
#[derive(Debug, Clone)]
struct PendingRefresh {
    /// 还会返回旧县列表的读取次数
    reads_left: u32,
    /// 旧列表所属的州
    stale_region: Option<String>,
}

/// 模拟 PRF 页面：三级联动下拉框 + 年份 + 导出按钮
///
/// 点击导出时把当前选择写入下载目录中的固定文件名。
pub struct FakeSite {
    selectors: Selectors,
    download_dir: PathBuf,
    file_name: String,
    tree: Tree,
    years: Vec<u16>,
    selection: RefCell<Selection>,
    /// 点击导出后不会产生文件的网格
    pub silent_grids: RefCell<HashSet<String>>,
    /// 每次点击导出时页面上的 州/县/网格
    pub exports: RefCell<Vec<String>>,
    pub export_button: Cell<bool>,
    pub closed: Cell<bool>,
    /// 切换州之后，县列表滞后刷新的读取次数（0 表示立即刷新）
    pub county_lag: Cell<u32>,
    pending: RefCell<Option<PendingRefresh>>,
}

impl FakeSite {
    pub fn new(config: &Config, tree: Tree) -> Self {
        Self {
            selectors: config.selectors.clone(),
            download_dir: config.download_dir.clone(),
            file_name: config.download_file_name.clone(),
            tree,
            years: (1940..=2025).collect(),
            selection: RefCell::new(Selection::default()),
            silent_grids: RefCell::new(HashSet::new()),
            exports: RefCell::new(Vec::new()),
            export_button: Cell::new(true),
            closed: Cell::new(false),
            county_lag: Cell::new(0),
            pending: RefCell::new(None),
        }
    }

    pub fn silence(&self, grid: &str) {
        self.silent_grids.borrow_mut().insert(grid.to_string());
    }

    /// 把页面停在某个 州/县 上，模拟上一个网格留下的状态
    pub fn leave_selection(&self, region: &str, county: &str) {
        let mut s = self.selection.borrow_mut();
        s.region = Some(region.to_string());
        s.county = Some(county.to_string());
        s.grid = None;
    }

    /// 把页面停在完整的 州/县/网格 上
    pub fn leave_leaf(&self, region: &str, county: &str, grid: &str) {
        self.leave_selection(region, county);
        self.selection.borrow_mut().grid = Some(grid.to_string());
    }

    /// 县列表当前显示的是哪个州的选项
    fn county_source(&self) -> Option<String> {
        match self.pending.borrow().as_ref() {
            Some(p) => p.stale_region.clone(),
            None => self.selection.borrow().region.clone(),
        }
    }

    /// 县列表被读取一次；滞后结束时刷新列表并清空县和网格的选择
    fn tick_county_refresh(&self) {
        let mut pending = self.pending.borrow_mut();
        let Some(p) = pending.as_mut() else {
            return;
        };
        if p.reads_left > 0 {
            p.reads_left -= 1;
            return;
        }
        *pending = None;
        let mut s = self.selection.borrow_mut();
        s.county = None;
        s.grid = None;
    }

    pub fn exported(&self) -> Vec<String> {
        self.exports.borrow().clone()
    }

    fn counties(&self, region: Option<&str>) -> Vec<(&'static str, Vec<&'static str>)> {
        self.tree
            .iter()
            .find(|(r, _)| Some(*r) == region)
            .map(|(_, c)| c.clone())
            .unwrap_or_default()
    }

    fn options(&self, selector: &str) -> Vec<SelectOption> {
        let source = self.county_source();
        let s = self.selection.borrow();
        let labels: Vec<String> = if selector == self.selectors.region {
            self.tree.iter().map(|(r, _)| r.to_string()).collect()
        } else if selector == self.selectors.sub_region {
            self.counties(source.as_deref())
                .into_iter()
                .map(|(c, _)| c.to_string())
                .collect()
        } else if selector == self.selectors.grid {
            self.counties(source.as_deref())
                .into_iter()
                .find(|(c, _)| Some(*c) == s.county.as_deref())
                .map(|(_, g)| g.into_iter().map(str::to_string).collect())
                .unwrap_or_default()
        } else if selector == self.selectors.start_year || selector == self.selectors.end_year {
            self.years.iter().map(|y| y.to_string()).collect()
        } else {
            Vec::new()
        };
        labels
            .into_iter()
            .map(|v| SelectOption::new(v.clone(), v))
            .collect()
    }
}

impl SessionDriver for FakeSite {
    async fn open(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        if !self.options(selector).iter().any(|o| o.value == value) {
            bail!("控件 {} 中没有选项 '{}'", selector, value);
        }
        let lag = self.county_lag.get();
        let mut s = self.selection.borrow_mut();
        let value = Some(value.to_string());
        if selector == self.selectors.region && lag > 0 {
            // 旧的县列表和县选择暂时留在页面上
            *self.pending.borrow_mut() = Some(PendingRefresh {
                reads_left: lag,
                stale_region: s.region.clone(),
            });
            s.region = value;
        } else if selector == self.selectors.region {
            *s = Selection {
                region: value,
                start: s.start.take(),
                end: s.end.take(),
                ..Selection::default()
            };
        } else if selector == self.selectors.sub_region {
            s.county = value;
            s.grid = None;
        } else if selector == self.selectors.grid {
            s.grid = value;
        } else if selector == self.selectors.start_year {
            s.start = value;
        } else if selector == self.selectors.end_year {
            s.end = value;
        }
        Ok(())
    }

    async fn read_options(&self, selector: &str) -> Result<Vec<SelectOption>> {
        if selector == self.selectors.sub_region {
            self.tick_county_refresh();
        }
        Ok(self.options(selector))
    }

    async fn selected_value(&self, selector: &str) -> Result<Option<String>> {
        let s = self.selection.borrow();
        Ok(if selector == self.selectors.region {
            s.region.clone()
        } else if selector == self.selectors.sub_region {
            s.county.clone()
        } else if selector == self.selectors.grid {
            s.grid.clone()
        } else if selector == self.selectors.start_year {
            s.start.clone()
        } else if selector == self.selectors.end_year {
            s.end.clone()
        } else {
            None
        })
    }

    async fn wait_for_element(&self, _selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn click_text(&self, text: &str) -> Result<bool> {
        if !text.to_lowercase().contains("export") {
            return Ok(true);
        }
        if !self.export_button.get() {
            return Ok(false);
        }

        let s = self.selection.borrow().clone();
        let grid = s.grid.clone().unwrap_or_default();
        let row = format!(
            "{}/{}/{}",
            s.region.unwrap_or_default(),
            s.county.unwrap_or_default(),
            grid
        );
        self.exports.borrow_mut().push(row.clone());

        if !self.silent_grids.borrow().contains(&grid) {
            let body = format!(
                "{},{},{}\n",
                row,
                s.start.unwrap_or_default(),
                s.end.unwrap_or_default()
            );
            std::fs::write(self.download_dir.join(&self.file_name), body)?;
        }
        Ok(true)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.set(true);
        Ok(())
    }
}

/// 指向临时目录、超时很短的配置
pub fn test_config(dir: &TempDir) -> Config {
    Config {
        download_dir: dir.path().to_path_buf(),
        start_year: 1948,
        end_year: 2025,
        poll_timeout_secs: 1,
        poll_interval_ms: 10,
        throttle_ms: 0,
        ..Config::default()
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read artifact")
}

/// 一个州、一个县、两个网格
pub fn scenario_tree() -> Tree {
    vec![("R1", vec![("C1", vec!["R1-C1-G1", "R1-C1-G2"])])]
}
