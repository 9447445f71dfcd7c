//! 会话上下文
//!
//! 封装"页面上当前选中的是哪个 州 / 县 / 网格"这一信息

use std::fmt::Display;

use crate::models::SelectOption;

/// 页面当前已确认选中的路径
///
/// 每次导出开始时都会 `reset()`，随后逐级重新选择并记录，
/// 不依赖上一个网格留下的页面状态。
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub region: Option<SelectOption>,
    pub sub_region: Option<SelectOption>,
    pub grid: Option<SelectOption>,
}

impl SessionContext {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn assert_region(&mut self, option: &SelectOption) {
        self.region = Some(option.clone());
        self.sub_region = None;
        self.grid = None;
    }

    pub fn assert_sub_region(&mut self, option: &SelectOption) {
        self.sub_region = Some(option.clone());
        self.grid = None;
    }

    pub fn assert_grid(&mut self, option: &SelectOption) {
        self.grid = Some(option.clone());
    }

    /// 三级都已选中
    pub fn is_complete(&self) -> bool {
        self.region.is_some() && self.sub_region.is_some() && self.grid.is_some()
    }
}

impl Display for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = |o: &Option<SelectOption>| o.as_ref().map_or("-".to_string(), |o| o.value.clone());
        write!(
            f,
            "[州#{} 县#{} 网格#{}]",
            value(&self.region),
            value(&self.sub_region),
            value(&self.grid)
        )
    }
}
