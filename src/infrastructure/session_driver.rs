//! 会话驱动接口 - 基础设施层
//!
//! 核心流程只通过这个接口操作页面，不直接接触浏览器

use std::time::Duration;

use anyhow::Result;

use crate::models::SelectOption;

/// 会话驱动
///
/// 职责：
/// - 打开页面、选择下拉框、读取选项、点击按钮、等待元素
/// - 不认识 州 / 县 / 网格
/// - 不处理导出流程
#[allow(async_fn_in_trait)]
pub trait SessionDriver {
    /// 导航到指定 URL
    async fn open(&self, url: &str) -> Result<()>;

    /// 按 value 选择下拉框选项，并触发 change 事件
    async fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    /// 读取下拉框中的全部选项（不含 value 为空的占位项）
    async fn read_options(&self, selector: &str) -> Result<Vec<SelectOption>>;

    /// 读取下拉框当前选中的 value，未选中或选中占位项时返回 `None`
    async fn selected_value(&self, selector: &str) -> Result<Option<String>>;

    /// 等待元素出现，超时返回 `false`
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// 点击第一个可见文字包含 `text` 的按钮或链接（忽略大小写），找不到返回 `false`
    async fn click_text(&self, text: &str) -> Result<bool>;

    /// 结束会话并释放资源
    async fn close(&mut self) -> Result<()>;
}
