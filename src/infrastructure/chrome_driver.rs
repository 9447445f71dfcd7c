//! 基于 Chromium 调试协议的会话驱动
//!
//! 所有页面操作都通过 [`JsExecutor`] 在页面内执行

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::browser::BrowserHandle;
use crate::infrastructure::{JsExecutor, SessionDriver};
use crate::models::SelectOption;
use crate::utils::PollPolicy;

const SELECT_JS: &str = r#"
    const el = document.querySelector(sel);
    if (!el) return "missing";
    el.value = value;
    if (el.value !== value) return "no-option";
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return "ok";
"#;

const READ_OPTIONS_JS: &str = r#"
    const el = document.querySelector(sel);
    if (!el) return null;
    return Array.from(el.options)
        .map(o => ({ label: (o.textContent || "").trim(), value: (o.value || "").trim() }))
        .filter(o => o.value.length > 0);
"#;

const SELECTED_JS: &str = r#"
    const el = document.querySelector(sel);
    if (!el) return null;
    const value = (el.value || "").trim();
    return value.length > 0 ? value : null;
"#;

const EXISTS_JS: &str = r#"return document.querySelector(sel) !== null;"#;

const CLICK_TEXT_JS: &str = r#"
    const needle = text.trim().toLowerCase();
    const target = Array.from(document.querySelectorAll("a, button"))
        .find(b => (b.textContent || "").trim().toLowerCase().includes(needle));
    if (!target) return false;
    target.click();
    return true;
"#;

/// Chromium 会话驱动
///
/// 持有浏览器和唯一的页面；`close()` 之后不可再使用。
pub struct ChromeDriver {
    handle: Option<BrowserHandle>,
    executor: JsExecutor,
}

impl ChromeDriver {
    pub fn new(handle: BrowserHandle) -> Self {
        let executor = JsExecutor::new(handle.page.clone());
        Self {
            handle: Some(handle),
            executor,
        }
    }
}

impl SessionDriver for ChromeDriver {
    async fn open(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.executor
            .page()
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<()> {
        let status: String = self
            .executor
            .call("sel, value", SELECT_JS, &[selector, value])
            .await?;
        match status.as_str() {
            "ok" => Ok(()),
            "missing" => anyhow::bail!("找不到控件: {}", selector),
            _ => anyhow::bail!("控件 {} 中没有选项 '{}'", selector, value),
        }
    }

    async fn read_options(&self, selector: &str) -> Result<Vec<SelectOption>> {
        let options: Option<Vec<SelectOption>> = self
            .executor
            .call("sel", READ_OPTIONS_JS, &[selector])
            .await?;
        options.with_context(|| format!("找不到控件: {}", selector))
    }

    async fn selected_value(&self, selector: &str) -> Result<Option<String>> {
        self.executor.call("sel", SELECTED_JS, &[selector]).await
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let policy = PollPolicy::new(timeout, Duration::from_millis(200));
        let found = policy
            .poll(move |_| async move {
                let exists: bool = self.executor.call("sel", EXISTS_JS, &[selector]).await?;
                Ok(exists.then_some(()))
            })
            .await?;
        Ok(found.is_some())
    }

    async fn click_text(&self, text: &str) -> Result<bool> {
        self.executor.call("text", CLICK_TEXT_JS, &[text]).await
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        if handle.owned {
            if let Err(e) = handle.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            let _ = handle.browser.wait().await;
        } else if let Err(e) = handle.page.clone().close().await {
            warn!("关闭页面失败: {}", e);
        }
        handle.handler_task.abort();
        debug!("浏览器会话已释放");
        Ok(())
    }
}
