//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"在页面里执行一段函数"的能力

use anyhow::{Context, Result};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 把 Rust 参数安全地序列化进脚本
/// - 不认识 州 / 县 / 网格
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 表达式并返回 JSON 结果
    ///
    /// 始终按表达式求值
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self
            .page
            .evaluate_expression(EvaluateParams::new(js_code.into()))
            .await?;
        Ok(result.into_value()?)
    }

    /// 以 `args` 为实参调用一个匿名函数，并把返回值反序列化为 `T`
    ///
    /// `params` 是形参列表（如 `"sel, value"`），实参经 JSON 编码后拼接，
    /// 不会被当作脚本解释。
    pub async fn call<T: DeserializeOwned>(
        &self,
        params: &str,
        body: &str,
        args: &[&str],
    ) -> Result<T> {
        let encoded = args
            .iter()
            .map(|a| serde_json::to_string(a))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");
        let js_code = format!("(function({}) {{ {} }})({})", params, body, encoded);

        let value = self.eval(js_code).await?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("脚本返回值无法解析: {}", value))
    }
}
