//! 基础设施层：持有浏览器资源，只暴露页面操作能力

pub mod chrome_driver;
pub mod js_executor;
pub mod session_driver;

pub use chrome_driver::ChromeDriver;
pub use js_executor::JsExecutor;
pub use session_driver::SessionDriver;
