pub mod export_flow;
pub mod session_ctx;

pub use export_flow::ExportFlow;
pub use session_ctx::SessionContext;
