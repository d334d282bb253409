// ==========================================
// LUCI 线索编排系统 - 应用层
// ==========================================
// 职责: 组装共享状态，暴露 HTTP 路由
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::router;
pub use state::{get_default_db_path, AppState, PipelineComponents};
