// ==========================================
// LUCI 线索编排系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 HTTP 路由调用
// ==========================================

pub mod dto;
pub mod error;
pub mod orchestrate_api;
pub mod validator;

// 重导出核心类型
pub use dto::{
    AttemptHistoryResponse, BulkWebhookPayload, EnrichRequest, EnrichResponse, PushRequest,
    PushResponse, WebhookResponse,
};
pub use error::{ApiError, ApiResult};
pub use orchestrate_api::{OrchestrateAction, OrchestrateApi};
