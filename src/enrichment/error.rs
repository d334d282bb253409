// ==========================================
// LUCI 线索编排系统 - 补全供应商错误类型
// ==========================================
// 约束: 不逃逸出单个批次，统一折算为失败计数
// ==========================================

use thiserror::Error;

/// 补全供应商调用错误
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("补全供应商 HTTP 调用失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("补全供应商调用超时 ({0} ms)")]
    Timeout(u64),

    #[error("补全供应商返回格式错误: {0}")]
    InvalidResponse(String),

    #[error("补全供应商拒绝请求: {0}")]
    Rejected(String),
}

/// Result 类型别名
pub type ProviderResult<T> = Result<T, ProviderError>;
