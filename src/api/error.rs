// ==========================================
// LUCI 线索编排系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把仓储/网关/派发错误转换为对外错误
// 约定: 校验类 -> 400；上游/内部 -> 500；错误体统一为 {error}
// ==========================================

use crate::engine::push_dispatcher::DispatchError;
use crate::gateway::GatewayError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误 (400)
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 上游错误 (500)
    // ==========================================
    #[error("记录仓库读取失败: {0}")]
    UpstreamFetchError(String),

    // ==========================================
    // 数据访问错误 (500)
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误 (500)
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::ValidationError(_) | ApiError::InvalidInput(_) => 400,
            _ => 500,
        }
    }

    /// 机器可读的错误码（用于日志）
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::UpstreamFetchError(_) => "UPSTREAM_FETCH_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "UNKNOWN_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::InvalidInput(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::UniqueConstraintViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 GatewayError 转换
// ==========================================
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::UpstreamFetchError(err.to_string())
    }
}

// ==========================================
// 从 DispatchError 转换
// ==========================================
impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Validation(msg) => ApiError::ValidationError(msg),
            DispatchError::Upstream(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::ValidationError("x".into()).status_code(), 400);
        assert_eq!(ApiError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(ApiError::UpstreamFetchError("x".into()).status_code(), 500);
        assert_eq!(ApiError::DatabaseError("x".into()).status_code(), 500);
        assert_eq!(ApiError::InternalError("x".into()).status_code(), 500);
    }

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        match api_err {
            ApiError::DatabaseError(msg) => assert!(msg.contains("poisoned")),
            other => panic!("Expected DatabaseError, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_error_conversion() {
        let api_err: ApiError = DispatchError::Validation("leadBlockId 缺失".to_string()).into();
        assert_eq!(api_err.status_code(), 400);

        let api_err: ApiError = DispatchError::Upstream(GatewayError::Timeout(100)).into();
        assert_eq!(api_err.status_code(), 500);
        assert_eq!(api_err.error_code(), "UPSTREAM_FETCH_ERROR");
    }
}
