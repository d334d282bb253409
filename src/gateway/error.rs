// ==========================================
// LUCI 线索编排系统 - 协作方网关错误类型
// ==========================================
// 覆盖: 记录仓库读写 / 渠道队列转发
// ==========================================

use thiserror::Error;

/// 外部协作方调用错误
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP 调用失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("调用超时 ({0} ms)")]
    Timeout(u64),

    #[error("上游返回错误: {0}")]
    Upstream(String),

    #[error("响应格式错误: {0}")]
    InvalidResponse(String),

    #[error("不支持的渠道: {0}")]
    UnsupportedChannel(String),
}

/// Result 类型别名
pub type GatewayResult<T> = Result<T, GatewayError>;
