// ==========================================
// LUCI 线索编排系统 - 请求校验器
// ==========================================
// 职责: 在任何外部调用之前拒绝非法输入 (ValidationError -> 400)
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::EnrichmentType;
use tracing::warn;

/// 必填字符串（去除首尾空白后非空）
///
/// # 参数
/// - value: 请求中的原始值
/// - field: 字段名（写入错误消息）
pub fn require_non_empty(value: Option<&str>, field: &str) -> ApiResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::ValidationError(format!("{} is required", field))),
    }
}

/// 批次号（缺省 0，不允许负数）
pub fn validate_batch_number(batch_number: Option<i64>) -> ApiResult<usize> {
    match batch_number {
        None => Ok(0),
        Some(n) if n >= 0 => Ok(n as usize),
        Some(n) => Err(ApiError::ValidationError(format!(
            "batchNumber 必须 >= 0，实际为 {}",
            n
        ))),
    }
}

/// 解析补全类型
///
/// 缺省为 [bulk_trace]；未知类型忽略并告警；去重后为空则拒绝
pub fn parse_enrichment_types(raw: Option<&[String]>) -> ApiResult<Vec<EnrichmentType>> {
    let Some(raw) = raw else {
        return Ok(vec![EnrichmentType::BulkTrace]);
    };

    let mut types = Vec::new();
    for name in raw {
        match serde_json::from_value::<EnrichmentType>(serde_json::Value::String(name.clone())) {
            Ok(t) if !types.contains(&t) => types.push(t),
            Ok(_) => {}
            Err(_) => warn!(enrichment_type = %name, "忽略不支持的补全类型"),
        }
    }

    if types.is_empty() {
        return Err(ApiError::ValidationError(
            "enrichmentTypes 中没有受支持的类型 (bulk_trace | single_enrich)".to_string(),
        ));
    }
    Ok(types)
}
