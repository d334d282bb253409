// ==========================================
// LUCI 线索编排系统 - 管线配置
// ==========================================
// 职责: 批次大小 / 线索块上限 / 限速 / 超时 / 人工审核 / 再触达策略
// 约束: 全部通过注入传递，引擎内不出现字面常量
// ==========================================

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 250;
/// 默认线索块上限（8 批）
pub const DEFAULT_BLOCK_MAX: usize = 2000;
/// 单条补全调用间隔（毫秒）
pub const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 500;
/// 外部调用超时（毫秒）
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// 重复触达窗口（天）
pub const DEFAULT_DEDUP_WINDOW_DAYS: i64 = 7;
/// 重复触达窗口上限（天）
pub const MAX_DEDUP_WINDOW_DAYS: i64 = 3_650;
/// 再触达间隔上限（小时）
pub const MAX_RETARGET_DELAY_HOURS: i64 = 87_600;

// ==========================================
// RetargetPolicy - 再触达策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetargetPolicy {
    /// 连续 N 次未建立联系后触发自动再触达
    pub threshold: u32,
    /// 再触达上限，超过后转入 nurture
    pub max_retargets: u32,
    /// 两次再触达之间的最小间隔（小时）
    pub delay_hours: i64,
}

impl Default for RetargetPolicy {
    fn default() -> Self {
        Self {
            threshold: 3,
            max_retargets: 5,
            delay_hours: 48,
        }
    }
}

// ==========================================
// PipelineConfig - 管线配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub block_max: usize,
    pub rate_limit_delay_ms: u64,
    pub request_timeout_ms: u64,
    /// retarget 强制 draft
    pub human_in_loop: bool,
    /// 0 表示关闭去重
    pub dedup_window_days: i64,
    pub retarget: RetargetPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            block_max: DEFAULT_BLOCK_MAX,
            rate_limit_delay_ms: DEFAULT_RATE_LIMIT_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            human_in_loop: true,
            dedup_window_days: DEFAULT_DEDUP_WINDOW_DAYS,
            retarget: RetargetPolicy::default(),
        }
    }
}

impl PipelineConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// 线索块最多容纳的批次数 ceil(block_max / batch_size)
    pub fn max_batches_for_block(&self) -> usize {
        self.block_max.div_ceil(self.batch_size.max(1))
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size 必须大于 0".to_string());
        }
        if self.block_max == 0 {
            return Err("block_max 必须大于 0".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms 必须大于 0".to_string());
        }
        if !(0..=MAX_DEDUP_WINDOW_DAYS).contains(&self.dedup_window_days) {
            return Err(format!(
                "dedup_window_days 必须在 0..={} 之间",
                MAX_DEDUP_WINDOW_DAYS
            ));
        }
        if !(0..=MAX_RETARGET_DELAY_HOURS).contains(&self.retarget.delay_hours) {
            return Err(format!(
                "retarget.delay_hours 必须在 0..={} 之间",
                MAX_RETARGET_DELAY_HOURS
            ));
        }
        Ok(())
    }
}

// ==========================================
// ServiceEndpoints - 外部协作方地址
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoints {
    /// 记录仓库（GET /api/buckets/{id}, PATCH /api/buckets/{id}/records/{rid}）
    pub record_store_url: String,
    /// 批量反查
    pub bulk_enrich_url: String,
    /// 单条补全
    pub single_enrich_url: String,
    /// 短信队列入口
    pub sms_queue_url: String,
    /// 外呼队列入口
    pub dialer_queue_url: String,
    /// 异步批量任务完成回调
    pub webhook_url: String,
}

impl ServiceEndpoints {
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            record_store_url: format!("{}/api/buckets", base),
            bulk_enrich_url: format!("{}/api/enrichment/bulk-skip-trace", base),
            single_enrich_url: format!("{}/api/enrichment/apollo", base),
            sms_queue_url: format!("{}/api/luci/push-to-sms", base),
            dialer_queue_url: format!("{}/api/luci/push-to-dialer", base),
            webhook_url: format!("{}/api/webhook/skip-trace", base),
        }
    }
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self::with_base("http://localhost:3000")
    }
}
