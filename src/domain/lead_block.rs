// ==========================================
// LUCI 线索编排系统 - 批次与线索块模型
// ==========================================
// Batch: 过滤后候选集的连续切片 [start, end)，只存在于单次调用内
// LeadBlock: 补全与派发之间的交接单元，容量受 block_max 约束
// ==========================================

use crate::domain::record::EnrichedRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// BatchWindow - 单批次切片
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWindow {
    pub batch_number: usize,
    pub start: usize,
    pub end: usize,
    /// 受 block_max 截断后的总批次数
    pub effective_total_batches: usize,
    /// min(过滤后总数, block_max)
    pub capped_total: usize,
}

impl BatchWindow {
    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn is_last(&self) -> bool {
        self.batch_number + 1 >= self.effective_total_batches
    }

    pub fn next_batch(&self) -> Option<usize> {
        if self.is_last() {
            None
        } else {
            Some(self.batch_number + 1)
        }
    }

    /// 累计进度百分比（四舍五入）
    pub fn percent_complete(&self) -> u32 {
        percent(self.end, self.capped_total)
    }
}

/// 百分比计算（四舍五入）
///
/// 分母为 0 视为已完成；未完成时最多报告 99，100 只在 done >= total 时出现
pub fn percent(done: usize, total: usize) -> u32 {
    if done >= total {
        return 100;
    }
    let rounded = ((done as f64 / total as f64) * 100.0).round() as u32;
    rounded.min(99)
}

// ==========================================
// BatchOutcome - 单批次补全结果
// ==========================================
// 红线: enriched + failed == records.len()
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<EnrichedRecord>,
    /// 含 pending（乐观计数）
    pub enriched: usize,
    pub failed: usize,
    /// enriched 中等待 webhook 回填的数量
    pub pending: usize,
}

impl BatchOutcome {
    pub fn is_reconciled(&self) -> bool {
        self.enriched + self.failed == self.records.len()
    }
}

// ==========================================
// LeadBlock - 线索块
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadBlock {
    pub lead_block_id: String,
    pub source_id: String,
    pub records: Vec<EnrichedRecord>,
    pub max_size: usize,
    pub complete: bool,
    pub assembled_at: DateTime<Utc>,
}

impl LeadBlock {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
