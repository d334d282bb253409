// ==========================================
// LUCI 线索编排系统 - 线索块组装器
// ==========================================
// 红线: 线索块记录数不超过 block_max
// 说明: leadBlockId = lb_{sourceId}_{unixMillis}，只是交接令牌，唯一性尽力而为
// ==========================================

use crate::domain::lead_block::LeadBlock;
use crate::domain::record::EnrichedRecord;
use chrono::{DateTime, Utc};

pub struct LeadBlockAssembler {
    block_max: usize,
}

impl LeadBlockAssembler {
    pub fn new(block_max: usize) -> Self {
        Self { block_max }
    }

    pub fn block_max(&self) -> usize {
        self.block_max
    }

    /// 线索块 id 前缀
    pub fn block_prefix(source_id: &str) -> String {
        format!("lb_{}_", source_id)
    }

    pub fn is_block_full(&self, block: &LeadBlock) -> bool {
        block.len() >= block.max_size
    }

    /// 生成线索块 id（当前时间）
    pub fn finalize(&self, source_id: &str) -> String {
        self.finalize_at(source_id, Utc::now())
    }

    /// 生成线索块 id（指定完成时间）
    pub fn finalize_at(&self, source_id: &str, completed_at: DateTime<Utc>) -> String {
        format!("{}{}", Self::block_prefix(source_id), completed_at.timestamp_millis())
    }

    /// 校验 leadBlockId 归属于该来源
    pub fn validate_block_id(&self, source_id: &str, lead_block_id: &str) -> Result<(), String> {
        let prefix = Self::block_prefix(source_id);
        match lead_block_id.strip_prefix(&prefix) {
            Some(suffix) if !suffix.is_empty() => Ok(()),
            _ => Err(format!(
                "leadBlockId {} 不属于来源 {}",
                lead_block_id, source_id
            )),
        }
    }

    /// 从来源记录重新推导线索块
    ///
    /// 只收录 Enriched 且已分配 lead_id 的记录，按仓库顺序截断到 block_max
    pub fn assemble(
        &self,
        source_id: &str,
        lead_block_id: &str,
        records: Vec<EnrichedRecord>,
    ) -> LeadBlock {
        let records: Vec<EnrichedRecord> = records
            .into_iter()
            .filter(|r| r.is_enriched() && r.lead_id.is_some())
            .take(self.block_max)
            .collect();

        LeadBlock {
            lead_block_id: lead_block_id.to_string(),
            source_id: source_id.to_string(),
            records,
            max_size: self.block_max,
            complete: true,
            assembled_at: Utc::now(),
        }
    }
}
