// ==========================================
// LUCI 线索编排系统 - 批次控制器
// ==========================================
// 职责: 过滤候选集 → 切片 → 调用供应商适配器 → 回写 → 汇报进度
// 红线: 每次调用无状态，按 batch_number 重新推导切片
// 红线: 批次切片不越过 block_max
// 红线: 单条补全失败只计数；仅记录仓库读取失败会使整个调用失败
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::lead_block::{percent, BatchWindow};
use crate::domain::record::{EnrichedRecord, RecordFilters};
use crate::domain::types::{EnrichmentStatus, EnrichmentType};
use crate::engine::lead_block_assembler::LeadBlockAssembler;
use crate::engine::record_filter::apply_filters;
use crate::enrichment::ProviderAdapter;
use crate::gateway::{GatewayError, GatewayResult, RecordStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

// ==========================================
// BatchResult - 单次调用结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub complete: bool,
    pub batch_number: usize,
    pub size: usize,
    pub enriched: usize,
    pub failed: usize,
    pub pending: usize,
    /// 从 1 开始的当前批次序号
    pub current_batch: usize,
    pub total_batches: usize,
    pub records_processed: usize,
    pub total_records: usize,
    pub percent_complete: u32,
    /// 本批次中已分配 lead_id 的记录
    pub enriched_leads: Vec<EnrichedRecord>,
    pub next_batch: Option<usize>,
    pub lead_block_id: Option<String>,
}

/// 计算批次切片
///
/// # 返回
/// - (window, effective_total_batches, capped_total)
/// - window 为 None 表示 batch_number 已越过有效批次数（终止态）
pub fn plan_window(
    filtered_count: usize,
    batch_number: usize,
    config: &PipelineConfig,
) -> (Option<BatchWindow>, usize, usize) {
    let batch_size = config.batch_size.max(1);
    let total_batches = filtered_count.div_ceil(batch_size);
    let effective_total = total_batches.min(config.max_batches_for_block());
    let capped_total = filtered_count.min(config.block_max);

    if batch_number >= effective_total {
        return (None, effective_total, capped_total);
    }

    let start = batch_number * batch_size;
    let end = (start + batch_size).min(filtered_count).min(config.block_max);

    let window = BatchWindow {
        batch_number,
        start,
        end,
        effective_total_batches: effective_total,
        capped_total,
    };
    (Some(window), effective_total, capped_total)
}

// ==========================================
// BatchController - 批次控制器
// ==========================================
pub struct BatchController {
    store: Arc<dyn RecordStore>,
    adapter: Arc<ProviderAdapter>,
    assembler: LeadBlockAssembler,
    config: PipelineConfig,
}

impl BatchController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        adapter: Arc<ProviderAdapter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            adapter,
            assembler: LeadBlockAssembler::new(config.block_max),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn fetch_records(&self, source_id: &str) -> GatewayResult<Vec<EnrichedRecord>> {
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, self.store.fetch_records(source_id)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.config.request_timeout_ms)),
        }
    }

    async fn save_record(&self, source_id: &str, record: &EnrichedRecord) -> GatewayResult<()> {
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, self.store.save_enrichment(source_id, record)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.config.request_timeout_ms)),
        }
    }

    /// 处理一个批次
    ///
    /// # 参数
    /// - source_id: 记录来源
    /// - batch_number: 批次号（从 0 开始）
    /// - types: 补全类型
    /// - filters: 候选集过滤条件
    ///
    /// # 返回
    /// - Ok(BatchResult): 本批次计数与累计进度；越界时为终止态
    /// - Err(GatewayError): 记录仓库读取失败
    #[instrument(skip(self, types, filters), fields(source_id = %source_id, batch_number = batch_number))]
    pub async fn process_batch(
        &self,
        source_id: &str,
        batch_number: usize,
        types: &[EnrichmentType],
        filters: &RecordFilters,
    ) -> GatewayResult<BatchResult> {
        // === 步骤 1: 读取全部候选记录 ===
        let records = self.fetch_records(source_id).await.map_err(|e| {
            error!(error = %e, "记录仓库读取失败");
            e
        })?;

        // === 步骤 2: 过滤 + 切片 ===
        let filtered = apply_filters(records, filters);
        let (window, effective_total, capped_total) =
            plan_window(filtered.len(), batch_number, &self.config);

        let Some(window) = window else {
            let lead_block_id = self.assembler.finalize(source_id);
            info!(lead_block_id = %lead_block_id, total = capped_total, "线索块已完成");
            return Ok(BatchResult {
                complete: true,
                batch_number,
                current_batch: effective_total,
                total_batches: effective_total,
                records_processed: capped_total,
                total_records: capped_total,
                percent_complete: percent(capped_total, capped_total),
                lead_block_id: Some(lead_block_id),
                ..Default::default()
            });
        };

        info!(
            start = window.start,
            end = window.end,
            total_batches = effective_total,
            "开始处理批次 {}/{}",
            batch_number + 1,
            effective_total
        );

        let originals: Vec<EnrichedRecord> = filtered[window.start..window.end].to_vec();

        // === 步骤 3: 补全 ===
        let batch_id = format!("batch_{}_{}", batch_number, Utc::now().timestamp_millis());
        let mut outcome = self
            .adapter
            .enrich_batch(&batch_id, originals.clone(), types)
            .await;

        // === 步骤 4: 回写变化的记录 ===
        for (original, record) in originals.iter().zip(outcome.records.iter_mut()) {
            if original == record {
                continue;
            }
            if let Err(e) = self.save_record(source_id, record).await {
                warn!(record_id = %record.raw.id, error = %e, "补全结果回写失败");
                match record.status {
                    EnrichmentStatus::Enriched => {
                        outcome.enriched -= 1;
                        outcome.failed += 1;
                    }
                    EnrichmentStatus::Pending => {
                        outcome.enriched -= 1;
                        outcome.pending -= 1;
                        outcome.failed += 1;
                    }
                    _ => {}
                }
                record.set_status(EnrichmentStatus::Failed);
            }
        }

        debug_assert!(outcome.is_reconciled());

        let enriched_leads: Vec<EnrichedRecord> = outcome
            .records
            .iter()
            .filter(|r| r.is_enriched() && r.lead_id.is_some())
            .cloned()
            .collect();

        let lead_block_id = if window.is_last() {
            Some(self.assembler.finalize(source_id))
        } else {
            None
        };

        info!(
            enriched = outcome.enriched,
            failed = outcome.failed,
            pending = outcome.pending,
            "批次 {} 完成",
            batch_number + 1
        );

        Ok(BatchResult {
            complete: window.is_last(),
            batch_number,
            size: window.size(),
            enriched: outcome.enriched,
            failed: outcome.failed,
            pending: outcome.pending,
            current_batch: batch_number + 1,
            total_batches: effective_total,
            records_processed: window.end,
            total_records: capped_total,
            percent_complete: window.percent_complete(),
            enriched_leads,
            next_batch: window.next_batch(),
            lead_block_id,
        })
    }
}
