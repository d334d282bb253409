// ==========================================
// LUCI 线索编排系统 - 补全供应商适配器
// ==========================================
// 职责: 对单个批次依次执行批量反查与单条补全，合并结果
// 红线: 单条/整批失败只计数，不中断批次
// 红线: 不做持久化，回写由调用方负责
// 红线: 每次外部调用都带超时；超时即失败，本次不重试
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::lead_block::BatchOutcome;
use crate::domain::record::EnrichedRecord;
use crate::domain::types::{EnrichmentStatus, EnrichmentType};
use crate::enrichment::enricher_trait::{
    BulkEnricher, BulkRequest, BulkResponse, BulkTraceInput, SingleEnricher,
};
use crate::enrichment::error::{ProviderError, ProviderResult};
use crate::enrichment::merge::merge_result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 单条记录在本批次内的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// 未被任何供应商处理
    Untouched,
    /// 至少一个供应商尝试过但未成功
    Attempted,
    /// 异步任务已受理
    Pending,
    Enriched,
}

// ==========================================
// ProviderAdapter - 供应商适配器
// ==========================================
pub struct ProviderAdapter {
    bulk: Option<Arc<dyn BulkEnricher>>,
    single: Option<Arc<dyn SingleEnricher>>,
    rate_limit_delay: Duration,
    request_timeout: Duration,
    webhook_url: Option<String>,
}

impl ProviderAdapter {
    /// 创建适配器
    ///
    /// # 参数
    /// - bulk: 批量反查供应商（可选）
    /// - single: 单条补全供应商（可选）
    /// - config: 管线配置（限速间隔 / 超时）
    pub fn new(
        bulk: Option<Arc<dyn BulkEnricher>>,
        single: Option<Arc<dyn SingleEnricher>>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            bulk,
            single,
            rate_limit_delay: config.rate_limit_delay(),
            request_timeout: config.request_timeout(),
            webhook_url: None,
        }
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    async fn with_timeout<T, F>(&self, fut: F) -> ProviderResult<T>
    where
        F: Future<Output = ProviderResult<T>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.request_timeout.as_millis() as u64)),
        }
    }

    /// 补全一个批次
    ///
    /// # 参数
    /// - batch_id: 批次标识（透传给批量供应商）
    /// - records: 批次记录（切片顺序）
    /// - types: 请求的补全类型
    ///
    /// # 返回
    /// - BatchOutcome: 补全后的记录与计数（enriched + failed == records.len()）
    pub async fn enrich_batch(
        &self,
        batch_id: &str,
        mut records: Vec<EnrichedRecord>,
        types: &[EnrichmentType],
    ) -> BatchOutcome {
        let mut slots: Vec<Slot> = records
            .iter()
            .map(|r| if r.is_locked() { Slot::Enriched } else { Slot::Untouched })
            .collect();

        if types.contains(&EnrichmentType::BulkTrace) {
            self.run_bulk(batch_id, &mut records, &mut slots).await;
        }

        if types.contains(&EnrichmentType::SingleEnrich) {
            self.run_single(&mut records, &mut slots).await;
        }

        let mut outcome = BatchOutcome::default();
        for (record, slot) in records.iter_mut().zip(slots.iter()) {
            match slot {
                Slot::Enriched => outcome.enriched += 1,
                Slot::Pending => {
                    outcome.enriched += 1;
                    outcome.pending += 1;
                }
                Slot::Attempted | Slot::Untouched => {
                    if record.status != EnrichmentStatus::Failed {
                        record.set_status(EnrichmentStatus::Failed);
                    }
                    outcome.failed += 1;
                }
            }
        }
        outcome.records = records;

        info!(
            batch_id = %batch_id,
            enriched = outcome.enriched,
            failed = outcome.failed,
            pending = outcome.pending,
            "批次补全完成"
        );
        outcome
    }

    async fn run_bulk(&self, batch_id: &str, records: &mut [EnrichedRecord], slots: &mut [Slot]) {
        let Some(bulk) = self.bulk.as_ref() else {
            warn!(batch_id = %batch_id, "未配置批量反查供应商，跳过 bulk_trace");
            return;
        };

        let traceable: Vec<usize> = (0..records.len())
            .filter(|&i| slots[i] == Slot::Untouched && records[i].is_bulk_traceable())
            .collect();
        if traceable.is_empty() {
            debug!(batch_id = %batch_id, "批次内无可批量反查的记录");
            return;
        }

        let request = BulkRequest {
            batch_id: batch_id.to_string(),
            leads: traceable
                .iter()
                .map(|&i| BulkTraceInput::from_record(&records[i]))
                .collect(),
            webhook_url: self.webhook_url.clone(),
        };

        info!(batch_id = %batch_id, count = traceable.len(), "提交批量反查");

        match self.with_timeout(bulk.submit(request)).await {
            Ok(BulkResponse::Completed(results)) => {
                let by_id: HashMap<&str, _> =
                    results.iter().map(|r| (r.record_id.as_str(), r)).collect();
                for &i in &traceable {
                    let merged = by_id
                        .get(records[i].raw.id.as_str())
                        .map(|result| merge_result(&mut records[i], result))
                        .unwrap_or(false);
                    slots[i] = if merged { Slot::Enriched } else { Slot::Attempted };
                }
            }
            Ok(BulkResponse::Accepted { job_id }) => {
                info!(batch_id = %batch_id, job_id = %job_id, "批量反查任务已受理，等待回调");
                for &i in &traceable {
                    records[i].set_status(EnrichmentStatus::Pending);
                    records[i].pending_job_id = Some(job_id.clone());
                    slots[i] = Slot::Pending;
                }
            }
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "批量反查失败，整批计为失败");
                for &i in &traceable {
                    slots[i] = Slot::Attempted;
                }
            }
        }
    }

    async fn run_single(&self, records: &mut [EnrichedRecord], slots: &mut [Slot]) {
        let Some(single) = self.single.as_ref() else {
            warn!("未配置单条补全供应商，跳过 single_enrich");
            return;
        };

        let mut first_call = true;
        for i in 0..records.len() {
            if slots[i] == Slot::Enriched || !records[i].is_single_enrichable() {
                continue;
            }

            // 调用间隔（限速）
            if !first_call && !self.rate_limit_delay.is_zero() {
                tokio::time::sleep(self.rate_limit_delay).await;
            }
            first_call = false;

            let record_id = records[i].raw.id.clone();
            match self.with_timeout(single.enrich(&records[i])).await {
                Ok(result) if result.success => {
                    if merge_result(&mut records[i], &result) {
                        slots[i] = Slot::Enriched;
                    }
                }
                Ok(result) => {
                    debug!(record_id = %record_id, reason = ?result.error, "单条补全无结果");
                    if slots[i] == Slot::Untouched {
                        slots[i] = Slot::Attempted;
                    }
                }
                Err(e) => {
                    warn!(record_id = %record_id, error = %e, "单条补全失败");
                    if slots[i] == Slot::Untouched {
                        slots[i] = Slot::Attempted;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{PhoneCandidate, RawRecord};
    use crate::domain::types::PhoneType;
    use crate::enrichment::enricher_trait::EnrichmentResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct SyncBulk;

    #[async_trait]
    impl BulkEnricher for SyncBulk {
        async fn submit(&self, request: BulkRequest) -> ProviderResult<BulkResponse> {
            let results = request
                .leads
                .iter()
                .map(|l| {
                    if l.id.ends_with("-miss") {
                        EnrichmentResult::failed(&l.id, "no match")
                    } else {
                        EnrichmentResult::succeeded(&l.id).with_phone(PhoneCandidate {
                            number: format!("555{}", l.id),
                            phone_type: Some(PhoneType::Mobile),
                        })
                    }
                })
                .collect();
            Ok(BulkResponse::Completed(results))
        }
    }

    struct AsyncBulk;

    #[async_trait]
    impl BulkEnricher for AsyncBulk {
        async fn submit(&self, _request: BulkRequest) -> ProviderResult<BulkResponse> {
            Ok(BulkResponse::Accepted {
                job_id: "job-9".to_string(),
            })
        }
    }

    struct FailingBulk;

    #[async_trait]
    impl BulkEnricher for FailingBulk {
        async fn submit(&self, _request: BulkRequest) -> ProviderResult<BulkResponse> {
            Err(ProviderError::Rejected("quota".to_string()))
        }
    }

    struct SlowBulk;

    #[async_trait]
    impl BulkEnricher for SlowBulk {
        async fn submit(&self, _request: BulkRequest) -> ProviderResult<BulkResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(BulkResponse::Completed(Vec::new()))
        }
    }

    /// 记录调用顺序；id 含 "boom" 时报错
    #[derive(Default)]
    struct RecordingSingle {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SingleEnricher for RecordingSingle {
        async fn enrich(&self, record: &EnrichedRecord) -> ProviderResult<EnrichmentResult> {
            self.calls.lock().unwrap().push(record.raw.id.clone());
            if record.raw.id.contains("boom") {
                return Err(ProviderError::InvalidResponse("bad json".to_string()));
            }
            Ok(EnrichmentResult::succeeded(&record.raw.id).with_email("x@y.com"))
        }
    }

    /// 记录每次调用的（tokio）时刻
    #[derive(Default)]
    struct TimedSingle {
        calls: Mutex<Vec<tokio::time::Instant>>,
    }

    #[async_trait]
    impl SingleEnricher for TimedSingle {
        async fn enrich(&self, record: &EnrichedRecord) -> ProviderResult<EnrichmentResult> {
            self.calls.lock().unwrap().push(tokio::time::Instant::now());
            Ok(EnrichmentResult::succeeded(&record.raw.id).with_email("x@y.com"))
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            rate_limit_delay_ms: 0,
            request_timeout_ms: 200,
            ..Default::default()
        }
    }

    fn addressed(id: &str) -> EnrichedRecord {
        EnrichedRecord::from_raw(RawRecord {
            id: id.to_string(),
            address: Some("1 Main St".to_string()),
            city: Some("Austin".to_string()),
            state: Some("TX".to_string()),
            ..Default::default()
        })
    }

    fn emailed(id: &str) -> EnrichedRecord {
        EnrichedRecord::from_raw(RawRecord {
            id: id.to_string(),
            email: Some(format!("{}@corp.com", id)),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_sync_bulk_merges_by_id() {
        let adapter = ProviderAdapter::new(Some(Arc::new(SyncBulk)), None, &config());
        let records = vec![addressed("a"), addressed("b-miss"), emailed("c")];

        let outcome = adapter
            .enrich_batch("batch_0", records, &[EnrichmentType::BulkTrace])
            .await;

        assert!(outcome.is_reconciled());
        assert_eq!(outcome.enriched, 1);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.records[0].mobile_phone.as_deref(), Some("555a"));
        assert!(outcome.records[0].is_locked());
        assert_eq!(outcome.records[1].status, EnrichmentStatus::Failed);
        // 无地址记录不参与批量反查，计为失败
        assert_eq!(outcome.records[2].status, EnrichmentStatus::Failed);
    }

    #[tokio::test]
    async fn test_async_bulk_marks_pending() {
        let adapter = ProviderAdapter::new(Some(Arc::new(AsyncBulk)), None, &config())
            .with_webhook_url("http://localhost/api/webhook/skip-trace");
        let outcome = adapter
            .enrich_batch("batch_0", vec![addressed("a"), addressed("b")], &[EnrichmentType::BulkTrace])
            .await;

        assert_eq!(outcome.enriched, 2);
        assert_eq!(outcome.pending, 2);
        assert_eq!(outcome.failed, 0);
        for rec in &outcome.records {
            assert_eq!(rec.status, EnrichmentStatus::Pending);
            assert!(!rec.is_enriched());
            assert_eq!(rec.pending_job_id.as_deref(), Some("job-9"));
        }
    }

    #[tokio::test]
    async fn test_bulk_failure_counts_whole_batch() {
        let adapter = ProviderAdapter::new(Some(Arc::new(FailingBulk)), None, &config());
        let outcome = adapter
            .enrich_batch("batch_0", vec![addressed("a"), addressed("b")], &[EnrichmentType::BulkTrace])
            .await;
        assert_eq!(outcome.enriched, 0);
        assert_eq!(outcome.failed, 2);
    }

    #[tokio::test]
    async fn test_bulk_timeout_is_failure() {
        let adapter = ProviderAdapter::new(Some(Arc::new(SlowBulk)), None, &config());
        let outcome = adapter
            .enrich_batch("batch_0", vec![addressed("a")], &[EnrichmentType::BulkTrace])
            .await;
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn test_single_error_does_not_abort_batch() {
        let single = Arc::new(RecordingSingle::default());
        let adapter = ProviderAdapter::new(None, Some(single.clone()), &config());
        let records = vec![emailed("a"), emailed("boom"), emailed("c"), addressed("no-email")];

        let outcome = adapter
            .enrich_batch("batch_0", records, &[EnrichmentType::SingleEnrich])
            .await;

        assert_eq!(outcome.enriched, 2);
        assert_eq!(outcome.failed, 2);
        assert_eq!(
            *single.calls.lock().unwrap(),
            vec!["a".to_string(), "boom".to_string(), "c".to_string()]
        );
    }

    #[tokio::test]
    async fn test_single_skips_records_enriched_by_bulk() {
        let single = Arc::new(RecordingSingle::default());
        let adapter = ProviderAdapter::new(Some(Arc::new(SyncBulk)), Some(single.clone()), &config());

        let mut both = addressed("a");
        both.raw.email = Some("a@corp.com".to_string());
        let mut fallback = addressed("b-miss");
        fallback.raw.email = Some("b@corp.com".to_string());

        let outcome = adapter
            .enrich_batch(
                "batch_0",
                vec![both, fallback],
                &[EnrichmentType::BulkTrace, EnrichmentType::SingleEnrich],
            )
            .await;

        assert_eq!(outcome.enriched, 2);
        assert_eq!(*single.calls.lock().unwrap(), vec!["b-miss".to_string()]);
    }

    #[tokio::test]
    async fn test_locked_records_skip_providers() {
        let single = Arc::new(RecordingSingle::default());
        let adapter = ProviderAdapter::new(None, Some(single.clone()), &config());

        let mut locked = emailed("a");
        locked.lead_id = Some("L1".to_string());
        locked.set_status(EnrichmentStatus::Enriched);

        let outcome = adapter
            .enrich_batch("batch_0", vec![locked.clone()], &[EnrichmentType::SingleEnrich])
            .await;
        assert_eq!(outcome.enriched, 1);
        assert_eq!(outcome.records[0], locked);
        assert!(single.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_calls_are_spaced_by_rate_limit() {
        let single = Arc::new(TimedSingle::default());
        let cfg = PipelineConfig {
            rate_limit_delay_ms: 100,
            ..config()
        };
        let adapter = ProviderAdapter::new(None, Some(single.clone()), &cfg);
        let delay = Duration::from_millis(100);

        let started = tokio::time::Instant::now();
        let outcome = adapter
            .enrich_batch(
                "batch_0",
                vec![emailed("a"), emailed("b"), emailed("c")],
                &[EnrichmentType::SingleEnrich],
            )
            .await;

        assert_eq!(outcome.enriched, 3);
        assert!(started.elapsed() >= delay * 2);

        let calls = single.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        // 第一次调用前不等待
        assert!(calls[0] - started < delay);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
    }
}
