// ==========================================
// Mock 协作方实现 - 用于集成测试
// ==========================================
// 覆盖: 记录仓库 / 批量反查 / 单条补全 / 渠道队列
// ==========================================

use async_trait::async_trait;
use luci_orchestrator::domain::record::{EnrichedRecord, PhoneCandidate};
use luci_orchestrator::domain::types::{OutreachChannel, PhoneType};
use luci_orchestrator::enrichment::{
    BulkEnricher, BulkRequest, BulkResponse, EnrichmentResult, ProviderError, ProviderResult,
    SingleEnricher,
};
use luci_orchestrator::gateway::{
    ChannelGateway, ChannelPushRequest, ChannelReceipt, GatewayError, GatewayResult, RecordStore,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ==========================================
// MockRecordStore - 内存记录仓库
// ==========================================

#[derive(Default)]
pub struct MockRecordStore {
    sources: Mutex<HashMap<String, Vec<EnrichedRecord>>>,
    fail_fetch: AtomicBool,
    fail_save_ids: Mutex<HashSet<String>>,
    pub fetch_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, source_id: &str, records: Vec<EnrichedRecord>) {
        self.sources
            .lock()
            .unwrap()
            .insert(source_id.to_string(), records);
    }

    pub fn records(&self, source_id: &str) -> Vec<EnrichedRecord> {
        self.sources
            .lock()
            .unwrap()
            .get(source_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, source_id: &str, record_id: &str) -> Option<EnrichedRecord> {
        self.records(source_id).into_iter().find(|r| r.raw.id == record_id)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save_for(&self, record_id: &str) {
        self.fail_save_ids.lock().unwrap().insert(record_id.to_string());
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn fetch_records(&self, source_id: &str) -> GatewayResult<Vec<EnrichedRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(GatewayError::Upstream(format!("bucket {} unavailable", source_id)));
        }
        Ok(self.records(source_id))
    }

    async fn save_enrichment(&self, source_id: &str, record: &EnrichedRecord) -> GatewayResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_save_ids.lock().unwrap().contains(&record.raw.id) {
            return Err(GatewayError::Upstream("write rejected".to_string()));
        }
        let mut sources = self.sources.lock().unwrap();
        let records = sources.entry(source_id.to_string()).or_default();
        match records.iter_mut().find(|r| r.raw.id == record.raw.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }
}

// ==========================================
// MockBulkEnricher - 批量反查
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMode {
    /// 同步返回，每条记录一个 mobile 号码
    Sync,
    /// 异步受理，返回 job id
    Async,
    /// 整批失败
    Failing,
}

pub struct MockBulkEnricher {
    mode: BulkMode,
    /// 同步模式下返回失败结果的记录 id
    misses: HashSet<String>,
    pub requests: Mutex<Vec<BulkRequest>>,
}

impl MockBulkEnricher {
    pub fn new(mode: BulkMode) -> Self {
        Self {
            mode,
            misses: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_misses(mut self, ids: &[&str]) -> Self {
        self.misses = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn submitted_count(&self) -> usize {
        self.requests.lock().unwrap().iter().map(|r| r.leads.len()).sum()
    }
}

pub const ASYNC_JOB_ID: &str = "job_mock_1";

/// 为记录 id 生成确定的 mobile 号码结果
pub fn mobile_result(record_id: &str) -> EnrichmentResult {
    EnrichmentResult::succeeded(record_id)
        .with_phone(PhoneCandidate {
            number: format!("+1555{}", record_id),
            phone_type: Some(PhoneType::Mobile),
        })
        .with_lead_id(&format!("lead_{}", record_id))
}

#[async_trait]
impl BulkEnricher for MockBulkEnricher {
    async fn submit(&self, request: BulkRequest) -> ProviderResult<BulkResponse> {
        let ids: Vec<String> = request.leads.iter().map(|l| l.id.clone()).collect();
        self.requests.lock().unwrap().push(request);
        match self.mode {
            BulkMode::Sync => Ok(BulkResponse::Completed(
                ids.iter()
                    .map(|id| {
                        if self.misses.contains(id) {
                            EnrichmentResult::failed(id, "no match")
                        } else {
                            mobile_result(id)
                        }
                    })
                    .collect(),
            )),
            BulkMode::Async => Ok(BulkResponse::Accepted {
                job_id: ASYNC_JOB_ID.to_string(),
            }),
            BulkMode::Failing => Err(ProviderError::Rejected("vendor down".to_string())),
        }
    }
}

// ==========================================
// MockSingleEnricher - 单条补全
// ==========================================

#[derive(Default)]
pub struct MockSingleEnricher {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl SingleEnricher for MockSingleEnricher {
    async fn enrich(&self, record: &EnrichedRecord) -> ProviderResult<EnrichmentResult> {
        self.calls.lock().unwrap().push(record.raw.id.clone());
        Ok(EnrichmentResult::succeeded(&record.raw.id).with_email("owner@example.com"))
    }
}

// ==========================================
// MockChannelGateway - 渠道队列
// ==========================================

#[derive(Default)]
pub struct MockChannelGateway {
    failing: Mutex<HashSet<OutreachChannel>>,
    zero_queued: Mutex<HashSet<OutreachChannel>>,
    pub requests: Mutex<Vec<(OutreachChannel, ChannelPushRequest)>>,
}

impl MockChannelGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_channel(&self, channel: OutreachChannel) {
        self.failing.lock().unwrap().insert(channel);
    }

    /// 渠道受理请求但回执入队数为 0
    pub fn report_zero_queued(&self, channel: OutreachChannel) {
        self.zero_queued.lock().unwrap().insert(channel);
    }

    pub fn requests_for(&self, channel: OutreachChannel) -> Vec<ChannelPushRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelGateway for MockChannelGateway {
    async fn forward(
        &self,
        channel: OutreachChannel,
        request: ChannelPushRequest,
    ) -> GatewayResult<ChannelReceipt> {
        let count = request.leads.len();
        self.requests.lock().unwrap().push((channel, request));
        if self.failing.lock().unwrap().contains(&channel) {
            return Err(GatewayError::Upstream(format!("{} queue unavailable", channel)));
        }
        if self.zero_queued.lock().unwrap().contains(&channel) {
            return Ok(ChannelReceipt { queued: Some(0) });
        }
        Ok(ChannelReceipt { queued: Some(count) })
    }
}
