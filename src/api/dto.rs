// ==========================================
// LUCI 线索编排系统 - API 请求/响应结构
// ==========================================
// 对齐: /api/luci/orchestrate JSON 契约 (camelCase)
// 兼容: bucketId / pushTo / templateMessage 等旧字段名
// ==========================================

use crate::domain::attempt::{AttemptInfo, AttemptLog};
use crate::domain::record::{EnrichedRecord, RecordFilters};
use crate::domain::types::{CampaignContext, Destination, PushMode};
use crate::engine::batch_controller::BatchResult;
use crate::engine::push_dispatcher::PushResult;
use crate::engine::retarget::RetargetDecision;
use crate::enrichment::{BulkResolution, VendorResult};
use serde::{Deserialize, Serialize};

// ==========================================
// 请求
// ==========================================

/// enrich 请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichRequest {
    #[serde(default, alias = "bucketId")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub batch_number: Option<i64>,
    /// 原样接收，未知类型由校验器忽略
    #[serde(default)]
    pub enrichment_types: Option<Vec<String>>,
    #[serde(default)]
    pub filters: RecordFilters,
}

/// push 请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    #[serde(default, alias = "bucketId")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub lead_block_id: Option<String>,
    #[serde(default, alias = "pushTo")]
    pub destination: Option<Destination>,
    #[serde(default)]
    pub mode: Option<PushMode>,
    #[serde(default)]
    pub template_category: Option<String>,
    #[serde(default, alias = "templateMessage")]
    pub template_override: Option<String>,
    #[serde(default)]
    pub campaign_context: Option<CampaignContext>,
    #[serde(default)]
    pub attempt_info: Option<AttemptInfo>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
}

/// 批量反查 webhook 回调
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkWebhookPayload {
    #[serde(default, alias = "bucketId")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub results: Vec<VendorResult>,
}

// ==========================================
// enrich 响应
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInfo {
    pub number: usize,
    pub size: usize,
    pub enriched: usize,
    pub failed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub current_batch: usize,
    pub total_batches: usize,
    pub records_processed: usize,
    pub total_records: usize,
    pub percent_complete: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichResponse {
    pub success: bool,
    pub complete: bool,
    pub batch: BatchInfo,
    pub progress: ProgressInfo,
    pub enriched_leads: Vec<EnrichedRecord>,
    pub next_batch: Option<usize>,
    pub lead_block_id: Option<String>,
}

impl From<BatchResult> for EnrichResponse {
    fn from(r: BatchResult) -> Self {
        Self {
            success: true,
            complete: r.complete,
            batch: BatchInfo {
                number: r.batch_number,
                size: r.size,
                enriched: r.enriched,
                failed: r.failed,
                pending: r.pending,
            },
            progress: ProgressInfo {
                current_batch: r.current_batch,
                total_batches: r.total_batches,
                records_processed: r.records_processed,
                total_records: r.total_records,
                percent_complete: r.percent_complete,
            },
            enriched_leads: r.enriched_leads,
            next_batch: r.next_batch,
            lead_block_id: r.lead_block_id,
        }
    }
}

// ==========================================
// push 响应
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushInfo {
    pub destination: Option<Destination>,
    pub mode: PushMode,
    pub campaign_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushCounts {
    pub sms_queued: usize,
    pub dialer_queued: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSummary {
    pub total_enriched: usize,
    pub sms_queued: usize,
    pub dialer_queued: usize,
    pub skipped: usize,
    pub attempts_logged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatedLead {
    pub lead_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    pub lead_block_id: String,
    pub dispatch_id: String,
    pub push: PushInfo,
    pub results: PushCounts,
    pub summary: PushSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gated: Vec<GatedLead>,
    pub next_steps: Vec<String>,
}

impl PushResponse {
    pub fn from_result(lead_block_id: &str, agent: Option<String>, r: PushResult) -> Self {
        Self {
            success: true,
            lead_block_id: lead_block_id.to_string(),
            dispatch_id: r.dispatch_id,
            push: PushInfo {
                destination: r.destination,
                mode: r.mode,
                campaign_name: r.campaign_name,
                agent,
            },
            results: PushCounts {
                sms_queued: r.sms_queued,
                dialer_queued: r.dialer_queued,
                skipped: r.skipped,
            },
            summary: PushSummary {
                total_enriched: r.total_enriched,
                sms_queued: r.sms_queued,
                dialer_queued: r.dialer_queued,
                skipped: r.skipped,
                attempts_logged: r.attempts_logged,
            },
            gated: r
                .gated
                .into_iter()
                .map(|(lead_id, reason)| GatedLead { lead_id, reason })
                .collect(),
            next_steps: r.next_steps,
        }
    }
}

// ==========================================
// webhook / 触达历史 响应
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    pub source_id: String,
    #[serde(flatten)]
    pub resolution: BulkResolution,
    pub saved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptHistoryResponse {
    pub lead_id: String,
    pub attempts: Vec<AttemptLog>,
    pub retarget: RetargetDecision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enrich_request_accepts_legacy_fields() {
        let req: EnrichRequest = serde_json::from_value(json!({
            "bucketId": "b1",
            "batchNumber": 2,
            "enrichmentTypes": ["skip_trace", "apollo"],
            "filters": { "sicCodes": ["17"], "states": ["tx"], "unenrichedOnly": true }
        }))
        .unwrap();
        assert_eq!(req.source_id.as_deref(), Some("b1"));
        assert_eq!(req.batch_number, Some(2));
        assert_eq!(req.filters.industry_prefixes, vec!["17".to_string()]);
        assert_eq!(req.filters.regions, vec!["tx".to_string()]);
        assert!(req.filters.unenriched_only);
    }

    #[test]
    fn test_push_request_accepts_legacy_fields() {
        let req: PushRequest = serde_json::from_value(json!({
            "sourceId": "b1",
            "leadBlockId": "lb_b1_1",
            "pushTo": "both",
            "templateMessage": "Hi",
            "campaignContext": "retarget",
            "attemptInfo": { "attemptNumber": 2, "previousAttempts": 1, "contactMade": false }
        }))
        .unwrap();
        assert_eq!(req.destination, Some(Destination::Both));
        assert_eq!(req.template_override.as_deref(), Some("Hi"));
        assert_eq!(req.campaign_context, Some(CampaignContext::Retarget));
        assert_eq!(req.attempt_info.map(|a| a.attempt_number), Some(2));
    }

    #[test]
    fn test_enrich_response_shape() {
        let resp = EnrichResponse::from(BatchResult {
            batch_number: 1,
            size: 3,
            enriched: 2,
            failed: 1,
            current_batch: 2,
            total_batches: 3,
            records_processed: 6,
            total_records: 8,
            percent_complete: 75,
            next_batch: Some(2),
            ..Default::default()
        });
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["batch"]["number"], 1);
        assert_eq!(v["progress"]["percentComplete"], 75);
        assert_eq!(v["nextBatch"], 2);
        assert!(v["leadBlockId"].is_null());
    }
}
