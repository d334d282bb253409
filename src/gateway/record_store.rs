// ==========================================
// LUCI 线索编排系统 - 记录仓库网关
// ==========================================
// 职责: 读取某来源的全部记录；回写补全字段
// 对齐: GET {base}/{sourceId}, PATCH {base}/{sourceId}/records/{recordId}
// ==========================================

use crate::domain::record::{EnrichedRecord, PhoneCandidate, SocialHandles};
use crate::domain::types::EnrichmentStatus;
use crate::gateway::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

// ==========================================
// RecordStore Trait
// ==========================================
// 实现者: HttpRecordStore（reqwest），测试中为内存实现
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 读取来源下的全部记录（仓库顺序）
    async fn fetch_records(&self, source_id: &str) -> GatewayResult<Vec<EnrichedRecord>>;

    /// 回写单条记录的补全字段（last-write-wins）
    async fn save_enrichment(&self, source_id: &str, record: &EnrichedRecord) -> GatewayResult<()>;
}

/// 仓库读取响应（旧接口用 properties 字段）
#[derive(Debug, Deserialize)]
struct BucketResponse {
    #[serde(default)]
    records: Option<Vec<EnrichedRecord>>,
    #[serde(default)]
    properties: Option<Vec<EnrichedRecord>>,
    #[serde(default)]
    error: Option<String>,
}

/// 补全字段回写报文
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<&'a str>,
    pub enriched_phones: &'a [PhoneCandidate],
    pub enriched_emails: &'a [String],
    #[serde(skip_serializing_if = "SocialHandles::is_empty")]
    pub socials: &'a SocialHandles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<&'a str>,
    pub enriched: bool,
    pub enrichment_status: EnrichmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_job_id: Option<&'a str>,
}

impl<'a> EnrichmentPatch<'a> {
    pub fn from_record(record: &'a EnrichedRecord) -> Self {
        Self {
            lead_id: record.lead_id.as_deref(),
            enriched_phones: &record.phones,
            enriched_emails: &record.emails,
            socials: &record.socials,
            mobile_phone: record.mobile_phone.as_deref(),
            enriched: record.is_enriched(),
            enrichment_status: record.status,
            pending_job_id: record.pending_job_id.as_deref(),
        }
    }
}

// ==========================================
// HttpRecordStore
// ==========================================
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
}

impl HttpRecordStore {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn fetch_records(&self, source_id: &str) -> GatewayResult<Vec<EnrichedRecord>> {
        let url = format!("{}/{}", self.base_url, source_id);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        let body: BucketResponse = response.json().await?;

        if let Some(err) = body.error {
            return Err(GatewayError::Upstream(err));
        }
        if !status.is_success() {
            return Err(GatewayError::Upstream(format!("HTTP {}", status)));
        }

        let records = body
            .records
            .or(body.properties)
            .ok_or_else(|| GatewayError::InvalidResponse("缺少 records 字段".to_string()))?;

        Ok(records.into_iter().map(EnrichedRecord::normalize).collect())
    }

    async fn save_enrichment(&self, source_id: &str, record: &EnrichedRecord) -> GatewayResult<()> {
        let url = format!("{}/{}/records/{}", self.base_url, source_id, record.raw.id);
        self.client
            .patch(&url)
            .json(&EnrichmentPatch::from_record(record))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::RawRecord;

    #[test]
    fn test_patch_reflects_status() {
        let mut rec = EnrichedRecord::from_raw(RawRecord {
            id: "r1".to_string(),
            ..Default::default()
        });
        rec.set_status(EnrichmentStatus::Pending);
        rec.pending_job_id = Some("job-1".to_string());

        let json = serde_json::to_value(EnrichmentPatch::from_record(&rec)).unwrap();
        assert_eq!(json["enriched"], false);
        assert_eq!(json["enrichmentStatus"], "pending");
        assert_eq!(json["pendingJobId"], "job-1");
        assert!(json.get("leadId").is_none());
    }
}
