// ==========================================
// LUCI 线索编排系统 - HTTP 补全供应商
// ==========================================
// 职责: 通过 JSON 契约调用批量反查 / 单条补全服务
// 说明: 只依赖请求/响应契约，不涉及具体供应商语义
// ==========================================

use crate::domain::record::{EnrichedRecord, SocialHandles};
use crate::enrichment::enricher_trait::{
    BulkEnricher, BulkRequest, BulkResponse, EnrichmentResult, SingleEnricher,
};
use crate::enrichment::error::{ProviderError, ProviderResult};
use crate::enrichment::wire::{VendorEmail, VendorPhone, VendorResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 批量反查响应
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkTraceResponse {
    #[serde(default)]
    success: bool,
    /// "sync" | "async"
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    results: Option<Vec<VendorResult>>,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// 单条补全请求
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleEnrichRequest<'a> {
    record_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    first_name: String,
    last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_name: Option<&'a str>,
}

/// 单条补全响应
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SingleEnrichResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    enriched_data: Option<EnrichedData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrichedData {
    #[serde(default)]
    lead_id: Option<String>,
    #[serde(default)]
    phones: Vec<VendorPhone>,
    #[serde(default)]
    emails: Vec<VendorEmail>,
    #[serde(default)]
    socials: SocialHandles,
}

// ==========================================
// HttpBulkEnricher - 批量反查
// ==========================================
#[derive(Debug, Clone)]
pub struct HttpBulkEnricher {
    client: Client,
    url: String,
}

impl HttpBulkEnricher {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl BulkEnricher for HttpBulkEnricher {
    async fn submit(&self, request: BulkRequest) -> ProviderResult<BulkResponse> {
        debug!(url = %self.url, leads = request.leads.len(), "POST 批量反查");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: BulkTraceResponse = response.json().await?;

        if !body.success {
            return Err(ProviderError::Rejected(
                body.error.unwrap_or_else(|| "未知错误".to_string()),
            ));
        }

        match (body.mode.as_deref(), body.results, body.job_id) {
            (Some("sync"), Some(results), _) | (None, Some(results), None) => Ok(
                BulkResponse::Completed(results.into_iter().map(VendorResult::into_result).collect()),
            ),
            (_, _, Some(job_id)) => Ok(BulkResponse::Accepted { job_id }),
            _ => Err(ProviderError::InvalidResponse(
                "响应既无同步结果也无任务 id".to_string(),
            )),
        }
    }
}

// ==========================================
// HttpSingleEnricher - 单条补全
// ==========================================
#[derive(Debug, Clone)]
pub struct HttpSingleEnricher {
    client: Client,
    url: String,
}

impl HttpSingleEnricher {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SingleEnricher for HttpSingleEnricher {
    async fn enrich(&self, record: &EnrichedRecord) -> ProviderResult<EnrichmentResult> {
        let raw = &record.raw;
        let request = SingleEnrichRequest {
            record_id: &raw.id,
            email: raw.email.as_deref(),
            first_name: raw.resolved_first_name(),
            last_name: raw.resolved_last_name(),
            company_name: raw.company_name.as_deref(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: SingleEnrichResponse = response.json().await?;

        match (body.success, body.enriched_data) {
            (true, Some(data)) => Ok(VendorResult {
                id: raw.id.clone(),
                success: true,
                lead_id: data.lead_id,
                phones: data.phones,
                emails: data.emails,
                socials: data.socials,
                error: None,
            }
            .into_result()),
            (_, _) => Ok(EnrichmentResult::failed(
                &raw.id,
                body.error.unwrap_or_else(|| "无补全数据".to_string()),
            )),
        }
    }
}
