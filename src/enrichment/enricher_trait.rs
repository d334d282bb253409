// ==========================================
// LUCI 线索编排系统 - 补全供应商 Trait
// ==========================================
// 职责: 定义两类供应商能力（批量 / 单条）
// 实现者: HttpBulkEnricher / HttpSingleEnricher（reqwest），测试中为 mock
// 红线: 供应商实现不做持久化，只返回补全数据
// ==========================================

use crate::domain::record::{EnrichedRecord, PhoneCandidate, SocialHandles};
use crate::enrichment::error::ProviderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// BulkTraceInput - 批量反查单条输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTraceInput {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

impl BulkTraceInput {
    pub fn from_record(record: &EnrichedRecord) -> Self {
        let raw = &record.raw;
        Self {
            id: raw.id.clone(),
            first_name: raw.resolved_first_name(),
            last_name: raw.resolved_last_name(),
            company_name: raw.company_name.clone(),
            address: raw.address.clone().unwrap_or_default(),
            city: raw.city.clone().unwrap_or_default(),
            state: raw.state.clone().unwrap_or_default(),
            zip: raw.zip.clone(),
        }
    }
}

// ==========================================
// BulkRequest - 批量反查请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub batch_id: String,
    pub leads: Vec<BulkTraceInput>,
    /// 异步任务完成后的回调地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

// ==========================================
// EnrichmentResult - 单条补全结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentResult {
    /// 对应提交时的记录 id
    #[serde(rename = "id")]
    pub record_id: String,
    pub success: bool,
    /// 供应商侧分配的线索 id（可能缺失）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub phones: Vec<PhoneCandidate>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub socials: SocialHandles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichmentResult {
    pub fn succeeded(record_id: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(record_id: &str, reason: impl Into<String>) -> Self {
        Self {
            record_id: record_id.to_string(),
            success: false,
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: PhoneCandidate) -> Self {
        self.phones.push(phone);
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.emails.push(email.to_string());
        self
    }

    pub fn with_lead_id(mut self, lead_id: &str) -> Self {
        self.lead_id = Some(lead_id.to_string());
        self
    }
}

// ==========================================
// BulkResponse - 批量反查响应
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum BulkResponse {
    /// 同步模式：逐条结果
    Completed(Vec<EnrichmentResult>),
    /// 异步模式：任务已受理，结果经 webhook 回填
    Accepted { job_id: String },
}

// ==========================================
// BulkEnricher Trait
// ==========================================
// 用途: 一次请求提交整批记录
#[async_trait]
pub trait BulkEnricher: Send + Sync {
    /// 提交批量反查
    ///
    /// # 返回
    /// - Ok(Completed): 同步结果，按 id 关联
    /// - Ok(Accepted): 异步任务 id
    /// - Err: 整批失败
    async fn submit(&self, request: BulkRequest) -> ProviderResult<BulkResponse>;
}

// ==========================================
// SingleEnricher Trait
// ==========================================
// 用途: 逐条补全；调用方负责限速
#[async_trait]
pub trait SingleEnricher: Send + Sync {
    async fn enrich(&self, record: &EnrichedRecord) -> ProviderResult<EnrichmentResult>;
}
