// ==========================================
// LUCI 线索编排系统 - 外呼渠道网关
// ==========================================
// 职责: 将一次派发（整批线索 + 话术 + 上下文）转发给渠道队列
// 说明: 逐条发送由渠道侧负责，本系统只做入队
// ==========================================

use crate::domain::attempt::AttemptInfo;
use crate::domain::record::{EnrichedRecord, PhoneCandidate};
use crate::domain::types::{CampaignContext, OutreachChannel, PushMode};
use crate::gateway::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

// ==========================================
// ChannelLead - 入队线索
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelLead {
    pub id: String,
    pub lead_id: String,
    /// 称呼（名，缺失时为 "there"）
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub enriched_phones: Vec<PhoneCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

impl ChannelLead {
    pub fn from_record(record: &EnrichedRecord) -> Self {
        let raw = &record.raw;
        let first = raw.resolved_first_name();
        Self {
            id: raw.id.clone(),
            lead_id: record.lead_id.clone().unwrap_or_else(|| raw.id.clone()),
            name: if first.is_empty() { "there".to_string() } else { first },
            contact_name: raw.contact_name.clone(),
            company_name: raw.company_name.clone(),
            phone: raw.phone.clone(),
            mobile_phone: record.mobile_phone.clone(),
            enriched_phones: record.phones.clone(),
            email: raw.email.clone(),
            address: raw.address.clone(),
            city: raw.city.clone(),
            state: raw.state.clone(),
            industry: raw.sic_code.clone(),
        }
    }
}

// ==========================================
// ChannelPushRequest - 渠道入队请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPushRequest {
    pub campaign_name: String,
    pub campaign_context: CampaignContext,
    pub mode: PushMode,
    pub lead_block_id: String,
    pub leads: Vec<ChannelLead>,
    /// 已解析话术（sms 必填，dialer 为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_info: Option<AttemptInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// 渠道回执
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelReceipt {
    /// 渠道实际入队数量（未报告时由调用方按转发数计）
    #[serde(default)]
    pub queued: Option<usize>,
}

// ==========================================
// ChannelGateway Trait
// ==========================================
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    async fn forward(
        &self,
        channel: OutreachChannel,
        request: ChannelPushRequest,
    ) -> GatewayResult<ChannelReceipt>;
}

/// 渠道响应（兼容 {error} 形式的失败）
#[derive(Debug, Deserialize)]
struct ChannelResponse {
    #[serde(default)]
    queued: Option<usize>,
    #[serde(default)]
    error: Option<String>,
}

// ==========================================
// HttpChannelGateway
// ==========================================
#[derive(Debug, Clone)]
pub struct HttpChannelGateway {
    client: Client,
    sms_url: String,
    dialer_url: String,
}

impl HttpChannelGateway {
    pub fn new(client: Client, sms_url: impl Into<String>, dialer_url: impl Into<String>) -> Self {
        Self {
            client,
            sms_url: sms_url.into(),
            dialer_url: dialer_url.into(),
        }
    }
}

#[async_trait]
impl ChannelGateway for HttpChannelGateway {
    async fn forward(
        &self,
        channel: OutreachChannel,
        request: ChannelPushRequest,
    ) -> GatewayResult<ChannelReceipt> {
        let url = match channel {
            OutreachChannel::Sms => &self.sms_url,
            OutreachChannel::Dialer => &self.dialer_url,
            OutreachChannel::Email => {
                return Err(GatewayError::UnsupportedChannel(channel.to_string()))
            }
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChannelResponse = response.json().await?;
        if let Some(err) = body.error {
            return Err(GatewayError::Upstream(err));
        }

        Ok(ChannelReceipt {
            queued: body.queued,
        })
    }
}
