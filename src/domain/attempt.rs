// ==========================================
// LUCI 线索编排系统 - 触达记录领域模型
// ==========================================
// 红线: 所有派发必须记录（合规审计 / 退订 / TCPA）
// 红线: AttemptLog 只追加，不修改
// ==========================================

use crate::domain::types::{AttemptStatus, CampaignContext, OutreachChannel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// AttemptInfo - 触达历史摘要
// ==========================================
// 用途: 选择升级话术 / 自动再触达门控
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptInfo {
    /// 本次是第几次（1, 2, 3...）
    #[serde(default = "default_attempt_number")]
    pub attempt_number: u32,
    /// 此前累计次数
    #[serde(default)]
    pub previous_attempts: u32,
    /// 是否已建立联系
    #[serde(default)]
    pub contact_made: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response_at: Option<DateTime<Utc>>,
}

fn default_attempt_number() -> u32 {
    1
}

impl AttemptInfo {
    /// 首次触达
    pub fn first() -> Self {
        Self {
            attempt_number: 1,
            ..Default::default()
        }
    }
}

// ==========================================
// AttemptLog - 触达日志
// ==========================================
// 对齐: attempt_log 表
// 同一次派发的所有行共享 dispatch_id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptLog {
    pub attempt_id: String,
    pub dispatch_id: String,
    pub lead_id: String,
    pub campaign_context: CampaignContext,
    pub attempt_number: u32,
    pub channel: OutreachChannel,
    pub template_used: String,
    pub status: AttemptStatus,
    pub contact_made: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_block_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AttemptLog {
    /// 创建新的触达日志（attempt_id 为 UUID，时间为当前 UTC）
    pub fn new(
        dispatch_id: &str,
        lead_id: &str,
        campaign_context: CampaignContext,
        attempt_number: u32,
        channel: OutreachChannel,
        template_used: &str,
        status: AttemptStatus,
    ) -> Self {
        Self {
            attempt_id: uuid::Uuid::new_v4().to_string(),
            dispatch_id: dispatch_id.to_string(),
            lead_id: lead_id.to_string(),
            campaign_context,
            attempt_number,
            channel,
            template_used: template_used.to_string(),
            status,
            contact_made: false,
            created_at: Utc::now(),
            lead_block_id: None,
            detail: None,
        }
    }

    pub fn with_contact_made(mut self, contact_made: bool) -> Self {
        self.contact_made = contact_made;
        self
    }

    pub fn with_lead_block(mut self, lead_block_id: &str) -> Self {
        self.lead_block_id = Some(lead_block_id.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
