// ==========================================
// LUCI 线索编排系统 - 供应商 JSON 契约
// ==========================================
// 职责: 供应商/回调报文 -> EnrichmentResult
// 说明: 同步响应与 webhook 回调共用同一结果格式
// ==========================================

use crate::domain::record::{PhoneCandidate, SocialHandles};
use crate::domain::types::PhoneType;
use crate::enrichment::enricher_trait::EnrichmentResult;
use serde::{Deserialize, Serialize};

/// 供应商电话条目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPhone {
    pub number: String,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub phone_type: Option<String>,
}

impl VendorPhone {
    /// isMobile 优先，其次解析 type 标记
    pub fn into_candidate(self) -> PhoneCandidate {
        let phone_type = if self.is_mobile {
            Some(PhoneType::Mobile)
        } else {
            self.phone_type.as_deref().and_then(PhoneType::parse)
        };
        PhoneCandidate {
            number: self.number,
            phone_type,
        }
    }
}

/// 供应商邮箱条目（裸字符串或 {email}）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VendorEmail {
    Plain(String),
    Entry { email: String },
}

impl VendorEmail {
    pub fn into_address(self) -> String {
        match self {
            VendorEmail::Plain(e) => e,
            VendorEmail::Entry { email } => email,
        }
    }
}

/// 供应商单条结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorResult {
    pub id: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub phones: Vec<VendorPhone>,
    #[serde(default)]
    pub emails: Vec<VendorEmail>,
    #[serde(default)]
    pub socials: SocialHandles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VendorResult {
    pub fn into_result(self) -> EnrichmentResult {
        EnrichmentResult {
            record_id: self.id,
            success: self.success,
            lead_id: self.lead_id.filter(|l| !l.trim().is_empty()),
            phones: self
                .phones
                .into_iter()
                .filter(|p| !p.number.trim().is_empty())
                .map(VendorPhone::into_candidate)
                .collect(),
            emails: self
                .emails
                .into_iter()
                .map(VendorEmail::into_address)
                .filter(|e| !e.trim().is_empty())
                .collect(),
            socials: self.socials,
            error: self.error,
        }
    }
}
