// ==========================================
// LUCI 线索编排系统 - 记录领域模型
// ==========================================
// 职责: 原始记录 / 补全记录 / 过滤条件
// 对齐: 记录仓库接口 (camelCase JSON)
// ==========================================

use crate::domain::types::{EnrichmentStatus, PhoneType};
use serde::{Deserialize, Serialize};

// ==========================================
// RawRecord - 原始上传记录
// ==========================================
// 红线: 本系统只读，id 在整个管线内稳定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// 行业代码（SIC 类，前缀匹配）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sic_code: Option<String>,
}

fn non_blank(v: &Option<String>) -> bool {
    v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

impl RawRecord {
    /// 地址完整（address + city + state）
    pub fn has_address(&self) -> bool {
        non_blank(&self.address) && non_blank(&self.city) && non_blank(&self.state)
    }

    /// 名（first_name 优先，否则取 contact_name 第一个词）
    pub fn resolved_first_name(&self) -> String {
        if non_blank(&self.first_name) {
            return self.first_name.clone().unwrap_or_default();
        }
        self.contact_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .unwrap_or("")
            .to_string()
    }

    /// 姓（last_name 优先，否则取 contact_name 其余部分）
    pub fn resolved_last_name(&self) -> String {
        if non_blank(&self.last_name) {
            return self.last_name.clone().unwrap_or_default();
        }
        self.contact_name
            .as_deref()
            .map(|n| n.split_whitespace().skip(1).collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }
}

// ==========================================
// PhoneCandidate - 候选电话
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneCandidate {
    pub number: String,
    /// None 表示供应商未标注类型（仅可用于 dialer）
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub phone_type: Option<PhoneType>,
}

impl PhoneCandidate {
    pub fn is_mobile(&self) -> bool {
        self.phone_type == Some(PhoneType::Mobile)
    }
}

// ==========================================
// SocialHandles - 社交账号
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialHandles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
}

impl SocialHandles {
    pub fn is_empty(&self) -> bool {
        self.linkedin.is_none()
            && self.facebook.is_none()
            && self.twitter.is_none()
            && self.instagram.is_none()
    }
}

// ==========================================
// EnrichedRecord - 补全后的记录
// ==========================================
// 红线: 仅由 Provider Adapter 的合并步骤修改
// 红线: status=Enriched 且 lead_id 已赋值后，本次运行内不可再变
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub raw: RawRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(default, rename = "enrichedPhones")]
    pub phones: Vec<PhoneCandidate>,
    #[serde(default, rename = "enrichedEmails")]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "SocialHandles::is_empty")]
    pub socials: SocialHandles,
    /// 合并规则选出的首选电话（mobile 优先，否则第一个）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub enriched: bool,
    #[serde(default, rename = "enrichmentStatus")]
    pub status: EnrichmentStatus,
    /// 异步批量任务 ID（仅 Pending 状态有值）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_job_id: Option<String>,
}

impl EnrichedRecord {
    pub fn from_raw(raw: RawRecord) -> Self {
        Self {
            raw,
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.raw.id
    }

    /// 归一化仓库返回的记录
    ///
    /// 旧数据只有 `enriched: bool`，没有 enrichmentStatus 时按布尔值推断
    pub fn normalize(mut self) -> Self {
        if self.status == EnrichmentStatus::Unenriched && self.enriched {
            self.status = EnrichmentStatus::Enriched;
        }
        self.enriched = self.status == EnrichmentStatus::Enriched;
        self
    }

    /// 已完成补全（Pending 不算）
    pub fn is_enriched(&self) -> bool {
        self.status == EnrichmentStatus::Enriched
    }

    /// 本次运行内已锁定（不可再被合并覆盖）
    pub fn is_locked(&self) -> bool {
        self.is_enriched() && self.lead_id.is_some()
    }

    pub fn set_status(&mut self, status: EnrichmentStatus) {
        self.status = status;
        self.enriched = status == EnrichmentStatus::Enriched;
        if status != EnrichmentStatus::Pending {
            self.pending_job_id = None;
        }
    }

    /// 是否带有被标注为 mobile 的电话
    pub fn has_mobile_phone(&self) -> bool {
        self.phones.iter().any(PhoneCandidate::is_mobile)
    }

    /// 是否有任意电话（补全结果或原始字段）
    pub fn has_any_phone(&self) -> bool {
        !self.phones.is_empty()
            || non_blank(&self.mobile_phone)
            || non_blank(&self.raw.phone)
    }

    /// 可批量反查：需完整地址
    pub fn is_bulk_traceable(&self) -> bool {
        self.raw.has_address()
    }

    /// 可单条补全：有 email，或联系人 + 公司
    pub fn is_single_enrichable(&self) -> bool {
        non_blank(&self.raw.email)
            || (non_blank(&self.raw.contact_name) && non_blank(&self.raw.company_name))
    }
}

// ==========================================
// RecordFilters - 候选集过滤条件
// ==========================================
// 执行顺序固定: address → missing-phone → industry → region → unenriched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilters {
    #[serde(default)]
    pub has_address: bool,
    #[serde(default)]
    pub missing_phone: bool,
    /// 行业代码前缀
    #[serde(default, alias = "sicCodes")]
    pub industry_prefixes: Vec<String>,
    /// 地区白名单（州代码，大小写不敏感）
    #[serde(default, alias = "states")]
    pub regions: Vec<String>,
    #[serde(default)]
    pub unenriched_only: bool,
}
