// ==========================================
// LUCI 线索编排系统 - 领域类型定义
// ==========================================
// 职责: 管线中所有封闭枚举（上下文 / 渠道 / 模式 / 状态）
// 约束: 字符串 <-> 枚举 的转换集中在此，引擎层只用 match
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 外呼上下文 (Campaign Context)
// ==========================================
// 红线: retarget 必须有前序 AttemptInfo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignContext {
    Initial,            // 首次触达
    Retarget,           // 未建立联系，再次触达
    FollowUp,           // 已建立联系，跟进
    BookAppointment,    // 约见
    ConfirmAppointment, // 确认约见
    Nurture,            // 长期培育
    Ghost,              // 曾互动后失联
    Scheduled,          // 预约发送
    Instant,            // 即时发送
}

impl CampaignContext {
    pub const ALL: [CampaignContext; 9] = [
        CampaignContext::Initial,
        CampaignContext::Retarget,
        CampaignContext::FollowUp,
        CampaignContext::BookAppointment,
        CampaignContext::ConfirmAppointment,
        CampaignContext::Nurture,
        CampaignContext::Ghost,
        CampaignContext::Scheduled,
        CampaignContext::Instant,
    ];

    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignContext::Initial => "initial",
            CampaignContext::Retarget => "retarget",
            CampaignContext::FollowUp => "follow_up",
            CampaignContext::BookAppointment => "book_appointment",
            CampaignContext::ConfirmAppointment => "confirm_appointment",
            CampaignContext::Nurture => "nurture",
            CampaignContext::Ghost => "ghost",
            CampaignContext::Scheduled => "scheduled",
            CampaignContext::Instant => "instant",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// 是否为首次触达类上下文（受重复触达窗口约束）
    pub fn is_first_contact(&self) -> bool {
        matches!(
            self,
            CampaignContext::Initial | CampaignContext::Instant | CampaignContext::Scheduled
        )
    }
}

impl Default for CampaignContext {
    fn default() -> Self {
        CampaignContext::Initial
    }
}

impl fmt::Display for CampaignContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 派发目标 (Destination)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Sms,
    Dialer,
    Both,
}

impl Destination {
    /// 展开为具体渠道（Both -> [Sms, Dialer]）
    pub fn channels(&self) -> Vec<OutreachChannel> {
        match self {
            Destination::Sms => vec![OutreachChannel::Sms],
            Destination::Dialer => vec![OutreachChannel::Dialer],
            Destination::Both => vec![OutreachChannel::Sms, OutreachChannel::Dialer],
        }
    }

    pub fn includes(&self, channel: OutreachChannel) -> bool {
        self.channels().contains(&channel)
    }
}

// ==========================================
// 派发模式 (Push Mode)
// ==========================================
// Draft: 进入人工审核队列; Immediate: 直接进入发送队列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushMode {
    Draft,
    Immediate,
}

impl Default for PushMode {
    fn default() -> Self {
        PushMode::Draft
    }
}

impl fmt::Display for PushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushMode::Draft => write!(f, "draft"),
            PushMode::Immediate => write!(f, "immediate"),
        }
    }
}

// ==========================================
// 补全类型 (Enrichment Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentType {
    #[serde(alias = "skip_trace")]
    BulkTrace, // 批量反查（一次请求整批）
    #[serde(alias = "apollo")]
    SingleEnrich, // 单条补全（需外部限速）
}

// ==========================================
// 电话类型 (Phone Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneType {
    Mobile,
    Landline,
    Voip,
}

impl PhoneType {
    /// 解析供应商返回的类型标记；"cell" 视同 mobile，未知标记返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "mobile" | "cell" | "wireless" => Some(PhoneType::Mobile),
            "landline" | "fixed" => Some(PhoneType::Landline),
            "voip" => Some(PhoneType::Voip),
            _ => None,
        }
    }
}

// ==========================================
// 补全状态 (Enrichment Status)
// ==========================================
// Pending: 异步批量任务已提交，等待 webhook 回填
// 红线: Pending 不得被当作 Enriched 推送
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Unenriched,
    Pending,
    Enriched,
    Failed,
}

impl Default for EnrichmentStatus {
    fn default() -> Self {
        EnrichmentStatus::Unenriched
    }
}

// ==========================================
// 外呼渠道 (Outreach Channel)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachChannel {
    Sms,
    Dialer,
    Email,
}

impl OutreachChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutreachChannel::Sms => "sms",
            OutreachChannel::Dialer => "dialer",
            OutreachChannel::Email => "email",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sms" => Some(OutreachChannel::Sms),
            "dialer" => Some(OutreachChannel::Dialer),
            "email" => Some(OutreachChannel::Email),
            _ => None,
        }
    }
}

impl fmt::Display for OutreachChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 触达状态 (Attempt Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Queued => "queued",
            AttemptStatus::Sent => "sent",
            AttemptStatus::Delivered => "delivered",
            AttemptStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(AttemptStatus::Queued),
            "sent" => Some(AttemptStatus::Sent),
            "delivered" => Some(AttemptStatus::Delivered),
            "failed" => Some(AttemptStatus::Failed),
            _ => None,
        }
    }

    /// 是否算作一次真实触达（失败的派发不计入去重窗口）
    pub fn counts_as_outreach(&self) -> bool {
        !matches!(self, AttemptStatus::Failed)
    }
}
