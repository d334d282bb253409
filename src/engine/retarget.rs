// ==========================================
// LUCI 线索编排系统 - 再触达门控
// ==========================================
// 输入: 单条线索的触达历史（attempt_log）
// 规则:
// - retarget: 至少 1 次前序触达、未建立联系、retarget 次数未达上限、距上次触达超过间隔
// - 首次触达类上下文: 重复触达窗口内已有真实触达则跳过
// 说明: 同一次派发可能跨 sms/dialer 写多行，次数按 dispatch_id 去重
// ==========================================

use crate::config::{PipelineConfig, RetargetPolicy};
use crate::domain::attempt::AttemptLog;
use crate::domain::types::CampaignContext;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    RecentlyContacted,
    NoPriorAttempt,
    ContactMade,
    RetargetLimitReached,
    TooSoon,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::RecentlyContacted => "recently_contacted",
            SkipReason::NoPriorAttempt => "no_prior_attempt",
            SkipReason::ContactMade => "contact_made",
            SkipReason::RetargetLimitReached => "retarget_limit_reached",
            SkipReason::TooSoon => "too_soon",
        }
    }
}

/// 自动再触达判定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RetargetDecision {
    /// 无任何触达记录
    NoHistory,
    /// 已建立联系，不再 retarget
    ContactMade,
    /// 未联系次数未达阈值
    BelowThreshold { attempts: usize, threshold: u32 },
    /// 间隔未到
    #[serde(rename_all = "camelCase")]
    Waiting { eligible_at: DateTime<Utc> },
    /// 应发起第 N 次 retarget
    #[serde(rename_all = "camelCase")]
    Retarget { attempt_number: u32 },
    /// retarget 次数用尽，转入 nurture
    MoveToNurture { retargets: usize },
}

/// 真实触达（排除 failed）
fn outreach(history: &[AttemptLog]) -> impl Iterator<Item = &AttemptLog> {
    history.iter().filter(|l| l.status.counts_as_outreach())
}

/// 按 dispatch_id 去重后的次数
pub fn distinct_dispatches<'a>(logs: impl Iterator<Item = &'a AttemptLog>) -> usize {
    logs.map(|l| l.dispatch_id.as_str()).collect::<HashSet<_>>().len()
}

// ==========================================
// RetargetGate
// ==========================================
#[derive(Debug, Clone)]
pub struct RetargetGate {
    policy: RetargetPolicy,
    dedup_window_days: i64,
}

impl RetargetGate {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            policy: config.retarget.clone(),
            dedup_window_days: config.dedup_window_days,
        }
    }

    pub fn policy(&self) -> &RetargetPolicy {
        &self.policy
    }

    /// 重复触达窗口起点；窗口为 0 时关闭
    ///
    /// 窗口超出时间范围时按最早时刻处理（全部历史都在窗口内）
    pub fn dedup_since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.dedup_window_days <= 0 {
            return None;
        }
        let since = Duration::try_days(self.dedup_window_days)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Some(since)
    }

    /// 最早可再触达时刻；间隔溢出时返回 None（视为永远未到）
    fn eligible_at(&self, last: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let delay = Duration::try_hours(self.policy.delay_hours.max(0))?;
        last.checked_add_signed(delay)
    }

    /// 首次触达类上下文的去重检查
    pub fn check_first_contact(&self, history: &[AttemptLog], now: DateTime<Utc>) -> Result<(), SkipReason> {
        let Some(since) = self.dedup_since(now) else {
            return Ok(());
        };
        if outreach(history).any(|l| l.created_at >= since) {
            return Err(SkipReason::RecentlyContacted);
        }
        Ok(())
    }

    /// retarget 资格检查
    pub fn check_retarget(&self, history: &[AttemptLog], now: DateTime<Utc>) -> Result<(), SkipReason> {
        let Some(last) = outreach(history).map(|l| l.created_at).max() else {
            return Err(SkipReason::NoPriorAttempt);
        };
        if outreach(history).any(|l| l.contact_made) {
            return Err(SkipReason::ContactMade);
        }
        let retargets = distinct_dispatches(
            outreach(history).filter(|l| l.campaign_context == CampaignContext::Retarget),
        );
        if retargets >= self.policy.max_retargets as usize {
            return Err(SkipReason::RetargetLimitReached);
        }
        match self.eligible_at(last) {
            Some(eligible_at) if now >= eligible_at => {}
            _ => return Err(SkipReason::TooSoon),
        }
        Ok(())
    }

    /// 自动再触达判定
    pub fn decide(&self, history: &[AttemptLog], now: DateTime<Utc>) -> RetargetDecision {
        let Some(last) = outreach(history).map(|l| l.created_at).max() else {
            return RetargetDecision::NoHistory;
        };
        if outreach(history).any(|l| l.contact_made) {
            return RetargetDecision::ContactMade;
        }

        let attempts = distinct_dispatches(outreach(history));
        if attempts < self.policy.threshold as usize {
            return RetargetDecision::BelowThreshold {
                attempts,
                threshold: self.policy.threshold,
            };
        }

        let retargets = distinct_dispatches(
            outreach(history).filter(|l| l.campaign_context == CampaignContext::Retarget),
        );
        if retargets >= self.policy.max_retargets as usize {
            return RetargetDecision::MoveToNurture { retargets };
        }

        let eligible_at = self.eligible_at(last).unwrap_or(DateTime::<Utc>::MAX_UTC);
        if now < eligible_at {
            return RetargetDecision::Waiting { eligible_at };
        }

        RetargetDecision::Retarget {
            attempt_number: retargets as u32 + 1,
        }
    }
}
