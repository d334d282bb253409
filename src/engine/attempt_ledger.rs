// ==========================================
// LUCI 线索编排系统 - 触达台账
// ==========================================
// 职责: 追加触达日志；由历史推导 AttemptInfo 与再触达资格
// 红线: 只追加，不修改
// ==========================================

use crate::config::PipelineConfig;
use crate::domain::attempt::{AttemptInfo, AttemptLog};
use crate::domain::types::CampaignContext;
use crate::engine::retarget::{distinct_dispatches, RetargetDecision, RetargetGate, SkipReason};
use crate::repository::{AttemptLogRepository, RepositoryResult};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

pub struct AttemptLedger {
    repo: Arc<AttemptLogRepository>,
    gate: RetargetGate,
}

impl AttemptLedger {
    pub fn new(repo: Arc<AttemptLogRepository>, config: &PipelineConfig) -> Self {
        Self {
            repo,
            gate: RetargetGate::new(config),
        }
    }

    pub fn gate(&self) -> &RetargetGate {
        &self.gate
    }

    /// 追加一批触达日志（单事务）
    pub fn record(&self, logs: &[AttemptLog]) -> RepositoryResult<usize> {
        if logs.is_empty() {
            return Ok(0);
        }
        let written = self.repo.batch_insert(logs)?;
        debug!(written, "触达日志已追加");
        Ok(written)
    }

    /// 某线索的完整触达历史（时间正序）
    pub fn history(&self, lead_id: &str) -> RepositoryResult<Vec<AttemptLog>> {
        self.repo.find_by_lead(lead_id)
    }

    /// 某次派发的全部日志
    pub fn dispatch_logs(&self, dispatch_id: &str) -> RepositoryResult<Vec<AttemptLog>> {
        self.repo.find_by_dispatch(dispatch_id)
    }

    /// 由历史推导 AttemptInfo
    ///
    /// - previous_attempts: 该上下文下真实触达次数（按派发去重）
    /// - attempt_number: previous_attempts + 1
    /// - contact_made / 时间戳: 跨所有上下文
    pub fn attempt_info(&self, lead_id: &str, context: CampaignContext) -> RepositoryResult<AttemptInfo> {
        let history = self.repo.find_by_lead(lead_id)?;
        Ok(info_from_history(&history, context))
    }

    /// 下一次触达序号
    pub fn next_attempt_number(&self, lead_id: &str, context: CampaignContext) -> RepositoryResult<u32> {
        Ok(self.attempt_info(lead_id, context)?.attempt_number)
    }

    /// 重复触达窗口内已有真实触达的线索
    pub fn recently_contacted(&self, lead_ids: &[String], now: DateTime<Utc>) -> RepositoryResult<HashSet<String>> {
        let Some(since) = self.gate.dedup_since(now) else {
            return Ok(HashSet::new());
        };
        Ok(self.repo.recent_outreach_since(lead_ids, since)?.into_iter().collect())
    }

    /// retarget 资格检查
    pub fn check_retarget(&self, lead_id: &str, now: DateTime<Utc>) -> RepositoryResult<Result<(), SkipReason>> {
        let history = self.repo.find_by_lead(lead_id)?;
        Ok(self.gate.check_retarget(&history, now))
    }

    /// 批量读取多个线索的触达历史（一次查询）
    ///
    /// # 返回
    /// - lead_id → 历史（时间正序）；无记录的线索不出现在结果中
    pub fn histories(&self, lead_ids: &[String]) -> RepositoryResult<HashMap<String, Vec<AttemptLog>>> {
        let mut grouped: HashMap<String, Vec<AttemptLog>> = HashMap::new();
        for log in self.repo.find_by_leads(lead_ids)? {
            grouped.entry(log.lead_id.clone()).or_default().push(log);
        }
        Ok(grouped)
    }

    /// 批量 retarget 资格检查
    pub fn check_retarget_batch(
        &self,
        lead_ids: &[String],
        now: DateTime<Utc>,
    ) -> RepositoryResult<HashMap<String, Result<(), SkipReason>>> {
        let histories = self.histories(lead_ids)?;
        Ok(lead_ids
            .iter()
            .map(|id| {
                let history = histories.get(id).map(Vec::as_slice).unwrap_or_default();
                (id.clone(), self.gate.check_retarget(history, now))
            })
            .collect())
    }

    /// 批量推导下一次触达序号
    pub fn next_attempt_numbers(
        &self,
        lead_ids: &[String],
        context: CampaignContext,
    ) -> RepositoryResult<HashMap<String, u32>> {
        let histories = self.histories(lead_ids)?;
        Ok(lead_ids
            .iter()
            .map(|id| {
                let history = histories.get(id).map(Vec::as_slice).unwrap_or_default();
                (id.clone(), info_from_history(history, context).attempt_number)
            })
            .collect())
    }

    /// 是否应自动发起再触达
    pub fn should_auto_retarget(&self, lead_id: &str) -> RepositoryResult<RetargetDecision> {
        self.should_auto_retarget_at(lead_id, Utc::now())
    }

    pub fn should_auto_retarget_at(&self, lead_id: &str, now: DateTime<Utc>) -> RepositoryResult<RetargetDecision> {
        let history = self.repo.find_by_lead(lead_id)?;
        Ok(self.gate.decide(&history, now))
    }
}

fn info_from_history(history: &[AttemptLog], context: CampaignContext) -> AttemptInfo {
    let outreach: Vec<&AttemptLog> = history.iter().filter(|l| l.status.counts_as_outreach()).collect();
    let previous = distinct_dispatches(
        outreach
            .iter()
            .copied()
            .filter(|l| l.campaign_context == context),
    );

    AttemptInfo {
        attempt_number: previous as u32 + 1,
        previous_attempts: previous as u32,
        contact_made: outreach.iter().any(|l| l.contact_made),
        last_attempt_at: outreach.iter().map(|l| l.created_at).max(),
        last_response_at: outreach
            .iter()
            .filter(|l| l.contact_made)
            .map(|l| l.created_at)
            .max(),
    }
}
