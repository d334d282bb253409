// ==========================================
// LUCI 线索编排系统 - 补全结果合并规则
// ==========================================
// 规则: 首选电话 = 第一个 mobile 标记的号码，否则第一个候选
// 红线: 已锁定记录（enriched + lead_id）不再被覆盖
// ==========================================

use crate::domain::record::{EnrichedRecord, PhoneCandidate, SocialHandles};
use crate::domain::types::EnrichmentStatus;
use crate::enrichment::enricher_trait::EnrichmentResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 选出首选电话
pub fn preferred_phone(phones: &[PhoneCandidate]) -> Option<String> {
    phones
        .iter()
        .find(|p| p.is_mobile())
        .or_else(|| phones.first())
        .map(|p| p.number.clone())
}

/// 生成本地线索 id（供应商未返回时使用）
pub fn new_lead_id() -> String {
    format!("lead_{}", uuid::Uuid::new_v4().simple())
}

fn fill_socials(target: &mut SocialHandles, source: &SocialHandles) {
    if target.linkedin.is_none() {
        target.linkedin = source.linkedin.clone();
    }
    if target.facebook.is_none() {
        target.facebook = source.facebook.clone();
    }
    if target.twitter.is_none() {
        target.twitter = source.twitter.clone();
    }
    if target.instagram.is_none() {
        target.instagram = source.instagram.clone();
    }
}

/// 将一条成功结果合并进记录
///
/// # 返回
/// - true: 已合并并标记为 Enriched
/// - false: 结果失败或记录已锁定，记录未改动
pub fn merge_result(record: &mut EnrichedRecord, result: &EnrichmentResult) -> bool {
    if record.is_locked() || !result.success {
        return false;
    }

    for phone in &result.phones {
        if !record.phones.iter().any(|p| p.number == phone.number) {
            record.phones.push(phone.clone());
        }
    }
    for email in &result.emails {
        if !record.emails.iter().any(|e| e.eq_ignore_ascii_case(email)) {
            record.emails.push(email.clone());
        }
    }
    fill_socials(&mut record.socials, &result.socials);

    if let Some(phone) = preferred_phone(&record.phones) {
        record.mobile_phone = Some(phone);
    }

    if record.lead_id.is_none() {
        record.lead_id = Some(result.lead_id.clone().unwrap_or_else(new_lead_id));
    }

    record.set_status(EnrichmentStatus::Enriched);
    true
}

// ==========================================
// BulkResolution - 异步批量任务回填统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResolution {
    pub resolved: usize,
    pub failed: usize,
    pub ignored: usize,
    /// 被修改的记录下标（用于回写）
    #[serde(skip)]
    pub changed: Vec<usize>,
}

/// 回填异步批量任务结果
///
/// 只处理当前为 Pending 的记录；job_id 双方都存在时必须一致。
/// 未知 id 或非 Pending 记录的结果计入 ignored。
pub fn apply_bulk_results(
    records: &mut [EnrichedRecord],
    job_id: Option<&str>,
    results: &[EnrichmentResult],
) -> BulkResolution {
    let index: HashMap<String, usize> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.raw.id.clone(), i))
        .collect();

    let mut resolution = BulkResolution::default();

    for result in results {
        let Some(&idx) = index.get(result.record_id.as_str()) else {
            resolution.ignored += 1;
            continue;
        };
        let record = &mut records[idx];

        let job_matches = match (job_id, record.pending_job_id.as_deref()) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => true,
        };
        if record.status != EnrichmentStatus::Pending || !job_matches {
            resolution.ignored += 1;
            continue;
        }

        if merge_result(record, result) {
            resolution.resolved += 1;
        } else {
            record.set_status(EnrichmentStatus::Failed);
            resolution.failed += 1;
        }
        resolution.changed.push(idx);
    }

    resolution
}
