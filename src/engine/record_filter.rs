// ==========================================
// LUCI 线索编排系统 - 候选集过滤
// ==========================================
// 顺序固定: address → missing-phone → industry → region → unenriched
// 红线: 纯函数，同一输入必然得到同一输出（批次可重复推导）
// ==========================================

use crate::domain::record::{EnrichedRecord, RecordFilters};
use crate::domain::types::EnrichmentStatus;
use tracing::debug;

/// 地址完整
pub fn passes_address(record: &EnrichedRecord) -> bool {
    record.raw.has_address()
}

/// 无任何电话
pub fn passes_missing_phone(record: &EnrichedRecord) -> bool {
    !record.has_any_phone()
}

/// 行业代码前缀匹配（空列表不过滤）
pub fn passes_industry(record: &EnrichedRecord, prefixes: &[String]) -> bool {
    if prefixes.is_empty() {
        return true;
    }
    let Some(code) = record.raw.sic_code.as_deref().map(str::trim) else {
        return false;
    };
    prefixes
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .any(|p| code.starts_with(p))
}

/// 地区白名单（大小写不敏感，空列表不过滤）
pub fn passes_region(record: &EnrichedRecord, regions: &[String]) -> bool {
    if regions.is_empty() {
        return true;
    }
    let state = record
        .raw
        .state
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    regions.iter().any(|r| r.trim().to_uppercase() == state)
}

/// 未补全（Pending 视为已在途，不再重复提交）
pub fn passes_unenriched(record: &EnrichedRecord) -> bool {
    matches!(
        record.status,
        EnrichmentStatus::Unenriched | EnrichmentStatus::Failed
    )
}

/// 按固定顺序应用全部过滤条件，保持仓库原始顺序
pub fn apply_filters(records: Vec<EnrichedRecord>, filters: &RecordFilters) -> Vec<EnrichedRecord> {
    let total = records.len();
    let mut out = records;

    if filters.has_address {
        out.retain(passes_address);
    }
    if filters.missing_phone {
        out.retain(passes_missing_phone);
    }
    if !filters.industry_prefixes.is_empty() {
        out.retain(|r| passes_industry(r, &filters.industry_prefixes));
    }
    if !filters.regions.is_empty() {
        out.retain(|r| passes_region(r, &filters.regions));
    }
    if filters.unenriched_only {
        out.retain(passes_unenriched);
    }

    debug!(total, filtered = out.len(), "候选集过滤完成");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::RawRecord;

    fn rec(id: &str, state: Option<&str>, sic: Option<&str>, phone: Option<&str>) -> EnrichedRecord {
        EnrichedRecord::from_raw(RawRecord {
            id: id.to_string(),
            address: Some("1 Main".to_string()),
            city: Some("Austin".to_string()),
            state: state.map(str::to_string),
            sic_code: sic.map(str::to_string),
            phone: phone.map(str::to_string),
            ..Default::default()
        })
    }

    fn ids(records: &[EnrichedRecord]) -> Vec<&str> {
        records.iter().map(|r| r.raw.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filters_keep_everything_in_order() {
        let records = vec![rec("a", None, None, None), rec("b", None, None, None)];
        let out = apply_filters(records, &RecordFilters::default());
        assert_eq!(ids(&out), vec!["a", "b"]);
    }

    #[test]
    fn test_address_filter_requires_state() {
        let records = vec![rec("a", Some("TX"), None, None), rec("b", None, None, None)];
        let filters = RecordFilters {
            has_address: true,
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(records, &filters)), vec!["a"]);
    }

    #[test]
    fn test_industry_prefix_and_region() {
        let records = vec![
            rec("a", Some("tx"), Some("1711"), None),
            rec("b", Some("NY"), Some("1711"), None),
            rec("c", Some("TX"), Some("5812"), None),
            rec("d", Some("TX"), None, None),
        ];
        let filters = RecordFilters {
            industry_prefixes: vec!["17".to_string()],
            regions: vec!["TX".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(records, &filters)), vec!["a"]);
    }

    #[test]
    fn test_missing_phone_and_unenriched() {
        let mut enriched = rec("c", Some("TX"), None, None);
        enriched.lead_id = Some("L".to_string());
        enriched.set_status(EnrichmentStatus::Enriched);
        let mut pending = rec("d", Some("TX"), None, None);
        pending.set_status(EnrichmentStatus::Pending);
        let mut failed = rec("e", Some("TX"), None, None);
        failed.set_status(EnrichmentStatus::Failed);

        let records = vec![
            rec("a", Some("TX"), None, Some("5125550100")),
            rec("b", Some("TX"), None, None),
            enriched,
            pending,
            failed,
        ];
        let filters = RecordFilters {
            missing_phone: true,
            unenriched_only: true,
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(records, &filters)), vec!["b", "e"]);
    }
}
