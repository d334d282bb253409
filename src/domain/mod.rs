// ==========================================
// LUCI 线索编排系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod attempt;
pub mod lead_block;
pub mod record;
pub mod types;

// 重导出核心类型
pub use attempt::{AttemptInfo, AttemptLog};
pub use lead_block::{BatchOutcome, BatchWindow, LeadBlock};
pub use record::{EnrichedRecord, PhoneCandidate, RawRecord, RecordFilters, SocialHandles};
pub use types::{
    AttemptStatus, CampaignContext, Destination, EnrichmentStatus, EnrichmentType,
    OutreachChannel, PhoneType, PushMode,
};
