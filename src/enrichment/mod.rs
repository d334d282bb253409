// ==========================================
// LUCI 线索编排系统 - 补全层 (Provider Adapter)
// ==========================================
// 职责: 屏蔽补全供应商差异（批量同步/异步、单条限速）
// 红线: 供应商失败只计数，不中断批次
// ==========================================

pub mod enricher_trait;
pub mod error;
pub mod http_provider;
pub mod merge;
pub mod provider_adapter;
pub mod wire;

pub use enricher_trait::{
    BulkEnricher, BulkRequest, BulkResponse, BulkTraceInput, EnrichmentResult, SingleEnricher,
};
pub use error::{ProviderError, ProviderResult};
pub use http_provider::{HttpBulkEnricher, HttpSingleEnricher};
pub use merge::{apply_bulk_results, merge_result, preferred_phone, BulkResolution};
pub use provider_adapter::ProviderAdapter;
pub use wire::VendorResult;
