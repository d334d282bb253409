// ==========================================
// LUCI 线索编排系统 - 外部协作方网关
// ==========================================
// 职责: 记录仓库 / 渠道队列的接口与 HTTP 实现
// 红线: 只依赖 JSON 契约
// ==========================================

pub mod channel;
pub mod error;
pub mod record_store;

pub use channel::{ChannelGateway, ChannelLead, ChannelPushRequest, ChannelReceipt, HttpChannelGateway};
pub use error::{GatewayError, GatewayResult};
pub use record_store::{EnrichmentPatch, HttpRecordStore, RecordStore};
