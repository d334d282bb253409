// ==========================================
// LUCI 线索编排系统 - 核心库
// ==========================================
// 技术栈: Rust + axum + SQLite
// 系统定位: 批量补全 → 线索块 → 外呼派发 的编排层
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 触达台账
pub mod repository;

// 补全层 - 供应商适配
pub mod enrichment;

// 网关层 - 记录仓库 / 渠道队列
pub mod gateway;

// 引擎层 - 批次 / 线索块 / 话术 / 派发
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 服务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AttemptStatus, CampaignContext, Destination, EnrichmentStatus, EnrichmentType,
    OutreachChannel, PushMode,
};

// 领域实体
pub use domain::{AttemptInfo, AttemptLog, EnrichedRecord, LeadBlock, RawRecord, RecordFilters};

// 引擎
pub use engine::{
    AttemptLedger, BatchController, LeadBlockAssembler, PushDispatcher, TemplateSelector,
};

// API
pub use api::{ApiError, OrchestrateApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "LUCI 线索编排系统";
