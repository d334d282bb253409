// ==========================================
// LUCI 线索编排系统 - 配置层
// ==========================================
// 职责: 管线参数与外部协作方地址，支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod pipeline_config;

// 重导出核心配置类型
pub use config_manager::{config_keys, ConfigManager};
pub use pipeline_config::{PipelineConfig, RetargetPolicy, ServiceEndpoints};
