// ==========================================
// LUCI 线索编排系统 - 触达日志数据仓储
// ==========================================
// 对齐: attempt_log 表
// 红线: 所有派发必须记录；只追加，不修改不删除
// ==========================================

mod core;
mod queries;


pub use core::AttemptLogRepository;
