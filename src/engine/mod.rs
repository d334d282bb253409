// ==========================================
// LUCI 线索编排系统 - 引擎层
// ==========================================
// 职责: 批次切片 / 线索块 / 话术选择 / 台账门控 / 派发
// 红线: Engine 不拼 SQL, 外部调用只经 gateway 与 enrichment
// ==========================================

pub mod attempt_ledger;
pub mod batch_controller;
pub mod lead_block_assembler;
pub mod push_dispatcher;
pub mod record_filter;
pub mod retarget;
pub mod template_library;
pub mod template_selector;

// 重导出核心引擎
pub use attempt_ledger::AttemptLedger;
pub use batch_controller::{plan_window, BatchController, BatchResult};
pub use lead_block_assembler::LeadBlockAssembler;
pub use push_dispatcher::{
    DispatchError, DispatchResult, PushCommand, PushDispatcher, PushResult,
};
pub use record_filter::apply_filters;
pub use retarget::{RetargetDecision, RetargetGate, SkipReason};
pub use template_library::{ContentLibrary, LibraryKey};
pub use template_selector::{SelectedTemplate, TemplateSelector};
