// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 组装带 Mock 协作方的 AppState（临时 SQLite 台账）
// ==========================================

use std::sync::{Arc, Mutex};

use luci_orchestrator::app::{AppState, PipelineComponents};
use luci_orchestrator::config::PipelineConfig;
use luci_orchestrator::db::open_sqlite_connection;
use luci_orchestrator::engine::ContentLibrary;
use luci_orchestrator::enrichment::{BulkEnricher, SingleEnricher};
use luci_orchestrator::repository::AttemptLogRepository;
use rusqlite::Connection;
use tempfile::NamedTempFile;

use super::mock_services::{
    BulkMode, MockBulkEnricher, MockChannelGateway, MockRecordStore, MockSingleEnricher,
};

/// 小规模配置：batch 3，block 8，无限速
pub fn small_config() -> PipelineConfig {
    PipelineConfig {
        batch_size: 3,
        block_max: 8,
        rate_limit_delay_ms: 0,
        request_timeout_ms: 2_000,
        ..Default::default()
    }
}

/// API测试环境
///
/// 包含 AppState 与所有 Mock 协作方
pub struct ApiTestEnv {
    pub _temp_file: NamedTempFile,
    pub conn: Arc<Mutex<Connection>>,
    pub state: Arc<AppState>,
    pub store: Arc<MockRecordStore>,
    pub bulk: Arc<MockBulkEnricher>,
    pub single: Arc<MockSingleEnricher>,
    pub channels: Arc<MockChannelGateway>,
    pub config: PipelineConfig,
}

impl ApiTestEnv {
    /// 默认环境：同步批量反查 + 小规模配置
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with(small_config(), MockBulkEnricher::new(BulkMode::Sync))
    }

    pub fn with_config(config: PipelineConfig) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with(config, MockBulkEnricher::new(BulkMode::Sync))
    }

    pub fn with_bulk(bulk: MockBulkEnricher) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with(small_config(), bulk)
    }

    pub fn with(
        config: PipelineConfig,
        bulk: MockBulkEnricher,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        luci_orchestrator::logging::init_test();

        let temp_file = NamedTempFile::new()?;
        let db_path = temp_file.path().to_string_lossy().to_string();

        let conn = open_sqlite_connection(&db_path)?;
        luci_orchestrator::db::ensure_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        let store = Arc::new(MockRecordStore::new());
        let bulk = Arc::new(bulk);
        let single = Arc::new(MockSingleEnricher::default());
        let channels = Arc::new(MockChannelGateway::new());

        let components = PipelineComponents {
            conn: conn.clone(),
            store: store.clone(),
            bulk: Some(bulk.clone() as Arc<dyn BulkEnricher>),
            single: Some(single.clone() as Arc<dyn SingleEnricher>),
            channels: channels.clone(),
            config: config.clone(),
            library: Arc::new(ContentLibrary::default()),
            webhook_url: Some("http://localhost/api/webhook/skip-trace".to_string()),
        };
        let state = Arc::new(AppState::from_components(db_path, components));

        Ok(Self {
            _temp_file: temp_file,
            conn,
            state,
            store,
            bulk,
            single,
            channels,
            config,
        })
    }

    /// 直接读取台账（断言用）
    pub fn attempt_repo(&self) -> AttemptLogRepository {
        AttemptLogRepository::new(self.conn.clone())
    }
}
