// ==========================================
// LUCI 线索编排系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use reqwest::Client;
use rusqlite::Connection;

use crate::api::OrchestrateApi;
use crate::config::config_manager::ConfigManager;
use crate::config::{PipelineConfig, ServiceEndpoints};
use crate::engine::{
    AttemptLedger, BatchController, ContentLibrary, PushDispatcher, TemplateSelector,
};
use crate::enrichment::{
    BulkEnricher, HttpBulkEnricher, HttpSingleEnricher, ProviderAdapter, SingleEnricher,
};
use crate::gateway::{ChannelGateway, HttpChannelGateway, HttpRecordStore, RecordStore};
use crate::repository::AttemptLogRepository;

/// 管线组件（HTTP 实现或测试替身）
pub struct PipelineComponents {
    pub conn: Arc<Mutex<Connection>>,
    pub store: Arc<dyn RecordStore>,
    pub bulk: Option<Arc<dyn BulkEnricher>>,
    pub single: Option<Arc<dyn SingleEnricher>>,
    pub channels: Arc<dyn ChannelGateway>,
    pub config: PipelineConfig,
    pub library: Arc<ContentLibrary>,
    pub webhook_url: Option<String>,
}

/// 应用状态
///
/// 包含所有API实例和共享资源
/// 在 HTTP 服务中作为全局状态管理
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 生效的管线配置
    pub config: PipelineConfig,

    /// 编排API
    pub orchestrate_api: Arc<OrchestrateApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 初始化成功
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并确保表结构
    /// 2. 从 config_kv 读取管线配置与协作方地址
    /// 3. 组装 HTTP 协作方实现与各 API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("无法创建ConfigManager: {}", e))?;
        let config = config_manager
            .load_pipeline_config()
            .map_err(|e| format!("管线配置无效: {}", e))?;
        let endpoints: ServiceEndpoints = config_manager
            .load_endpoints()
            .map_err(|e| format!("协作方地址读取失败: {}", e))?;

        tracing::info!(
            batch_size = config.batch_size,
            block_max = config.block_max,
            human_in_loop = config.human_in_loop,
            "管线配置已加载"
        );

        // ==========================================
        // HTTP 协作方
        // ==========================================
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| format!("无法创建HTTP客户端: {}", e))?;

        let components = PipelineComponents {
            conn,
            store: Arc::new(HttpRecordStore::new(client.clone(), &endpoints.record_store_url)),
            bulk: Some(Arc::new(HttpBulkEnricher::new(client.clone(), &endpoints.bulk_enrich_url))),
            single: Some(Arc::new(HttpSingleEnricher::new(
                client.clone(),
                &endpoints.single_enrich_url,
            ))),
            channels: Arc::new(HttpChannelGateway::new(
                client,
                &endpoints.sms_queue_url,
                &endpoints.dialer_queue_url,
            )),
            config,
            library: Arc::new(ContentLibrary::default()),
            webhook_url: Some(endpoints.webhook_url.clone()),
        };

        Ok(Self::from_components(db_path, components))
    }

    /// 由组件组装AppState（测试可注入替身）
    pub fn from_components(db_path: String, c: PipelineComponents) -> Self {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let attempt_repo = Arc::new(AttemptLogRepository::new(c.conn.clone()));
        let ledger = Arc::new(AttemptLedger::new(attempt_repo, &c.config));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let mut adapter = ProviderAdapter::new(c.bulk, c.single, &c.config);
        if let Some(url) = c.webhook_url {
            adapter = adapter.with_webhook_url(url);
        }
        let controller = Arc::new(BatchController::new(
            c.store.clone(),
            Arc::new(adapter),
            c.config.clone(),
        ));
        let dispatcher = Arc::new(PushDispatcher::new(
            c.store.clone(),
            c.channels,
            ledger.clone(),
            TemplateSelector::new(c.library),
            c.config.clone(),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let orchestrate_api = Arc::new(OrchestrateApi::new(
            c.store,
            controller,
            dispatcher,
            ledger,
            c.config.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Self {
            db_path,
            config: c.config,
            orchestrate_api,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: LUCI_DB_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("LUCI_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./luci_orchestrator.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("luci-orchestrator");
        // 确保目录存在
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("luci_orchestrator.db");
        }
    }

    path.to_string_lossy().to_string()
}
