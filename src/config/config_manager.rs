// ==========================================
// LUCI 线索编排系统 - 配置管理器
// ==========================================
// 职责: 从 config_kv 表读取覆写值，缺失/格式错误时回退默认值
// 存储: config_kv 表 (scope_id + key + value)
// ==========================================

use crate::config::pipeline_config::{PipelineConfig, RetargetPolicy, ServiceEndpoints};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并确保表存在（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            crate::db::ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值；解析失败记录告警并回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "配置值格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }

    fn get_string_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    // ===== 管线配置 =====

    /// 加载管线配置（默认值 + config_kv 覆写）
    pub fn load_pipeline_config(&self) -> Result<PipelineConfig, Box<dyn Error>> {
        let defaults = PipelineConfig::default();
        let retarget_defaults = RetargetPolicy::default();

        let config = PipelineConfig {
            batch_size: self.get_parsed_or_default(config_keys::BATCH_SIZE, defaults.batch_size)?,
            block_max: self.get_parsed_or_default(config_keys::BLOCK_MAX, defaults.block_max)?,
            rate_limit_delay_ms: self
                .get_parsed_or_default(config_keys::RATE_LIMIT_DELAY_MS, defaults.rate_limit_delay_ms)?,
            request_timeout_ms: self
                .get_parsed_or_default(config_keys::REQUEST_TIMEOUT_MS, defaults.request_timeout_ms)?,
            human_in_loop: self
                .get_parsed_or_default(config_keys::HUMAN_IN_LOOP, defaults.human_in_loop)?,
            dedup_window_days: self
                .get_parsed_or_default(config_keys::DEDUP_WINDOW_DAYS, defaults.dedup_window_days)?,
            retarget: RetargetPolicy {
                threshold: self
                    .get_parsed_or_default(config_keys::RETARGET_THRESHOLD, retarget_defaults.threshold)?,
                max_retargets: self.get_parsed_or_default(
                    config_keys::RETARGET_MAX,
                    retarget_defaults.max_retargets,
                )?,
                delay_hours: self.get_parsed_or_default(
                    config_keys::RETARGET_DELAY_HOURS,
                    retarget_defaults.delay_hours,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// 加载外部协作方地址
    ///
    /// 优先级: 单项 key > service_base_url > 默认 localhost
    pub fn load_endpoints(&self) -> Result<ServiceEndpoints, Box<dyn Error>> {
        let base = self.get_string_or_default(config_keys::SERVICE_BASE_URL, "http://localhost:3000")?;
        let d = ServiceEndpoints::with_base(&base);

        Ok(ServiceEndpoints {
            record_store_url: self
                .get_string_or_default(config_keys::RECORD_STORE_URL, &d.record_store_url)?,
            bulk_enrich_url: self.get_string_or_default(config_keys::BULK_ENRICH_URL, &d.bulk_enrich_url)?,
            single_enrich_url: self
                .get_string_or_default(config_keys::SINGLE_ENRICH_URL, &d.single_enrich_url)?,
            sms_queue_url: self.get_string_or_default(config_keys::SMS_QUEUE_URL, &d.sms_queue_url)?,
            dialer_queue_url: self
                .get_string_or_default(config_keys::DIALER_QUEUE_URL, &d.dialer_queue_url)?,
            webhook_url: self.get_string_or_default(config_keys::WEBHOOK_URL, &d.webhook_url)?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批次与线索块
    pub const BATCH_SIZE: &str = "batch_size";
    pub const BLOCK_MAX: &str = "block_max";

    // 限速与超时
    pub const RATE_LIMIT_DELAY_MS: &str = "rate_limit_delay_ms";
    pub const REQUEST_TIMEOUT_MS: &str = "request_timeout_ms";

    // 派发策略
    pub const HUMAN_IN_LOOP: &str = "human_in_loop";
    pub const DEDUP_WINDOW_DAYS: &str = "dedup_window_days";

    // 再触达
    pub const RETARGET_THRESHOLD: &str = "retarget_threshold";
    pub const RETARGET_MAX: &str = "retarget_max";
    pub const RETARGET_DELAY_HOURS: &str = "retarget_delay_hours";

    // 外部协作方
    pub const SERVICE_BASE_URL: &str = "service_base_url";
    pub const RECORD_STORE_URL: &str = "record_store_url";
    pub const BULK_ENRICH_URL: &str = "bulk_enrich_url";
    pub const SINGLE_ENRICH_URL: &str = "single_enrich_url";
    pub const SMS_QUEUE_URL: &str = "sms_queue_url";
    pub const DIALER_QUEUE_URL: &str = "dialer_queue_url";
    pub const WEBHOOK_URL: &str = "webhook_url";
}
