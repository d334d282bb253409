use crate::domain::attempt::AttemptLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AttemptLogRepository - 触达日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct AttemptLogRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 时间戳统一存储为 RFC3339（毫秒，UTC），保证字典序即时间序
pub(super) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

const INSERT_SQL: &str = r#"
    INSERT INTO attempt_log (
        attempt_id, dispatch_id, lead_id, campaign_context, attempt_number,
        channel, template_used, status, contact_made, created_at,
        lead_block_id, detail
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

impl AttemptLogRepository {
    /// 创建新的触达日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入触达日志
    ///
    /// # 参数
    /// - `log`: 触达日志实体
    ///
    /// # 返回
    /// - `Ok(attempt_id)`: 成功插入,返回 attempt_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &AttemptLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            INSERT_SQL,
            params![
                log.attempt_id,
                log.dispatch_id,
                log.lead_id,
                log.campaign_context.as_str(),
                log.attempt_number,
                log.channel.as_str(),
                log.template_used,
                log.status.as_str(),
                log.contact_made,
                format_ts(&log.created_at),
                log.lead_block_id,
                log.detail,
            ],
        )?;

        Ok(log.attempt_id.clone())
    }

    /// 批量插入触达日志（单事务）
    pub fn batch_insert(&self, logs: &[AttemptLog]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for log in logs {
            tx.execute(
                INSERT_SQL,
                params![
                    log.attempt_id,
                    log.dispatch_id,
                    log.lead_id,
                    log.campaign_context.as_str(),
                    log.attempt_number,
                    log.channel.as_str(),
                    log.template_used,
                    log.status.as_str(),
                    log.contact_made,
                    format_ts(&log.created_at),
                    log.lead_block_id,
                    log.detail,
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }
}
