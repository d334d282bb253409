use super::core::{format_ts, AttemptLogRepository};
use crate::domain::attempt::AttemptLog;
use crate::domain::types::{AttemptStatus, CampaignContext, OutreachChannel};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Type, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT attempt_id, dispatch_id, lead_id, campaign_context, attempt_number,
           channel, template_used, status, contact_made, created_at,
           lead_block_id, detail
    FROM attempt_log
"#;

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

impl AttemptLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 attempt_id 查询单条日志
    pub fn find_by_id(&self, attempt_id: &str) -> RepositoryResult<Option<AttemptLog>> {
        let conn = self.get_conn()?;

        let sql = format!("{} WHERE attempt_id = ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![attempt_id], |row| self.map_row(row)) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某线索的全部触达记录（按时间正序）
    pub fn find_by_lead(&self, lead_id: &str) -> RepositoryResult<Vec<AttemptLog>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "{} WHERE lead_id = ? ORDER BY created_at ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![lead_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询某线索在指定上下文下的触达记录
    pub fn find_by_lead_and_context(
        &self,
        lead_id: &str,
        context: CampaignContext,
    ) -> RepositoryResult<Vec<AttemptLog>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "{} WHERE lead_id = ? AND campaign_context = ? ORDER BY created_at ASC, rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![lead_id, context.as_str()], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 批量查询多个线索的全部触达记录（按线索、时间正序）
    pub fn find_by_leads(&self, lead_ids: &[String]) -> RepositoryResult<Vec<AttemptLog>> {
        if lead_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;

        let placeholders = vec!["?"; lead_ids.len()].join(", ");
        let sql = format!(
            "{} WHERE lead_id IN ({}) ORDER BY lead_id ASC, created_at ASC, rowid ASC",
            SELECT_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params_from_iter(lead_ids.iter()), |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询一次派发产生的全部日志
    pub fn find_by_dispatch(&self, dispatch_id: &str) -> RepositoryResult<Vec<AttemptLog>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "{} WHERE dispatch_id = ? ORDER BY rowid ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![dispatch_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询指定线索集合中，自 `since` 起有真实触达（非 failed）的线索
    ///
    /// # 返回
    /// - lead_id 集合（去重，无序）
    pub fn recent_outreach_since(
        &self,
        lead_ids: &[String],
        since: DateTime<Utc>,
    ) -> RepositoryResult<Vec<String>> {
        if lead_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;

        let placeholders = vec!["?"; lead_ids.len()].join(", ");
        let sql = format!(
            r#"
            SELECT DISTINCT lead_id
            FROM attempt_log
            WHERE created_at >= ?
              AND status != ?
              AND lead_id IN ({})
            "#,
            placeholders
        );

        let mut bind: Vec<String> = Vec::with_capacity(lead_ids.len() + 2);
        bind.push(format_ts(&since));
        bind.push(AttemptStatus::Failed.as_str().to_string());
        bind.extend(lead_ids.iter().cloned());

        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(bind.iter()), |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(ids)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 映射数据库行到 AttemptLog
    fn map_row(&self, row: &Row) -> SqliteResult<AttemptLog> {
        let context_str: String = row.get(3)?;
        let channel_str: String = row.get(5)?;
        let status_str: String = row.get(7)?;
        let created_at_str: String = row.get(9)?;

        let campaign_context = CampaignContext::from_str(&context_str)
            .ok_or_else(|| conversion_error(3, format!("未知上下文: {}", context_str)))?;
        let channel = OutreachChannel::from_str(&channel_str)
            .ok_or_else(|| conversion_error(5, format!("未知渠道: {}", channel_str)))?;
        let status = AttemptStatus::from_str(&status_str)
            .ok_or_else(|| conversion_error(7, format!("未知状态: {}", status_str)))?;

        // 解析时间戳
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

        Ok(AttemptLog {
            attempt_id: row.get(0)?,
            dispatch_id: row.get(1)?,
            lead_id: row.get(2)?,
            campaign_context,
            attempt_number: row.get(4)?,
            channel,
            template_used: row.get(6)?,
            status,
            contact_made: row.get(8)?,
            created_at,
            lead_block_id: row.get(10)?,
            detail: row.get(11)?,
        })
    }
}
