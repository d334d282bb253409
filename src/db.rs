// ==========================================
// LUCI 线索编排系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入触达日志时的偶发 busy 错误
// - 建表幂等（schema_version / config_kv / attempt_log）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 确保本系统使用的表存在（幂等）
///
/// attempt_log 只追加：不提供 UPDATE/DELETE 入口
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS attempt_log (
            attempt_id TEXT PRIMARY KEY,
            dispatch_id TEXT NOT NULL,
            lead_id TEXT NOT NULL,
            campaign_context TEXT NOT NULL,
            attempt_number INTEGER NOT NULL,
            channel TEXT NOT NULL,
            template_used TEXT NOT NULL,
            status TEXT NOT NULL,
            contact_made INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            lead_block_id TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_attempt_log_lead
            ON attempt_log (lead_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_attempt_log_dispatch
            ON attempt_log (dispatch_id);
        "#,
    )?;

    let current = read_schema_version(conn)?;
    if current.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    } else if current != Some(CURRENT_SCHEMA_VERSION) {
        tracing::warn!(
            found = ?current,
            expected = CURRENT_SCHEMA_VERSION,
            "数据库 schema_version 与当前代码不一致"
        );
    }

    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
