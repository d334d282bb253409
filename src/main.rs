// ==========================================
// LUCI 线索编排系统 - 服务主入口
// ==========================================
// 环境变量:
// - LUCI_DB_PATH: 数据库路径（默认用户数据目录）
// - LUCI_BIND_ADDR: 监听地址（默认 127.0.0.1:8787）
// - RUST_LOG / LUCI_LOG_FORMAT: 日志级别与格式
// ==========================================

use std::sync::Arc;

use anyhow::Context;
use luci_orchestrator::app::{get_default_db_path, router, AppState};
use luci_orchestrator::logging;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", luci_orchestrator::APP_NAME);
    tracing::info!("系统版本: {}", luci_orchestrator::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow::anyhow!("无法初始化AppState: {}", e))?;

    let bind_addr = std::env::var("LUCI_BIND_ADDR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("无法监听 {}", bind_addr))?;
    tracing::info!("HTTP 服务已启动: {}", bind_addr);

    axum::serve(listener, router(Arc::new(state)))
        .await
        .context("HTTP 服务异常退出")?;

    Ok(())
}
