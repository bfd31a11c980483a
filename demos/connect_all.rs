//! # SwiftDB 批量连接示例
//!
//! ## 功能说明
//!
//! 这个示例展示了 SwiftDB 管理器的完整生命周期，包括：
//! - 从 TOML 配置创建适配器和连接
//! - 批量建立连接并查看部分失败
//! - 连接中间件在请求前确保数据库可用
//! - 断开并移除全部适配器
//!
//! 示例使用进程内的脚本化驱动，不需要真实的数据库。
//!
//! ## 运行方式
//!
//! ```bash
//! RUST_LOG=debug cargo run --example connect_all
//! ```

use std::sync::Arc;

use swiftdb::prelude::*;
use swiftdb::swiftdb_core::testing::ScriptedDriver;
use swiftdb::swiftdb_manager::PipelineFuture;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
[[adapters]]
name = "main"
kind = "mongo"

[[adapters.connections]]
name = "users"
uri = "db-1:27017,db-2:27017/users"

[[adapters.connections]]
name = "orders"
uri = "db-down:27017/orders"

[[adapters]]
name = "audit"
kind = "mongo"

[[adapters.connections]]
name = "events"
uri = "db-3:27017/events"
"#;

#[tokio::main]
async fn main() -> swiftdb::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = DbConfig::from_toml_str(CONFIG)?.load_with_env_override()?;
    info!("{}", config.summary());

    // db-down 上的连接会被拒绝
    let driver = ScriptedDriver::new("mongo").with_scheme("mongodb");
    driver.fail_open(
        "db-down",
        DriverError::with_code("ECONNREFUSED", "db-down:27017"),
    );

    let manager = Arc::new(DbManager::from_config(&config, [driver.shared()])?);

    // ============================================================================
    // 批量连接
    // ============================================================================

    if let Err(err) = manager.connect().await {
        warn!("批量连接部分失败: {}", err);
        if let Some(multi) = err.as_multi() {
            for cause in multi.errors() {
                warn!(
                    connection = cause.connection_name().unwrap_or("-"),
                    code = cause.code(),
                    "{}",
                    cause
                );
            }
        }
    }
    println!("{}", manager.report());

    // ============================================================================
    // 连接中间件
    // ============================================================================

    let mut stack = Stack::new();
    stack.push(manager.connector());
    let handler = stack.build(|path: String| -> PipelineFuture {
        Box::pin(async move {
            info!(path = %path, "处理请求");
            Ok(())
        })
    });

    match handler.call("/orders".to_string()).await {
        Ok(()) => info!("请求完成"),
        Err(err) => warn!(status = err.status, "请求中止: {}", err.message),
    }

    // 故障恢复后重试
    driver.clear_failures();
    handler.call("/orders".to_string()).await?;

    // ============================================================================
    // 清理
    // ============================================================================

    manager.remove_all_adapters().await?;
    info!(adapters = manager.adapter_count(), "全部适配器已移除");

    Ok(())
}
