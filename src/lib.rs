//! # SwiftDB - 多适配器数据库连接管理层
//!
//! SwiftDB 为宿主应用管理一组命名的数据库连接。连接按后端类型归入适配器，
//! 适配器由管理器统一注册，支持批量建立、断开和移除连接，并完整保留部分失败。
//!
//! ## 特性
//!
//! - 按名称索引的连接与适配器注册表，支持改名
//! - 并发扇出的批量连接/断开，失败汇总为聚合错误
//! - 同一连接的状态转换串行化，不会并发调用驱动
//! - TOML 配置与环境变量覆盖
//! - 请求管线的连接中间件
//!
//! ## 快速开始
//!
//! ```rust,no_run,ignore
//! use std::sync::Arc;
//! use swiftdb::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> swiftdb::Result<()> {
//!     let manager = Arc::new(DbManager::new());
//!     manager.register_kind(my_driver())?;
//!
//!     let adapter = manager.create_adapter("mongo", Some("main"))?;
//!     adapter.create_connection(ConnectionParams::new("localhost/users"), Some("users"))?;
//!
//!     manager.connect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## 模块组织
//!
//! ### 配置模块
//! - DbConfig - 适配器与连接配置
//!
//! ### 核心模块
//! - NamedConnection - 命名连接及其状态机
//! - Registry - 名称索引的注册表
//! - fan_out - 扇出/汇合执行器
//! - Driver - 后端驱动抽象
//!
//! ### 适配器模块
//! - DbAdapter - 适配器能力接口
//! - Adapter - 基于驱动的通用适配器
//!
//! ### 管理器模块
//! - DbManager - 适配器管理器
//! - Connector - 连接中间件

// ============================================================================
// Crate Re-exports (for advanced users)
// ============================================================================

pub use swiftdb_adapter;
pub use swiftdb_config;
pub use swiftdb_core;

#[cfg(feature = "manager")]
pub use swiftdb_manager;

pub use swiftdb_adapter::{Adapter, DbAdapter};
pub use swiftdb_config::{ConfigError, DbConfig};
pub use swiftdb_core::{
    ConnectionParams, ConnectionStatus, Driver, DriverError, DriverHandle, MultiError,
    NamedConnection, SwiftDbError,
};

#[cfg(feature = "manager")]
pub use swiftdb_manager::{Connector, DbManager, PipelineError};

// ============================================================================
// Prelude Module
// ============================================================================

/// 预导出常用类型
///
/// 通过 `use swiftdb::prelude::*;` 导入所有常用类型
pub mod prelude {
    pub use std::result::Result as StdResult;

    pub use swiftdb_adapter::prelude::*;
    pub use swiftdb_config::{ConfigError, DbConfig};
    pub use swiftdb_core::prelude::*;

    #[cfg(feature = "manager")]
    pub use swiftdb_manager::prelude::*;
}

// ============================================================================
// Error Types
// ============================================================================

/// SwiftDB 统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// SwiftDB 统一错误枚举
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 核心错误
    #[error(transparent)]
    Core(#[from] SwiftDbError),

    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 管线错误
    #[cfg(feature = "manager")]
    #[error(transparent)]
    Pipeline(#[from] swiftdb_manager::PipelineError),

    /// 自定义错误
    #[error("{0}")]
    Custom(String),
}

// ============================================================================
// Version Information
// ============================================================================

/// SwiftDB 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SwiftDB 包名
pub const NAME: &str = env!("CARGO_PKG_NAME");
