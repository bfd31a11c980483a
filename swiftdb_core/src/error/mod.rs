//! SwiftDB 统一错误处理
//!
//! 提供错误类型定义、错误分类以及扇出操作的聚合错误。

pub mod context;
pub mod framework;
pub mod multi;

// 重新导出主要类型
pub use context::ErrorContext;
pub use framework::{SwiftDbError, SwiftDbErrorKind};
pub use multi::MultiError;

/// SwiftDB 统一 Result 类型
pub type Result<T> = std::result::Result<T, SwiftDbError>;
