//! SwiftDB 适配器
//!
//! 适配器把一组同类后端的命名连接组织在一起，提供批量建立、断开和移除。

pub mod adapter;
pub mod interface;

pub use crate::adapter::Adapter;
pub use crate::interface::DbAdapter;

// 预导出
pub mod prelude {
    pub use crate::adapter::Adapter;
    pub use crate::interface::DbAdapter;
}
