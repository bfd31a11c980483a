//! SwiftDB 管理器
//!
//! 适配器注册表、批量连接以及请求管线的连接中间件。

pub mod manager;
pub mod middleware;

pub use crate::manager::DbManager;
pub use crate::middleware::{
    CONNECT_FAILURE_MESSAGE, Connector, Handler, Middleware, Next, PipelineError, PipelineFuture,
    PipelineResult, Stack,
};

// 预导出
pub mod prelude {
    pub use crate::manager::DbManager;
    pub use crate::middleware::{Connector, Handler, Middleware, Next, PipelineError, Stack};
}
