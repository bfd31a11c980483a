//! SwiftDB 核心
//!
//! 提供命名连接、注册表、扇出执行器以及驱动能力抽象。

pub mod connection;
pub mod driver;
pub mod error;
pub mod fanout;
pub mod metrics;
pub mod naming;
pub mod registry;
pub mod testing;

// 导出主要类型到 crate root
pub use crate::connection::{ConnectionParams, ConnectionStatus, NamedConnection};
pub use crate::driver::{Driver, DriverError, DriverHandle, HandleState};
pub use crate::error::{ErrorContext, MultiError, Result, SwiftDbError, SwiftDbErrorKind};
pub use crate::fanout::fan_out;
pub use crate::metrics::LifecycleMetrics;
pub use crate::naming::NameGenerator;
pub use crate::registry::{Membership, Registry, RegistryEntry, RenameToken};

// 预导出
pub mod prelude {
    pub use crate::connection::{ConnectionParams, ConnectionStatus, NamedConnection};
    pub use crate::driver::{Driver, DriverError, DriverHandle, HandleState};
    pub use crate::error::{MultiError, Result, SwiftDbError, SwiftDbErrorKind};
    pub use crate::registry::{Membership, Registry, RegistryEntry};
}
