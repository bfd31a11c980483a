//! SwiftDB 核心错误类型
//!
//! 定义注册表、连接生命周期和驱动交互中出现的所有错误。

use super::context::ErrorContext;
use super::multi::MultiError;
use crate::driver::DriverError;
use swiftdb_config::ConfigError;
use thiserror::Error;

/// SwiftDB 核心错误类型
#[derive(Error, Debug)]
pub enum SwiftDbError {
    /// 参数错误（名称或连接参数缺失、格式非法），不会触达驱动
    #[error("参数无效: {0}")]
    InvalidArgument(String),

    /// 名称冲突
    #[error("名称已存在: {0}")]
    DuplicateName(String),

    /// 名称不存在
    #[error("未找到: {0}")]
    NotFound(String),

    /// 驱动建立连接失败
    #[error("建立连接 \"{name}\" 失败: {source}")]
    Connect {
        /// 连接名称
        name: String,
        /// 驱动报告的原始错误
        source: DriverError,
    },

    /// 驱动断开连接失败
    #[error("断开连接 \"{name}\" 失败: {source}")]
    Disconnect {
        /// 连接名称
        name: String,
        /// 驱动报告的原始错误
        source: DriverError,
    },

    /// 扇出操作的聚合错误
    #[error(transparent)]
    Multi(#[from] MultiError),

    /// 未注册的后端类型
    #[error("不支持的后端类型: {0}")]
    UnsupportedKind(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 带上下文的错误
    #[error("{0} ({1})")]
    WithContext(#[source] Box<SwiftDbError>, ErrorContext),
}

impl SwiftDbError {
    /// 获取错误类型
    ///
    /// 带上下文的错误返回内部错误的类型。
    pub fn kind(&self) -> SwiftDbErrorKind {
        match self {
            SwiftDbError::InvalidArgument(_) => SwiftDbErrorKind::InvalidArgument,
            SwiftDbError::DuplicateName(_) => SwiftDbErrorKind::DuplicateName,
            SwiftDbError::NotFound(_) => SwiftDbErrorKind::NotFound,
            SwiftDbError::Connect { .. } => SwiftDbErrorKind::Connect,
            SwiftDbError::Disconnect { .. } => SwiftDbErrorKind::Disconnect,
            SwiftDbError::Multi(_) => SwiftDbErrorKind::Multi,
            SwiftDbError::UnsupportedKind(_) => SwiftDbErrorKind::UnsupportedKind,
            SwiftDbError::Config(_) => SwiftDbErrorKind::Config,
            SwiftDbError::WithContext(inner, _) => inner.kind(),
        }
    }

    /// 错误码
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// 添加上下文信息
    pub fn with_context<C>(self, context: C) -> Self
    where
        C: Into<ErrorContext>,
    {
        SwiftDbError::WithContext(Box::new(self), context.into())
    }

    /// 去掉上下文包装后的错误
    pub fn root(&self) -> &SwiftDbError {
        match self {
            SwiftDbError::WithContext(inner, _) => inner.root(),
            other => other,
        }
    }

    /// 若为聚合错误则返回之
    pub fn as_multi(&self) -> Option<&MultiError> {
        match self.root() {
            SwiftDbError::Multi(multi) => Some(multi),
            _ => None,
        }
    }

    /// 相关的连接名称（仅驱动错误携带）
    pub fn connection_name(&self) -> Option<&str> {
        match self.root() {
            SwiftDbError::Connect { name, .. } | SwiftDbError::Disconnect { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// 创建参数错误
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        SwiftDbError::InvalidArgument(msg.into())
    }

    /// 创建名称冲突错误
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        SwiftDbError::DuplicateName(name.into())
    }

    /// 创建未找到错误
    pub fn not_found(name: impl Into<String>) -> Self {
        SwiftDbError::NotFound(name.into())
    }

    /// 创建建立连接错误
    pub fn connect(name: impl Into<String>, source: DriverError) -> Self {
        SwiftDbError::Connect {
            name: name.into(),
            source,
        }
    }

    /// 创建断开连接错误
    pub fn disconnect(name: impl Into<String>, source: DriverError) -> Self {
        SwiftDbError::Disconnect {
            name: name.into(),
            source,
        }
    }

    /// 创建不支持的后端类型错误
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        SwiftDbError::UnsupportedKind(kind.into())
    }
}

/// 错误类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwiftDbErrorKind {
    /// 参数错误
    InvalidArgument,
    /// 名称冲突
    DuplicateName,
    /// 名称不存在
    NotFound,
    /// 建立连接失败
    Connect,
    /// 断开连接失败
    Disconnect,
    /// 聚合错误
    Multi,
    /// 不支持的后端类型
    UnsupportedKind,
    /// 配置错误
    Config,
}

impl SwiftDbErrorKind {
    /// 稳定的错误码
    pub fn code(&self) -> &'static str {
        match self {
            SwiftDbErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            SwiftDbErrorKind::DuplicateName => "DUPLICATE_NAME",
            SwiftDbErrorKind::NotFound => "NOT_FOUND",
            SwiftDbErrorKind::Connect => "CONNECT_ERROR",
            SwiftDbErrorKind::Disconnect => "DISCONNECT_ERROR",
            SwiftDbErrorKind::Multi => "MULTI_ERROR",
            SwiftDbErrorKind::UnsupportedKind => "UNSUPPORTED_KIND",
            SwiftDbErrorKind::Config => "CONFIG_ERROR",
        }
    }
}
