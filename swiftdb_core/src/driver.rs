//! 驱动能力
//!
//! 底层数据库驱动对本层暴露的最小能力集合：打开、关闭以及查询句柄状态。

use crate::connection::ConnectionParams;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// 驱动句柄状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    /// 正在建立
    Connecting,
    /// 可用
    Open,
    /// 正在关闭
    Closing,
    /// 已关闭
    Closed,
}

impl HandleState {
    /// 句柄是否可用或正在变为可用
    pub fn is_usable(&self) -> bool {
        matches!(self, HandleState::Connecting | HandleState::Open)
    }
}

/// 驱动报告的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    code: Option<String>,
    message: String,
}

impl DriverError {
    /// 创建驱动错误
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// 创建带错误码的驱动错误（如 `ECONNREFUSED`）
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// 错误码
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// 错误描述
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// 已打开的驱动句柄
#[async_trait]
pub trait DriverHandle: Send + Sync {
    /// 当前状态
    fn state(&self) -> HandleState;

    /// 关闭句柄，完成时恰好返回一次
    async fn close(&self) -> std::result::Result<(), DriverError>;
}

/// 数据库驱动
///
/// 一个驱动对应一种后端类型，适配器通过它为每个命名连接打开句柄。
#[async_trait]
pub trait Driver: Send + Sync {
    /// 后端类型标签（如 "mongo"）
    fn kind(&self) -> &str;

    /// 后端期望的 URI scheme
    ///
    /// 返回 `Some` 时，绑定到连接的 URI 会补全缺失的 scheme 前缀。
    fn scheme(&self) -> Option<&str> {
        None
    }

    /// 打开连接，完成时恰好返回一次
    async fn open(
        &self,
        params: &ConnectionParams,
    ) -> std::result::Result<Arc<dyn DriverHandle>, DriverError>;
}
