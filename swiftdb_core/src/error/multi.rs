//! 聚合错误
//!
//! 扇出操作中每个失败项都会被保留，而不是只报告第一个。

use super::framework::SwiftDbError;
use std::fmt;

/// 多个错误的聚合
#[derive(Debug)]
pub struct MultiError {
    message: String,
    errors: Vec<SwiftDbError>,
}

impl MultiError {
    /// 创建空的聚合错误
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// 追加错误
    ///
    /// 嵌套的聚合错误会被展开，结果中只保留叶子错误。
    pub fn push(&mut self, err: SwiftDbError) {
        match err {
            SwiftDbError::Multi(nested) => self.errors.extend(nested.errors),
            other => self.errors.push(other),
        }
    }

    /// 汇总消息
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 所有底层错误
    pub fn errors(&self) -> &[SwiftDbError] {
        &self.errors
    }

    /// 取出所有底层错误
    pub fn into_errors(self) -> Vec<SwiftDbError> {
        self.errors
    }

    /// 错误数量
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// 是否没有错误
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 没有错误时返回 `Ok(())`，否则返回聚合错误
    pub fn into_result(self) -> super::Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SwiftDbError::Multi(self))
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} 个错误)", self.message, self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
