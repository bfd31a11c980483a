//! 扇出/汇合执行器
//!
//! 对注册表快照中的每一项并发执行同一个异步操作，等待全部完成后
//! 汇总为单个结果。
//!
//! - 每项恰好执行一次，按快照顺序发起，完成顺序不定
//! - 所有操作结束（无论成败）后才返回，不会因首个失败而提前返回
//! - 任何失败都会被保留在 [`MultiError`] 中，已成功项不回滚

use crate::error::{MultiError, Result};
use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// 对快照中的每一项执行 `op` 并汇总结果
///
/// `message` 作为聚合错误的汇总消息。
pub async fn fan_out<T, F, Fut>(items: Vec<(String, Arc<T>)>, message: &str, op: F) -> Result<()>
where
    T: ?Sized,
    F: Fn(String, Arc<T>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if items.is_empty() {
        return Ok(());
    }

    let total = items.len();
    let results = join_all(items.into_iter().map(|(name, item)| op(name, item))).await;

    let mut errors = MultiError::new(message);
    for result in results {
        if let Err(err) = result {
            errors.push(err);
        }
    }

    debug!(total, failed = errors.len(), "{}", message);
    errors.into_result()
}
