//! 名称生成器
//!
//! 为未显式命名的连接和适配器生成名称。计数器归属于各自的注册表实例，
//! 不同实例之间互不影响。

use std::sync::atomic::{AtomicU64, Ordering};

/// 名称生成器
#[derive(Debug)]
pub struct NameGenerator {
    next_id: AtomicU64,
}

impl NameGenerator {
    /// 创建新的生成器
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成下一个名称，形如 `<prefix>_<n>`
    pub fn next(&self, prefix: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}_{}", prefix, id)
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new()
    }
}
