//! 生命周期指标
//!
//! 统计连接的建立、断开及其失败次数。

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// 连接生命周期指标
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
    /// 当前打开的连接数
    open_connections: AtomicUsize,
    /// 驱动 open 调用次数
    connect_attempts: AtomicU64,
    /// open 失败次数
    connect_failures: AtomicU64,
    /// 成功断开次数
    disconnects: AtomicU64,
    /// close 失败次数
    disconnect_failures: AtomicU64,
}

impl LifecycleMetrics {
    /// 创建新的指标
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次 open 调用
    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录 open 成功
    pub fn record_connected(&self) {
        self.open_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录 open 失败
    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录句柄释放（主动断开或驱动侧已关闭）
    pub fn record_released(&self) {
        // 不会低于 0
        let _ = self
            .open_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// 记录断开成功
    pub fn record_disconnected(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
        self.record_released();
    }

    /// 记录 close 失败
    pub fn record_disconnect_failure(&self) {
        self.disconnect_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// 当前打开的连接数
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::Relaxed)
    }

    /// open 调用次数
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// open 失败次数
    pub fn connect_failures(&self) -> u64 {
        self.connect_failures.load(Ordering::Relaxed)
    }

    /// 成功断开次数
    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// close 失败次数
    pub fn disconnect_failures(&self) -> u64 {
        self.disconnect_failures.load(Ordering::Relaxed)
    }

    /// 生成摘要报告
    pub fn summary(&self) -> String {
        format!(
            "打开: {}, 建立尝试: {} (失败 {}), 断开: {} (失败 {})",
            self.open_connections(),
            self.connect_attempts(),
            self.connect_failures(),
            self.disconnects(),
            self.disconnect_failures()
        )
    }
}
