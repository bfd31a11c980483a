//! 脚本化驱动
//!
//! 进程内驱动，按 URI 片段预设失败、延迟，并记录调用次数。
//! 用于测试和演示，不访问任何网络。

use crate::connection::ConnectionParams;
use crate::driver::{Driver, DriverError, DriverHandle, HandleState};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// 脚本化驱动
///
/// 克隆体共享同一份脚本和计数器。
#[derive(Clone)]
pub struct ScriptedDriver {
    kind: String,
    scheme: Option<String>,
    open_delay: Duration,
    close_delay: Duration,
    inner: Arc<ScriptedInner>,
}

#[derive(Default)]
struct ScriptedInner {
    open_failures: Mutex<Vec<(String, DriverError)>>,
    close_failures: Mutex<Vec<(String, DriverError)>>,
    handles: Mutex<Vec<Arc<ScriptedHandle>>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn find_failure(failures: &Mutex<Vec<(String, DriverError)>>, uri: &str) -> Option<DriverError> {
    lock(failures)
        .iter()
        .find(|(fragment, _)| uri.contains(fragment.as_str()))
        .map(|(_, err)| err.clone())
}

impl ScriptedInner {
    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedDriver {
    /// 创建指定后端类型的驱动
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            scheme: None,
            open_delay: Duration::ZERO,
            close_delay: Duration::ZERO,
            inner: Arc::new(ScriptedInner::default()),
        }
    }

    /// 声明 URI scheme
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// 每次 open 的延迟
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// 每次 close 的延迟
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// 作为驱动共享
    pub fn shared(&self) -> Arc<dyn Driver> {
        Arc::new(self.clone())
    }

    /// URI 包含 `fragment` 时 open 失败
    pub fn fail_open(&self, fragment: impl Into<String>, err: DriverError) {
        lock(&self.inner.open_failures).push((fragment.into(), err));
    }

    /// URI 包含 `fragment` 时 close 失败
    pub fn fail_close(&self, fragment: impl Into<String>, err: DriverError) {
        lock(&self.inner.close_failures).push((fragment.into(), err));
    }

    /// 清除所有预设失败
    pub fn clear_failures(&self) {
        lock(&self.inner.open_failures).clear();
        lock(&self.inner.close_failures).clear();
    }

    /// 模拟服务端断开：URI 包含 `fragment` 的句柄变为已关闭
    pub fn drop_handles(&self, fragment: &str) -> usize {
        let handles = lock(&self.inner.handles);
        let mut dropped = 0;
        for handle in handles.iter().filter(|h| h.uri.contains(fragment)) {
            handle.set_state(HandleState::Closed);
            dropped += 1;
        }
        dropped
    }

    /// open 调用次数
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// close 调用次数
    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// 同时进行中的驱动调用的最大值
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// 当前仍处于打开状态的句柄数
    pub fn open_handles(&self) -> usize {
        lock(&self.inner.handles)
            .iter()
            .filter(|h| h.state() == HandleState::Open)
            .count()
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    async fn open(
        &self,
        params: &ConnectionParams,
    ) -> std::result::Result<Arc<dyn DriverHandle>, DriverError> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.enter();
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        self.inner.leave();

        if let Some(err) = find_failure(&self.inner.open_failures, params.uri()) {
            return Err(err);
        }

        let handle = Arc::new(ScriptedHandle {
            uri: params.uri().to_string(),
            state: Mutex::new(HandleState::Open),
            close_delay: self.close_delay,
            inner: Arc::clone(&self.inner),
        });
        lock(&self.inner.handles).push(Arc::clone(&handle));
        Ok(handle)
    }
}

/// 脚本化驱动的句柄
pub struct ScriptedHandle {
    uri: String,
    state: Mutex<HandleState>,
    close_delay: Duration,
    inner: Arc<ScriptedInner>,
}

impl ScriptedHandle {
    fn set_state(&self, state: HandleState) {
        *lock(&self.state) = state;
    }
}

#[async_trait]
impl DriverHandle for ScriptedHandle {
    fn state(&self) -> HandleState {
        *lock(&self.state)
    }

    async fn close(&self) -> std::result::Result<(), DriverError> {
        self.inner.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.enter();
        self.set_state(HandleState::Closing);
        if !self.close_delay.is_zero() {
            tokio::time::sleep(self.close_delay).await;
        }
        self.inner.leave();

        if let Some(err) = find_failure(&self.inner.close_failures, &self.uri) {
            self.set_state(HandleState::Open);
            return Err(err);
        }
        self.set_state(HandleState::Closed);
        Ok(())
    }
}
