//! 命名连接
//!
//! 一个已配置、可能已打开的到单个后端实例的连接记录。

use crate::driver::{Driver, DriverHandle};
use crate::error::{Result, SwiftDbError};
use crate::metrics::LifecycleMetrics;
use crate::registry::{Membership, RegistryEntry, RenameToken};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use swiftdb_config::ConnectionConfig;
use tracing::{debug, info, warn};

/// 连接参数
///
/// 存入连接后不可修改，替换需整体重新设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// 连接 URI，多个主机以逗号分隔
    uri: String,
    /// 后端特定选项
    #[serde(default)]
    options: BTreeMap<String, String>,
}

impl ConnectionParams {
    /// 创建连接参数
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            options: BTreeMap::new(),
        }
    }

    /// 附加选项
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// 连接 URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 所有选项
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// 获取选项
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// 校验参数
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(SwiftDbError::invalid_argument("连接 URI 不能为空"));
        }
        if self.uri.chars().any(char::is_whitespace) {
            return Err(SwiftDbError::invalid_argument(format!(
                "连接 URI 不能包含空白字符: {:?}",
                self.uri
            )));
        }
        if self.uri.split(',').any(|part| part.is_empty()) {
            return Err(SwiftDbError::invalid_argument(format!(
                "连接 URI 中存在空的主机段: {}",
                self.uri
            )));
        }
        Ok(())
    }

    /// 补全 scheme 前缀
    ///
    /// 逗号分隔的每一段若缺少 `<scheme>://` 则补上。
    pub fn normalized(&self, scheme: Option<&str>) -> Self {
        let Some(scheme) = scheme else {
            return self.clone();
        };
        let prefix = format!("{}://", scheme);
        let uri = self
            .uri
            .split(',')
            .map(|part| {
                if part.starts_with(&prefix) {
                    part.to_string()
                } else {
                    format!("{}{}", prefix, part)
                }
            })
            .collect::<Vec<_>>()
            .join(",");

        Self {
            uri,
            options: self.options.clone(),
        }
    }
}

impl From<&ConnectionConfig> for ConnectionParams {
    fn from(config: &ConnectionConfig) -> Self {
        Self {
            uri: config.uri.clone(),
            options: config.options.clone(),
        }
    }
}

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// 未连接
    Disconnected,
    /// 连接中
    Connecting,
    /// 已连接
    Connected,
    /// 断开中
    Disconnecting,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnecting => "disconnecting",
        };
        f.write_str(text)
    }
}

/// 状态与句柄，总是一起更新
struct Link {
    status: ConnectionStatus,
    handle: Option<Arc<dyn DriverHandle>>,
}

/// 命名连接
pub struct NamedConnection {
    /// 名称，只由所属注册表修改
    name: RwLock<String>,
    /// 驱动
    driver: Arc<dyn Driver>,
    /// 连接参数
    params: RwLock<Option<ConnectionParams>>,
    /// 状态与句柄
    link: RwLock<Link>,
    /// 状态转换锁，同一连接同时只有一次驱动调用
    transition: tokio::sync::Mutex<()>,
    /// 所属适配器的指标
    metrics: Option<Arc<LifecycleMetrics>>,
    /// 注册表归属
    membership: Membership,
}

impl NamedConnection {
    /// 创建未设置参数的连接
    pub fn new(name: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        Self {
            name: RwLock::new(name.into()),
            driver,
            params: RwLock::new(None),
            link: RwLock::new(Link {
                status: ConnectionStatus::Disconnected,
                handle: None,
            }),
            transition: tokio::sync::Mutex::new(()),
            metrics: None,
            membership: Membership::new(),
        }
    }

    /// 设置参数（构建时）
    pub fn with_params(self, params: ConnectionParams) -> Result<Self> {
        self.set_params(params)?;
        Ok(self)
    }

    /// 绑定指标
    pub fn with_metrics(mut self, metrics: Arc<LifecycleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 连接名称
    pub fn name(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 后端类型
    pub fn kind(&self) -> &str {
        self.driver.kind()
    }

    /// 设置参数
    ///
    /// 参数非法时返回 `InvalidArgument`。不影响已打开的句柄，新参数在下次建立连接时生效。
    pub fn set_params(&self, params: ConnectionParams) -> Result<()> {
        params.validate()?;
        let params = params.normalized(self.driver.scheme());
        *self.params.write().unwrap_or_else(PoisonError::into_inner) = Some(params);
        Ok(())
    }

    /// 当前参数
    pub fn params(&self) -> Option<ConnectionParams> {
        self.params
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 当前状态
    pub fn status(&self) -> ConnectionStatus {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// 当前驱动句柄
    pub fn handle(&self) -> Option<Arc<dyn DriverHandle>> {
        self.link
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handle
            .clone()
    }

    /// 是否已连接或正在连接
    ///
    /// 状态为已连接但驱动句柄已关闭时视为未连接。
    pub fn is_connected(&self) -> bool {
        let link = self.link.read().unwrap_or_else(PoisonError::into_inner);
        match link.status {
            ConnectionStatus::Connecting => true,
            ConnectionStatus::Connected => link
                .handle
                .as_ref()
                .is_some_and(|handle| handle.state().is_usable()),
            ConnectionStatus::Disconnected | ConnectionStatus::Disconnecting => false,
        }
    }

    fn set_link(&self, status: ConnectionStatus, handle: Option<Arc<dyn DriverHandle>>) {
        let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);
        link.status = status;
        link.handle = handle;
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.link
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .status = status;
    }

    // 丢弃驱动侧已失效的句柄
    fn release_stale_handle(&self) {
        let released = {
            let mut link = self.link.write().unwrap_or_else(PoisonError::into_inner);
            link.status = ConnectionStatus::Disconnected;
            link.handle.take().is_some()
        };
        if released {
            if let Some(metrics) = &self.metrics {
                metrics.record_released();
            }
            debug!(connection = %self.name(), "驱动句柄已失效，释放");
        }
    }

    /// 建立连接
    ///
    /// 已连接时直接成功，不调用驱动。另一次转换进行中时等待其结束后再判断：
    /// 若对方已连上则直接成功，否则自行尝试。
    pub async fn connect(&self) -> Result<()> {
        let name = self.name();
        if self.params().is_none() {
            return Err(SwiftDbError::invalid_argument(format!(
                "连接 \"{}\" 未设置参数",
                name
            )));
        }
        if self.status() == ConnectionStatus::Connected && self.is_connected() {
            return Ok(());
        }

        let _transition = self.transition.lock().await;

        // 等待期间可能已被改名
        let name = self.name();
        match self.status() {
            ConnectionStatus::Connected if self.is_connected() => {
                debug!(connection = %name, "连接已建立，跳过");
                return Ok(());
            }
            ConnectionStatus::Connected => self.release_stale_handle(),
            _ => {}
        }

        let Some(params) = self.params() else {
            return Err(SwiftDbError::invalid_argument(format!(
                "连接 \"{}\" 未设置参数",
                name
            )));
        };

        self.set_link(ConnectionStatus::Connecting, None);
        if let Some(metrics) = &self.metrics {
            metrics.record_connect_attempt();
        }
        debug!(connection = %name, kind = self.kind(), uri = params.uri(), "建立连接");

        let opened = self.driver.open(&params).await;
        let name = self.name();
        match opened {
            Ok(handle) => {
                self.set_link(ConnectionStatus::Connected, Some(handle));
                if let Some(metrics) = &self.metrics {
                    metrics.record_connected();
                }
                info!(connection = %name, kind = self.kind(), "连接已建立");
                Ok(())
            }
            Err(err) => {
                self.set_link(ConnectionStatus::Disconnected, None);
                if let Some(metrics) = &self.metrics {
                    metrics.record_connect_failure();
                }
                warn!(connection = %name, kind = self.kind(), error = %err, "建立连接失败");
                Err(SwiftDbError::connect(name, err))
            }
        }
    }

    /// 断开连接
    ///
    /// 未连接时直接成功。驱动关闭失败时保留句柄和已连接状态，可重试。
    pub async fn disconnect(&self) -> Result<()> {
        if self.status() == ConnectionStatus::Disconnected {
            return Ok(());
        }

        let _transition = self.transition.lock().await;

        let name = self.name();
        let Some(handle) = self.handle() else {
            self.set_status(ConnectionStatus::Disconnected);
            return Ok(());
        };
        if !handle.state().is_usable() {
            self.release_stale_handle();
            return Ok(());
        }

        self.set_status(ConnectionStatus::Disconnecting);
        debug!(connection = %name, kind = self.kind(), "断开连接");

        let closed = handle.close().await;
        let name = self.name();
        match closed {
            Ok(()) => {
                self.set_link(ConnectionStatus::Disconnected, None);
                if let Some(metrics) = &self.metrics {
                    metrics.record_disconnected();
                }
                info!(connection = %name, kind = self.kind(), "连接已断开");
                Ok(())
            }
            Err(err) => {
                self.set_status(ConnectionStatus::Connected);
                if let Some(metrics) = &self.metrics {
                    metrics.record_disconnect_failure();
                }
                warn!(connection = %name, kind = self.kind(), error = %err, "断开连接失败");
                Err(SwiftDbError::disconnect(name, err))
            }
        }
    }
}

impl fmt::Debug for NamedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedConnection")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("params", &self.params())
            .field("status", &self.status())
            .finish()
    }
}

#[async_trait]
impl RegistryEntry for NamedConnection {
    fn name(&self) -> String {
        NamedConnection::name(self)
    }

    fn assign_name(&self, name: &str, _token: RenameToken) {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name.to_string();
    }

    fn membership(&self) -> &Membership {
        &self.membership
    }

    async fn teardown(&self) -> Result<()> {
        self.disconnect().await
    }
}
