//! 驱动适配器
//!
//! 基于 [`Driver`] 的通用适配器，组合连接注册表与扇出执行器。

use crate::interface::DbAdapter;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock};
use swiftdb_config::AdapterConfig;
use swiftdb_core::registry::validate_name;
use swiftdb_core::{
    ConnectionParams, Driver, LifecycleMetrics, Membership, NamedConnection, Registry,
    RegistryEntry, RenameToken, Result, SwiftDbError, fan_out,
};
use tracing::{debug, info};

/// 驱动适配器
pub struct Adapter {
    /// 适配器名称
    name: RwLock<String>,
    /// 后端驱动
    driver: Arc<dyn Driver>,
    /// 连接注册表
    connections: Registry<NamedConnection>,
    /// 连接指标
    metrics: Arc<LifecycleMetrics>,
    /// 注册表归属
    membership: Membership,
}

impl Adapter {
    /// 创建新的适配器
    pub fn new(name: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        Self {
            name: RwLock::new(name.into()),
            driver,
            connections: Registry::new("连接"),
            metrics: Arc::new(LifecycleMetrics::new()),
            membership: Membership::new(),
        }
    }

    /// 按配置创建适配器及其连接
    ///
    /// 配置中的后端类型必须与驱动一致。
    pub fn from_config(config: &AdapterConfig, driver: Arc<dyn Driver>) -> Result<Self> {
        if config.kind != driver.kind() {
            return Err(SwiftDbError::invalid_argument(format!(
                "适配器 \"{}\" 的类型 {} 与驱动类型 {} 不一致",
                config.name,
                config.kind,
                driver.kind()
            )));
        }

        let adapter = Self::new(config.name.clone(), driver);
        for connection in &config.connections {
            adapter
                .create_connection(ConnectionParams::from(connection), Some(&connection.name))
                .map_err(|e| e.with_context(("adapter", config.name.clone())))?;
        }
        Ok(adapter)
    }

    /// 后端驱动
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    fn lookup(&self, name: &str) -> Result<Arc<NamedConnection>> {
        validate_name("连接", name)?;
        self.connections.get(name).ok_or_else(|| {
            SwiftDbError::not_found(format!(
                "适配器 \"{}\" 中的连接 \"{}\"",
                RegistryEntry::name(self),
                name
            ))
        })
    }

    /// 生成报告
    pub fn report(&self) -> String {
        let connected = self
            .connections
            .snapshot()
            .iter()
            .filter(|(_, conn)| conn.is_connected())
            .count();
        format!(
            "适配器 {} ({}):\n\
             - 连接数: {} (已连接 {})\n\
             - {}",
            RegistryEntry::name(self),
            self.driver.kind(),
            self.connections.len(),
            connected,
            self.metrics.summary()
        )
    }
}

#[async_trait]
impl RegistryEntry for Adapter {
    fn name(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
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

#[async_trait]
impl DbAdapter for Adapter {
    fn kind(&self) -> &str {
        self.driver.kind()
    }

    fn create_connection(
        &self,
        params: ConnectionParams,
        name: Option<&str>,
    ) -> Result<Arc<NamedConnection>> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self
                .connections
                .generate_name(&format!("{}_connection", self.driver.kind())),
        };

        let connection = NamedConnection::new(name.clone(), Arc::clone(&self.driver))
            .with_params(params)?
            .with_metrics(Arc::clone(&self.metrics));
        let connection = self.connections.add(&name, Arc::new(connection))?;

        debug!(adapter = %RegistryEntry::name(self), connection = %name, "创建连接");
        Ok(connection)
    }

    fn get_connection(&self, name: &str) -> Option<Arc<NamedConnection>> {
        self.connections.get(name)
    }

    fn get_all_connections(&self) -> IndexMap<String, Arc<NamedConnection>> {
        self.connections.get_all()
    }

    fn rename_connection(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.connections.rename(old_name, new_name)
    }

    fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn is_connected(&self, name: &str) -> Result<bool> {
        Ok(self.lookup(name)?.is_connected())
    }

    fn metrics(&self) -> &LifecycleMetrics {
        &self.metrics
    }

    async fn connect(&self) -> Result<()> {
        let name = RegistryEntry::name(self);
        let message = format!("适配器 \"{}\" 建立连接时出现错误", name);
        let result = fan_out(self.connections.snapshot(), &message, |_, conn| async move {
            conn.connect().await
        })
        .await;

        if result.is_ok() {
            info!(adapter = %name, connections = self.connections.len(), "适配器连接已全部建立");
        }
        result
    }

    async fn disconnect(&self) -> Result<()> {
        let name = RegistryEntry::name(self);
        let message = format!("适配器 \"{}\" 断开连接时出现错误", name);
        let result = fan_out(self.connections.snapshot(), &message, |_, conn| async move {
            conn.disconnect().await
        })
        .await;

        if result.is_ok() {
            info!(adapter = %name, "适配器连接已全部断开");
        }
        result
    }

    async fn connect_one(&self, name: &str) -> Result<()> {
        self.lookup(name)?.connect().await
    }

    async fn disconnect_one(&self, name: &str) -> Result<()> {
        self.lookup(name)?.disconnect().await
    }

    async fn remove_connection(&self, name: &str) -> Result<bool> {
        self.connections.remove(name).await
    }

    async fn remove_all_connections(&self) -> Result<()> {
        self.connections.remove_all().await
    }
}
