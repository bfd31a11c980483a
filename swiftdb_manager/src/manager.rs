//! 适配器管理器
//!
//! 宿主应用的入口。维护后端驱动与适配器注册表，对全部适配器批量建立或断开连接。

use crate::middleware::Connector;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use swiftdb_adapter::{Adapter, DbAdapter};
use swiftdb_config::DbConfig;
use swiftdb_core::registry::validate_name;
use swiftdb_core::{Driver, Registry, Result, SwiftDbError, fan_out};
use tracing::{debug, info};

/// 适配器管理器
pub struct DbManager {
    /// 已注册的后端驱动，按类型索引
    drivers: RwLock<IndexMap<String, Arc<dyn Driver>>>,
    /// 适配器注册表
    adapters: Registry<dyn DbAdapter>,
}

impl DbManager {
    /// 创建空的管理器
    pub fn new() -> Self {
        Self {
            drivers: RwLock::new(IndexMap::new()),
            adapters: Registry::new("适配器"),
        }
    }

    /// 注册驱动并按配置创建适配器
    pub fn from_config(
        config: &DbConfig,
        drivers: impl IntoIterator<Item = Arc<dyn Driver>>,
    ) -> Result<Self> {
        let manager = Self::new();
        for driver in drivers {
            manager.register_kind(driver)?;
        }
        manager.load_config(config)?;
        Ok(manager)
    }

    fn drivers(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<dyn Driver>>> {
        self.drivers.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 注册后端驱动
    ///
    /// 同一类型只能注册一次。
    pub fn register_kind(&self, driver: Arc<dyn Driver>) -> Result<()> {
        let kind = driver.kind().to_string();
        validate_name("后端类型", &kind)?;

        let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
        if drivers.contains_key(&kind) {
            return Err(SwiftDbError::duplicate_name(format!("后端类型 \"{}\" 已注册", kind)));
        }
        drivers.insert(kind.clone(), driver);
        debug!(kind = %kind, "注册后端类型");
        Ok(())
    }

    /// 已注册的后端类型
    pub fn kinds(&self) -> Vec<String> {
        self.drivers().keys().cloned().collect()
    }

    fn driver(&self, kind: &str) -> Result<Arc<dyn Driver>> {
        self.drivers()
            .get(kind)
            .cloned()
            .ok_or_else(|| SwiftDbError::unsupported_kind(kind))
    }

    /// 创建并注册指定类型的适配器
    ///
    /// 省略名称时自动生成。类型未注册返回 `UnsupportedKind`，名称冲突返回 `DuplicateName`。
    pub fn create_adapter(&self, kind: &str, name: Option<&str>) -> Result<Arc<dyn DbAdapter>> {
        let driver = self.driver(kind)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => self.adapters.generate_name(&format!("{}_adapter", kind)),
        };

        let adapter: Arc<dyn DbAdapter> = Arc::new(Adapter::new(name.clone(), driver));
        let adapter = self.adapters.add(&name, adapter)?;
        info!(adapter = %name, kind = %kind, "创建适配器");
        Ok(adapter)
    }

    /// 注册已有的适配器，使用其当前名称
    ///
    /// 名称冲突返回 `DuplicateName`，适配器已属于某个管理器时返回 `InvalidArgument`。
    pub fn add_adapter(&self, adapter: Arc<dyn DbAdapter>) -> Result<Arc<dyn DbAdapter>> {
        let name = adapter.name();
        let adapter = self.adapters.add(&name, adapter)?;
        info!(adapter = %name, kind = %adapter.kind(), "添加适配器");
        Ok(adapter)
    }

    /// 获取适配器
    pub fn get_adapter(&self, name: &str) -> Option<Arc<dyn DbAdapter>> {
        self.adapters.get(name)
    }

    /// 所有适配器的副本
    pub fn get_all_adapters(&self) -> IndexMap<String, Arc<dyn DbAdapter>> {
        self.adapters.get_all()
    }

    /// 适配器改名
    pub fn rename_adapter(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.adapters.rename(old_name, new_name)
    }

    /// 适配器数量
    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// 断开并移除适配器，名称不存在时返回 `false`
    pub async fn remove_adapter(&self, name: &str) -> Result<bool> {
        self.adapters.remove(name).await
    }

    /// 断开并移除全部适配器
    pub async fn remove_all_adapters(&self) -> Result<()> {
        self.adapters.remove_all().await
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn DbAdapter>> {
        validate_name("适配器", name)?;
        self.adapters
            .get(name)
            .ok_or_else(|| SwiftDbError::not_found(format!("适配器 \"{}\"", name)))
    }

    /// 所有适配器建立连接
    pub async fn connect(&self) -> Result<()> {
        let result = fan_out(
            self.adapters.snapshot(),
            "建立数据库连接时出现错误",
            |_, adapter| async move { adapter.connect().await },
        )
        .await;

        if result.is_ok() {
            debug!(adapters = self.adapters.len(), "全部适配器已连接");
        }
        result
    }

    /// 所有适配器断开连接
    pub async fn disconnect(&self) -> Result<()> {
        let result = fan_out(
            self.adapters.snapshot(),
            "断开数据库连接时出现错误",
            |_, adapter| async move { adapter.disconnect().await },
        )
        .await;

        if result.is_ok() {
            info!(adapters = self.adapters.len(), "全部适配器已断开");
        }
        result
    }

    /// 指定适配器建立连接
    pub async fn connect_one(&self, name: &str) -> Result<()> {
        self.lookup(name)?.connect().await
    }

    /// 指定适配器断开连接
    pub async fn disconnect_one(&self, name: &str) -> Result<()> {
        self.lookup(name)?.disconnect().await
    }

    /// 按配置创建适配器与连接
    ///
    /// 先校验配置并确认全部类型已注册、名称未占用，之后才开始创建。
    pub fn load_config(&self, config: &DbConfig) -> Result<()> {
        config.validate()?;

        let mut planned = Vec::with_capacity(config.adapters.len());
        for adapter in &config.adapters {
            let driver = self.driver(&adapter.kind)?;
            if self.adapters.contains(&adapter.name) {
                return Err(SwiftDbError::duplicate_name(format!(
                    "适配器 \"{}\" 已存在",
                    adapter.name
                )));
            }
            planned.push(Adapter::from_config(adapter, driver)?);
        }

        for adapter in planned {
            self.add_adapter(Arc::new(adapter))?;
        }
        info!(
            adapters = config.adapters.len(),
            connections = config.connection_count(),
            "已加载数据库配置"
        );
        Ok(())
    }

    /// 请求管线的连接中间件
    pub fn connector(self: &Arc<Self>) -> Connector {
        Connector::new(Arc::clone(self))
    }

    /// 生成报告
    pub fn report(&self) -> String {
        let mut report = format!(
            "数据库管理器:\n\
             - 后端类型: {}\n\
             - 适配器数: {}",
            self.kinds().join(", "),
            self.adapters.len()
        );
        for (name, adapter) in self.adapters.snapshot() {
            let connected = adapter
                .get_all_connections()
                .values()
                .filter(|conn| conn.is_connected())
                .count();
            report.push_str(&format!(
                "\n  * {} ({}): 连接 {} (已连接 {}), {}",
                name,
                adapter.kind(),
                adapter.connection_count(),
                connected,
                adapter.metrics().summary()
            ));
        }
        report
    }
}

impl Default for DbManager {
    fn default() -> Self {
        Self::new()
    }
}
