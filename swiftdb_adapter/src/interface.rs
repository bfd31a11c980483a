//! 适配器能力接口
//!
//! 管理器和宿主应用只通过这个 trait 使用适配器，每种后端的具体适配器
//! 各自实现它。

use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use swiftdb_core::{
    ConnectionParams, LifecycleMetrics, NamedConnection, RegistryEntry, Result,
};

/// 数据库适配器
///
/// 一组同类后端的命名连接。名称由所属管理器的注册表维护（见 [`RegistryEntry`]），
/// 移除适配器前会调用其 `teardown`，即断开全部连接。
#[async_trait]
pub trait DbAdapter: RegistryEntry {
    /// 后端类型标签
    fn kind(&self) -> &str;

    /// 创建并注册连接
    ///
    /// 省略名称时自动生成。参数非法返回 `InvalidArgument`，名称冲突返回 `DuplicateName`。
    fn create_connection(
        &self,
        params: ConnectionParams,
        name: Option<&str>,
    ) -> Result<Arc<NamedConnection>>;

    /// 获取连接
    fn get_connection(&self, name: &str) -> Option<Arc<NamedConnection>>;

    /// 所有连接的副本
    fn get_all_connections(&self) -> IndexMap<String, Arc<NamedConnection>>;

    /// 获取连接参数
    fn get_connection_params(&self, name: &str) -> Option<ConnectionParams> {
        self.get_connection(name).and_then(|conn| conn.params())
    }

    /// 连接改名
    fn rename_connection(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// 连接数量
    fn connection_count(&self) -> usize;

    /// 指定连接是否已连接
    fn is_connected(&self, name: &str) -> Result<bool>;

    /// 生命周期指标
    fn metrics(&self) -> &LifecycleMetrics;

    /// 建立全部连接
    async fn connect(&self) -> Result<()>;

    /// 断开全部连接
    async fn disconnect(&self) -> Result<()>;

    /// 建立单个连接
    async fn connect_one(&self, name: &str) -> Result<()>;

    /// 断开单个连接
    async fn disconnect_one(&self, name: &str) -> Result<()>;

    /// 断开并移除连接，名称不存在时返回 `false`
    async fn remove_connection(&self, name: &str) -> Result<bool>;

    /// 断开并移除全部连接
    async fn remove_all_connections(&self) -> Result<()>;
}

impl fmt::Debug for dyn DbAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbAdapter")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("connections", &self.connection_count())
            .finish()
    }
}
