//! 命名注册表
//!
//! 名称到条目的映射，连接（适配器内）和适配器（管理器内）共用同一实现。
//!
//! 不变式：每个键都等于其条目的 `name()`，且名称唯一。改名只能经由
//! [`Registry::rename`]，条目本身不提供独立的改名入口。

use crate::error::{Result, SwiftDbError};
use crate::fanout::fan_out;
use crate::naming::NameGenerator;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// 改名凭证
///
/// 只有注册表能构造，用于限制 [`RegistryEntry::assign_name`] 的调用方。
#[derive(Debug)]
pub struct RenameToken {
    _private: (),
}

/// 注册表归属标记
///
/// 条目同一时间只能属于一个注册表，只有注册表能改变归属。
#[derive(Debug, Default)]
pub struct Membership {
    owned: AtomicBool,
}

impl Membership {
    /// 创建未归属的标记
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否已归属某个注册表
    pub fn is_owned(&self) -> bool {
        self.owned.load(Ordering::SeqCst)
    }

    fn claim(&self) -> bool {
        self.owned
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn release(&self) {
        self.owned.store(false, Ordering::SeqCst);
    }
}

/// 可放入注册表的条目
#[async_trait]
pub trait RegistryEntry: Send + Sync {
    /// 当前名称
    fn name(&self) -> String;

    /// 由注册表写入新名称
    fn assign_name(&self, name: &str, token: RenameToken);

    /// 归属标记
    fn membership(&self) -> &Membership;

    /// 移除前的清理（连接为断开，适配器为断开全部连接）
    ///
    /// 失败时条目保留在注册表中。
    async fn teardown(&self) -> Result<()>;
}

/// 校验名称
pub fn validate_name(label: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SwiftDbError::invalid_argument(format!("{}名称不能为空", label)));
    }
    Ok(())
}

/// 命名注册表
pub struct Registry<T: ?Sized + RegistryEntry> {
    /// 条目类别，用于错误消息（如 "连接"、"适配器"）
    label: &'static str,
    /// 有序映射: 名称 -> 条目
    entries: RwLock<IndexMap<String, Arc<T>>>,
    /// 自动命名计数器
    names: NameGenerator,
}

impl<T: ?Sized + RegistryEntry> Registry<T> {
    /// 创建新的注册表
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: RwLock::new(IndexMap::new()),
            names: NameGenerator::new(),
        }
    }

    // 临界区内只做映射的单步修改，锁被污染时映射仍是一致的
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// 添加条目
    ///
    /// 名称会写入条目，保证键与条目名称一致。
    pub fn add(&self, name: &str, item: Arc<T>) -> Result<Arc<T>> {
        validate_name(self.label, name)?;

        let mut entries = self.write();
        if entries.contains_key(name) {
            return Err(SwiftDbError::duplicate_name(format!(
                "{} \"{}\" 已存在",
                self.label, name
            )));
        }
        // 同一注册表内重复添加也会在这里被拒绝
        if !item.membership().claim() {
            return Err(SwiftDbError::invalid_argument(format!(
                "{} \"{}\" 已注册到某个注册表",
                self.label,
                item.name()
            )));
        }

        item.assign_name(name, RenameToken { _private: () });
        entries.insert(name.to_string(), Arc::clone(&item));
        debug!(label = self.label, name, "注册表添加条目");
        Ok(item)
    }

    /// 获取条目
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.read().get(name).cloned()
    }

    /// 检查名称是否存在
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// 条目数量
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 所有名称（按枚举顺序）
    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// 有序快照，供扇出执行器使用
    pub fn snapshot(&self) -> Vec<(String, Arc<T>)> {
        self.read()
            .iter()
            .map(|(name, item)| (name.clone(), Arc::clone(item)))
            .collect()
    }

    /// 名称到条目的副本，修改副本不影响注册表
    pub fn get_all(&self) -> IndexMap<String, Arc<T>> {
        self.read().clone()
    }

    /// 改名
    ///
    /// 在同一把写锁内完成删除旧键、写入条目名称和插入新键，且保持枚举位置，
    /// 外部读取不会观察到中间状态。
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        validate_name(self.label, new_name)?;

        let mut entries = self.write();
        let Some(index) = entries.get_index_of(old_name) else {
            return Err(SwiftDbError::not_found(format!(
                "{} \"{}\"",
                self.label, old_name
            )));
        };
        if old_name == new_name {
            return Ok(());
        }
        if entries.contains_key(new_name) {
            return Err(SwiftDbError::duplicate_name(format!(
                "{} \"{}\" 已存在",
                self.label, new_name
            )));
        }

        if let Some((_, item)) = entries.shift_remove_index(index) {
            item.assign_name(new_name, RenameToken { _private: () });
            entries.shift_insert(index, new_name.to_string(), item);
        }
        debug!(label = self.label, old_name, new_name, "注册表改名");
        Ok(())
    }

    /// 移除条目
    ///
    /// 名称不存在时直接成功并返回 `false`。先执行条目的清理，清理成功后才删除；
    /// 清理失败时条目保留并返回错误。
    pub async fn remove(&self, name: &str) -> Result<bool> {
        validate_name(self.label, name)?;

        let Some(item) = self.get(name) else {
            return Ok(false);
        };
        self.remove_entry(item).await?;
        Ok(true)
    }

    /// 移除所有条目
    ///
    /// 并发移除快照中的每一项，移除失败的条目保留在注册表中。
    pub async fn remove_all(&self) -> Result<()> {
        let message = format!("移除{}时出现错误", self.label);
        fan_out(self.snapshot(), &message, |_, item| self.remove_entry(item)).await
    }

    // 清理期间不持有锁，清理后按身份删除，期间发生的改名不影响删除
    async fn remove_entry(&self, item: Arc<T>) -> Result<()> {
        item.teardown().await?;

        let mut entries = self.write();
        if let Some(index) = entries
            .values()
            .position(|existing| Arc::ptr_eq(existing, &item))
        {
            entries.shift_remove_index(index);
            item.membership().release();
        }
        debug!(label = self.label, name = %item.name(), "注册表移除条目");
        Ok(())
    }

    /// 生成一个当前未被占用的名称
    pub fn generate_name(&self, prefix: &str) -> String {
        loop {
            let candidate = self.names.next(prefix);
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// 条目类别
    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct Item {
        name: Mutex<String>,
        fail_teardown: AtomicBool,
        membership: Membership,
    }

    impl Item {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: Mutex::new(name.to_string()),
                fail_teardown: AtomicBool::new(false),
                membership: Membership::new(),
            })
        }
    }

    #[async_trait]
    impl RegistryEntry for Item {
        fn name(&self) -> String {
            self.name.lock().unwrap().clone()
        }

        fn assign_name(&self, name: &str, _token: RenameToken) {
            *self.name.lock().unwrap() = name.to_string();
        }

        fn membership(&self) -> &Membership {
            &self.membership
        }

        async fn teardown(&self) -> Result<()> {
            if self.fail_teardown.load(Ordering::SeqCst) {
                Err(SwiftDbError::disconnect(self.name(), DriverError::new("busy")))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_add_and_get() {
        let registry = Registry::new("连接");
        registry.add("a", Item::new("a")).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().name(), "a");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_add_assigns_key_as_name() {
        let registry = Registry::new("连接");
        let item = registry.add("users", Item::new("tmp")).unwrap();
        assert_eq!(item.name(), "users");
    }

    #[test]
    fn test_add_duplicate_leaves_registry_unchanged() {
        let registry = Registry::new("连接");
        let first = registry.add("a", Item::new("a")).unwrap();
        let err = registry.add("a", Item::new("a")).unwrap_err();
        assert!(matches!(err, SwiftDbError::DuplicateName(_)));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.get("a").unwrap(), &first));
    }

    #[test]
    fn test_add_same_item_twice_is_rejected() {
        let registry = Registry::new("连接");
        let item = registry.add("a", Item::new("a")).unwrap();
        let err = registry.add("b", item.clone()).unwrap_err();
        assert!(matches!(err, SwiftDbError::InvalidArgument(_)));
        assert_eq!(item.name(), "a");
    }

    #[test]
    fn test_item_belongs_to_one_registry() {
        let first = Registry::new("适配器");
        let second = Registry::new("适配器");
        let item = first.add("main", Item::new("main")).unwrap();

        let err = second.add("main", item.clone()).unwrap_err();
        assert!(matches!(err, SwiftDbError::InvalidArgument(_)));
        assert!(second.is_empty());

        // 改名后两边的键与名称仍然一致
        first.rename("main", "primary").unwrap();
        assert_eq!(first.get("primary").unwrap().name(), "primary");
        assert!(second.get("main").is_none());
    }

    #[tokio::test]
    async fn test_removed_item_can_be_added_again() {
        let first = Registry::new("适配器");
        let second = Registry::new("适配器");
        let item = first.add("main", Item::new("main")).unwrap();
        assert!(item.membership().is_owned());

        assert!(first.remove("main").await.unwrap());
        assert!(!item.membership().is_owned());

        second.add("other", item.clone()).unwrap();
        assert_eq!(item.name(), "other");
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_membership() {
        let first = Registry::new("适配器");
        let second = Registry::new("适配器");
        let item = first.add("main", Item::new("main")).unwrap();
        item.fail_teardown.store(true, Ordering::SeqCst);

        assert!(first.remove("main").await.is_err());
        assert!(second.add("main", item.clone()).is_err());
    }

    #[test]
    fn test_add_empty_name() {
        let registry = Registry::new("连接");
        let err = registry.add("  ", Item::new("x")).unwrap_err();
        assert!(matches!(err, SwiftDbError::InvalidArgument(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_all_is_a_copy() {
        let registry = Registry::new("连接");
        registry.add("a", Item::new("a")).unwrap();
        let mut all = registry.get_all();
        all.shift_remove("a");
        assert!(registry.contains("a"));
    }

    #[test]
    fn test_rename() {
        let registry = Registry::new("连接");
        let item = registry.add("a", Item::new("a")).unwrap();
        registry.add("z", Item::new("z")).unwrap();

        registry.rename("a", "b").unwrap();

        assert!(registry.get("a").is_none());
        let renamed = registry.get("b").unwrap();
        assert!(Arc::ptr_eq(&renamed, &item));
        assert_eq!(renamed.name(), "b");
        // 位置保持不变
        assert_eq!(registry.names(), vec!["b", "z"]);
    }

    #[test]
    fn test_rename_errors() {
        let registry = Registry::new("连接");
        registry.add("a", Item::new("a")).unwrap();
        registry.add("b", Item::new("b")).unwrap();

        let err = registry.rename("missing", "c").unwrap_err();
        assert!(matches!(err, SwiftDbError::NotFound(_)));

        let err = registry.rename("a", "b").unwrap_err();
        assert!(matches!(err, SwiftDbError::DuplicateName(_)));
        assert_eq!(registry.get("a").unwrap().name(), "a");
        assert_eq!(registry.get("b").unwrap().name(), "b");

        let err = registry.rename("a", "").unwrap_err();
        assert!(matches!(err, SwiftDbError::InvalidArgument(_)));
    }

    #[test]
    fn test_rename_to_same_name() {
        let registry = Registry::new("连接");
        registry.add("a", Item::new("a")).unwrap();
        assert!(registry.rename("a", "a").is_ok());
        assert!(registry.contains("a"));
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let registry: Registry<Item> = Registry::new("连接");
        assert!(!registry.remove("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = Registry::new("连接");
        registry.add("a", Item::new("a")).unwrap();
        assert!(registry.remove("a").await.unwrap());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_keeps_entry_on_teardown_failure() {
        let registry = Registry::new("连接");
        let item = registry.add("a", Item::new("a")).unwrap();
        item.fail_teardown.store(true, Ordering::SeqCst);

        let err = registry.remove("a").await.unwrap_err();
        assert!(matches!(err, SwiftDbError::Disconnect { .. }));
        assert!(registry.contains("a"));
    }

    #[tokio::test]
    async fn test_remove_all_keeps_failed_entries() {
        let registry = Registry::new("连接");
        registry.add("a", Item::new("a")).unwrap();
        let b = registry.add("b", Item::new("b")).unwrap();
        registry.add("c", Item::new("c")).unwrap();
        b.fail_teardown.store(true, Ordering::SeqCst);

        let err = registry.remove_all().await.unwrap_err();
        assert_eq!(err.as_multi().unwrap().len(), 1);
        assert_eq!(registry.names(), vec!["b"]);
    }

    #[test]
    fn test_generate_name_skips_taken() {
        let registry = Registry::new("连接");
        registry.add("conn_1", Item::new("conn_1")).unwrap();
        assert_eq!(registry.generate_name("conn"), "conn_2");
        assert_eq!(registry.generate_name("conn"), "conn_3");
    }
}
