//! 配置管理系统
//!
//! 描述适配器与命名连接的 TOML 配置，支持环境变量覆盖连接 URI。
//!
//! ```toml
//! [[adapters]]
//! name = "main"
//! kind = "mongo"
//!
//! [[adapters.connections]]
//! name = "users"
//! uri = "localhost:27017/users"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// 环境变量前缀：`SWIFTDB_URI__<ADAPTER>__<CONNECTION>`
pub const URI_ENV_PREFIX: &str = "SWIFTDB_URI";

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析配置文件失败: {0}")]
    Parse(String),

    /// 验证错误
    #[error("配置验证失败: {0}")]
    Validation(String),

    /// 环境变量错误
    #[error("环境变量解析失败: {0}")]
    EnvVar(String),
}

/// 配置 Result 类型
pub type Result<T> = std::result::Result<T, ConfigError>;

/// 数据库配置根节点
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DbConfig {
    /// 适配器列表
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
}

/// 单个适配器配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// 适配器名称
    pub name: String,

    /// 后端类型（如 "mongo"）
    pub kind: String,

    /// 该适配器拥有的连接
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// 单个连接配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// 连接名称
    pub name: String,

    /// 连接 URI
    pub uri: String,

    /// 后端特定选项
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl DbConfig {
    /// 从 TOML 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 从环境变量覆盖连接 URI
    ///
    /// 变量名形如 `SWIFTDB_URI__MAIN__USERS`，适配器名和连接名转为大写，
    /// 其中的 `-` 替换为 `_`。
    pub fn load_with_env_override(mut self) -> Result<Self> {
        for adapter in &mut self.adapters {
            for connection in &mut adapter.connections {
                let key = uri_env_key(&adapter.name, &connection.name);
                match std::env::var(&key) {
                    Ok(uri) => connection.uri = uri,
                    Err(std::env::VarError::NotPresent) => {}
                    Err(std::env::VarError::NotUnicode(_)) => {
                        return Err(ConfigError::EnvVar(format!("{} 不是有效的 UTF-8", key)));
                    }
                }
            }
        }

        Ok(self)
    }

    /// 从文件加载并应用环境变量覆盖
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file(path)?.load_with_env_override()
    }

    /// 验证配置是否有效
    pub fn validate(&self) -> Result<()> {
        let mut adapter_names = HashSet::new();

        for adapter in &self.adapters {
            if adapter.name.trim().is_empty() {
                return Err(ConfigError::Validation("适配器名称不能为空".to_string()));
            }
            if adapter.kind.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "适配器 {} 的类型不能为空",
                    adapter.name
                )));
            }
            if !adapter_names.insert(adapter.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "适配器名称重复: {}",
                    adapter.name
                )));
            }

            let mut connection_names = HashSet::new();
            for connection in &adapter.connections {
                if connection.name.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "适配器 {} 中存在空的连接名称",
                        adapter.name
                    )));
                }
                if !connection_names.insert(connection.name.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "适配器 {} 中连接名称重复: {}",
                        adapter.name, connection.name
                    )));
                }
                if connection.uri.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "连接 {}.{} 的 URI 不能为空",
                        adapter.name, connection.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// 连接总数
    pub fn connection_count(&self) -> usize {
        self.adapters.iter().map(|a| a.connections.len()).sum()
    }

    /// 获取配置摘要信息
    pub fn summary(&self) -> String {
        let mut out = format!(
            "SwiftDB 配置:\n  适配器数: {}\n  连接数: {}",
            self.adapters.len(),
            self.connection_count()
        );
        for adapter in &self.adapters {
            out.push_str(&format!(
                "\n  - {} ({}): {} 个连接",
                adapter.name,
                adapter.kind,
                adapter.connections.len()
            ));
        }
        out
    }
}

/// 计算连接 URI 覆盖所用的环境变量名
pub fn uri_env_key(adapter: &str, connection: &str) -> String {
    format!(
        "{}__{}__{}",
        URI_ENV_PREFIX,
        env_segment(adapter),
        env_segment(connection)
    )
}

fn env_segment(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}
