//! MongoDB 配置模块

use std::time::Duration;

use policy_adapter_core::{AdapterOptions, DEFAULT_TIMEOUT};
use policy_config::MongoSettings;
use secrecy::Secret;

/// 默认数据库名
pub const DEFAULT_DATABASE: &str = "casbin";

/// 默认集合名
pub const DEFAULT_COLLECTION: &str = "casbin_rule";

/// MongoDB 配置
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// 连接 URL
    pub url: Secret<String>,
    /// 数据库名，未设置时使用 URL 中的数据库
    pub database: Option<String>,
    /// 集合名
    pub collection: String,
    /// 连接超时、服务器选择超时以及单次操作超时
    pub timeout: Duration,
    /// 初始过滤标记
    pub filtered: bool,
    /// 应用名称（用于连接标识）
    pub app_name: Option<String>,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: Secret::new("mongodb://127.0.0.1:27017".to_string()),
            database: None,
            collection: DEFAULT_COLLECTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            filtered: false,
            app_name: None,
        }
    }
}

impl MongoConfig {
    /// 从 URL 创建配置
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Secret::new(url.into()),
            ..Default::default()
        }
    }

    /// 从配置文件创建
    pub fn from_settings(settings: &MongoSettings) -> Self {
        Self {
            url: settings.url.clone(),
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            timeout: settings.timeout(),
            filtered: settings.filtered,
            app_name: settings.app_name.clone(),
        }
    }

    /// 设置数据库名
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// 设置集合名
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// 设置超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 设置初始过滤标记
    pub fn with_filtered(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }

    /// 设置应用名称
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// 确定数据库名：显式配置 > URL 中的数据库 > "casbin"
    pub fn resolve_database(&self, url_database: Option<&str>) -> String {
        self.database
            .as_deref()
            .or(url_database)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DATABASE)
            .to_string()
    }

    /// 适配器选项
    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions::new()
            .with_timeout(self.timeout)
            .with_filtered(self.filtered)
    }
}
