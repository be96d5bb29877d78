//! policy-config - 配置加载库

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;

use secrecy::Secret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

/// MongoDB 配置
#[derive(Debug, Clone, Deserialize)]
pub struct MongoSettings {
    pub url: Secret<String>,
    /// 未设置时使用 URL 中的数据库，URL 中也没有则使用 "casbin"
    pub database: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub filtered: bool,
    pub app_name: Option<String>,
}

fn default_collection() -> String {
    "casbin_rule".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl MongoSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

/// 适配器配置
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterSettings {
    pub mongo: MongoSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl AdapterSettings {
    /// 从配置文件和环境变量加载配置
    ///
    /// 依次合并 `default.toml`、`{APP_ENV}.toml` 和 `POLICY_` 前缀的环境变量，
    /// 嵌套键用 `__` 分隔，例如 `POLICY_MONGO__TIMEOUT_SECS`。
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("POLICY_").split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests;
