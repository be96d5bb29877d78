//! MongoDB 策略适配器入口

use mongodb::Client;
use policy_adapter_core::{Adapter, AdapterOptions};
use policy_errors::AdapterResult;
use secrecy::ExposeSecret;
use tracing::info;

use crate::{MongoConfig, MongoRuleStore};

/// 基于 MongoDB 的策略适配器
pub type MongoAdapter = Adapter<MongoRuleStore>;

/// 按配置连接 MongoDB 并打开适配器
///
/// 连接、连通性检查或唯一索引创建失败时返回错误，不会返回部分初始化的适配器。
pub async fn open_adapter(config: &MongoConfig) -> AdapterResult<MongoAdapter> {
    let store = MongoRuleStore::connect(config).await?;

    info!(
        url = %redact_url(config.url.expose_secret()),
        collection = %config.collection,
        "Opening MongoDB policy adapter"
    );
    Adapter::open(store, config.adapter_options()).await
}

/// 使用调用方已有的客户端打开适配器
///
/// 适配器关闭时会关闭该客户端。
pub async fn open_adapter_with_client(
    client: Client,
    database: &str,
    collection: &str,
    options: AdapterOptions,
) -> AdapterResult<MongoAdapter> {
    let store = MongoRuleStore::with_client(client, database, collection);
    Adapter::open(store, options).await
}

/// 去掉 URL 中的用户名和密码
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let host_start = rest.find('/').unwrap_or(rest.len());
    match rest[..host_start].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => url.to_string(),
    }
}
