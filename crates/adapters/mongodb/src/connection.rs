//! MongoDB 连接管理

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use policy_errors::{AdapterError, AdapterResult};
use secrecy::ExposeSecret;
use tracing::debug;

use crate::{MongoConfig, map_connection_error};

/// 服务器选择超时
///
/// 取操作超时的 4/5，服务器不可达时先得到连接错误，而不是适配器的操作超时。
pub fn server_selection_timeout(operation_timeout: Duration) -> Duration {
    operation_timeout * 4 / 5
}

/// 创建 MongoDB 客户端，返回客户端和解析后的数据库名
///
/// 客户端是惰性连接的，需要配合 `check_connection` 验证连通性。
pub async fn create_client(config: &MongoConfig) -> AdapterResult<(Client, String)> {
    let mut options = ClientOptions::parse(config.url.expose_secret())
        .await
        .map_err(|e| AdapterError::connection(format!("Failed to parse MongoDB URL: {}", e)))?;

    options.connect_timeout = Some(config.timeout);
    options.server_selection_timeout = Some(server_selection_timeout(config.timeout));
    if let Some(ref app_name) = config.app_name {
        options.app_name = Some(app_name.clone());
    }

    let database = config.resolve_database(options.default_database.as_deref());
    debug!(database = %database, collection = %config.collection, "MongoDB client options parsed");

    let client = Client::with_options(options)
        .map_err(|e| AdapterError::connection(format!("Failed to create MongoDB client: {}", e)))?;

    Ok((client, database))
}

/// 检查 MongoDB 连接
pub async fn check_connection(database: &Database) -> AdapterResult<()> {
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| map_connection_error(e, "MongoDB health check failed"))?;
    Ok(())
}
