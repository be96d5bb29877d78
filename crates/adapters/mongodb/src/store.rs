//! MongoDB 规则存储实现

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::Document;
use mongodb::{Client, Collection, Database};
use policy_domain::{PolicyRule, RuleSelector};
use policy_errors::AdapterResult;
use policy_ports::RuleStore;
use tracing::{debug, info};

use crate::{
    MongoConfig, RuleDocument, check_connection, create_client, is_namespace_not_found,
    map_index_error, map_read_error, map_write_error, rule_filter, selector_filter,
    unique_index_model,
};

/// MongoDB 规则存储
///
/// 客户端内部维护连接池，克隆开销很小。
#[derive(Clone)]
pub struct MongoRuleStore {
    client: Client,
    database: Database,
    collection: Collection<RuleDocument>,
}

impl MongoRuleStore {
    /// 按配置建立连接
    pub async fn connect(config: &MongoConfig) -> AdapterResult<Self> {
        let (client, database) = create_client(config).await?;
        Ok(Self::with_client(client, &database, &config.collection))
    }

    /// 使用已有客户端
    pub fn with_client(client: Client, database: &str, collection: &str) -> Self {
        let database = client.database(database);
        let collection = database.collection::<RuleDocument>(collection);
        Self {
            client,
            database,
            collection,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn collection(&self) -> &Collection<RuleDocument> {
        &self.collection
    }

    pub(crate) async fn find_documents(&self, filter: Document) -> AdapterResult<Vec<PolicyRule>> {
        let cursor = self
            .collection
            .find(filter)
            .await
            .map_err(|e| map_read_error(e, "Failed to query policy rules"))?;

        let documents: Vec<RuleDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| map_read_error(e, "Failed to decode policy rule"))?;

        Ok(documents.into_iter().map(PolicyRule::from).collect())
    }
}

#[async_trait]
impl RuleStore for MongoRuleStore {
    type Filter = Document;

    async fn ensure_unique_index(&self) -> AdapterResult<()> {
        let index = self
            .collection
            .create_index(unique_index_model())
            .await
            .map_err(|e| map_index_error(e, "Failed to create unique index"))?;

        debug!(
            collection = %self.collection.name(),
            index = %index.index_name,
            "Unique index ensured"
        );
        Ok(())
    }

    async fn ping(&self) -> AdapterResult<()> {
        check_connection(&self.database).await
    }

    async fn find(&self, filter: Option<Document>) -> AdapterResult<Vec<PolicyRule>> {
        self.find_documents(filter.unwrap_or_default()).await
    }

    async fn find_matching(&self, selector: &RuleSelector) -> AdapterResult<Vec<PolicyRule>> {
        self.find_documents(selector_filter(selector)).await
    }

    async fn insert_one(&self, rule: &PolicyRule) -> AdapterResult<()> {
        self.collection
            .insert_one(RuleDocument::from(rule))
            .await
            .map_err(|e| map_write_error(e, "Failed to insert policy rule"))?;
        Ok(())
    }

    async fn insert_many(&self, rules: &[PolicyRule]) -> AdapterResult<()> {
        // 驱动拒绝空批次
        if rules.is_empty() {
            return Ok(());
        }
        let documents: Vec<RuleDocument> = rules.iter().map(RuleDocument::from).collect();

        self.collection
            .insert_many(documents)
            .await
            .map_err(|e| map_write_error(e, "Failed to insert policy rules"))?;
        Ok(())
    }

    async fn delete_one(&self, rule: &PolicyRule) -> AdapterResult<u64> {
        let result = self
            .collection
            .delete_one(rule_filter(rule))
            .await
            .map_err(|e| map_write_error(e, "Failed to delete policy rule"))?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, selector: &RuleSelector) -> AdapterResult<u64> {
        let result = self
            .collection
            .delete_many(selector_filter(selector))
            .await
            .map_err(|e| map_write_error(e, "Failed to delete policy rules"))?;
        Ok(result.deleted_count)
    }

    async fn replace_one(&self, old: &PolicyRule, new: &PolicyRule) -> AdapterResult<u64> {
        let result = self
            .collection
            .replace_one(rule_filter(old), RuleDocument::from(new))
            .await
            .map_err(|e| map_write_error(e, "Failed to replace policy rule"))?;
        Ok(result.matched_count)
    }

    async fn drop_collection(&self) -> AdapterResult<()> {
        match self.collection.drop().await {
            Ok(()) => Ok(()),
            Err(e) if is_namespace_not_found(&e) => Ok(()),
            Err(e) => Err(map_write_error(e, "Failed to drop policy collection")),
        }
    }

    async fn swap_in_transaction(
        &self,
        selector: &RuleSelector,
        rules: &[PolicyRule],
    ) -> AdapterResult<Vec<PolicyRule>> {
        self.swap_with_session(selector, rules).await
    }

    async fn close(&self) -> AdapterResult<()> {
        self.client.clone().shutdown().await;
        info!("MongoDB client shut down");
        Ok(())
    }
}
