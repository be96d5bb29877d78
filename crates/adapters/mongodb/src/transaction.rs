//! 会话事务
//!
//! 在一个多文档事务中完成“查询旧规则、删除、插入新规则”。
//! 单机部署上驱动或服务端返回的错误会被归类为 `TransactionUnsupported`，
//! 由上层决定是否退回非事务路径。

use mongodb::ClientSession;
use policy_domain::{PolicyRule, RuleSelector};
use policy_errors::AdapterResult;
use tracing::debug;

use crate::{MongoRuleStore, RuleDocument, map_read_error, map_write_error, selector_filter};

impl MongoRuleStore {
    /// 在事务中替换选择器匹配的规则，返回被删除的规则
    pub(crate) async fn swap_with_session(
        &self,
        selector: &RuleSelector,
        rules: &[PolicyRule],
    ) -> AdapterResult<Vec<PolicyRule>> {
        let mut session = self
            .client()
            .start_session()
            .await
            .map_err(|e| map_write_error(e, "Failed to start session"))?;

        session
            .start_transaction()
            .await
            .map_err(|e| map_write_error(e, "Failed to start transaction"))?;

        match self.swap_in_session(&mut session, selector, rules).await {
            Ok(removed) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|e| map_write_error(e, "Failed to commit transaction"))?;
                debug!(
                    removed = removed.len(),
                    inserted = rules.len(),
                    "Policy swap transaction committed"
                );
                Ok(removed)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    debug!(error = %abort_err, "Failed to abort transaction");
                }
                Err(err)
            }
        }
    }

    async fn swap_in_session(
        &self,
        session: &mut ClientSession,
        selector: &RuleSelector,
        rules: &[PolicyRule],
    ) -> AdapterResult<Vec<PolicyRule>> {
        let filter = selector_filter(selector);

        let mut cursor = self
            .collection()
            .find(filter.clone())
            .session(&mut *session)
            .await
            .map_err(|e| map_read_error(e, "Failed to query policy rules in transaction"))?;

        let mut removed = Vec::new();
        while let Some(document) = cursor.next(&mut *session).await {
            let document = document
                .map_err(|e| map_read_error(e, "Failed to decode policy rule in transaction"))?;
            removed.push(PolicyRule::from(document));
        }

        self.collection()
            .delete_many(filter)
            .session(&mut *session)
            .await
            .map_err(|e| map_write_error(e, "Failed to delete policy rules in transaction"))?;

        if !rules.is_empty() {
            let documents: Vec<RuleDocument> = rules.iter().map(RuleDocument::from).collect();
            self.collection()
                .insert_many(documents)
                .session(&mut *session)
                .await
                .map_err(|e| map_write_error(e, "Failed to insert policy rules in transaction"))?;
        }

        Ok(removed)
    }
}
