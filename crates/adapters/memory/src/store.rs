//! 内存规则存储实现

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use policy_domain::{PolicyRule, RuleSelector};
use policy_errors::{AdapterError, AdapterResult};
use policy_ports::RuleStore;
use tracing::debug;

/// 可注入故障的存储操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Ping,
    EnsureIndex,
    Find,
    InsertOne,
    InsertMany,
    DeleteOne,
    DeleteMany,
    ReplaceOne,
    Drop,
    Transaction,
    Close,
}

#[derive(Debug, Default)]
struct State {
    rules: Vec<PolicyRule>,
    unique: bool,
    closed: bool,
}

impl State {
    fn contains(&self, rule: &PolicyRule) -> bool {
        self.rules.iter().any(|r| r == rule)
    }

    fn insert(&mut self, rule: &PolicyRule) -> AdapterResult<()> {
        if self.unique && self.contains(rule) {
            return Err(duplicate_key_error(rule));
        }
        self.rules.push(rule.clone());
        Ok(())
    }

    fn insert_ordered(&mut self, rules: &[PolicyRule]) -> AdapterResult<()> {
        for rule in rules {
            self.insert(rule)?;
        }
        Ok(())
    }

    fn matching(&self, selector: &RuleSelector) -> Vec<PolicyRule> {
        self.rules
            .iter()
            .filter(|rule| selector.matches(rule))
            .cloned()
            .collect()
    }

    fn remove_matching(&mut self, selector: &RuleSelector) -> u64 {
        let before = self.rules.len();
        self.rules.retain(|rule| !selector.matches(rule));
        (before - self.rules.len()) as u64
    }
}

fn duplicate_key_error(rule: &PolicyRule) -> AdapterError {
    AdapterError::write(format!(
        "E11000 duplicate key error: ptype={} fields={:?}",
        rule.rule_type, rule.fields
    ))
}

struct Inner {
    state: Mutex<State>,
    transactions: bool,
    latency: Mutex<Option<Duration>>,
    failures: Mutex<HashMap<StoreOperation, AdapterError>>,
    transaction_attempts: AtomicUsize,
}

/// 内存规则存储
///
/// 克隆共享同一份数据，可模拟多个适配器实例访问同一集合。
/// 与 MongoDB 一致：唯一索引在 `ensure_unique_index` 之后生效，删除集合会移除索引。
#[derive(Clone)]
pub struct MemoryRuleStore {
    inner: Arc<Inner>,
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRuleStore {
    /// 创建支持事务的存储
    pub fn new() -> Self {
        Self::build(true)
    }

    /// 创建不支持事务的存储（模拟单机部署）
    pub fn without_transactions() -> Self {
        Self::build(false)
    }

    fn build(transactions: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                transactions,
                latency: Mutex::new(None),
                failures: Mutex::new(HashMap::new()),
                transaction_attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// 每次操作前等待 `latency`，对所有克隆生效
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(Some(latency));
        self
    }

    /// 调整或取消操作延迟
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.lock() = latency;
    }

    /// 直接写入规则（绕过唯一索引）
    pub fn seed(&self, rules: impl IntoIterator<Item = PolicyRule>) {
        self.inner.state.lock().rules.extend(rules);
    }

    /// 下一次 `operation` 调用返回 `error`
    pub fn fail_next(&self, operation: StoreOperation, error: AdapterError) {
        self.inner.failures.lock().insert(operation, error);
    }

    /// 当前规则快照
    pub fn rules(&self) -> Vec<PolicyRule> {
        self.inner.state.lock().rules.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_unique_index(&self) -> bool {
        self.inner.state.lock().unique
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// 事务尝试次数（包括因不支持事务而失败的尝试）
    pub fn transaction_attempts(&self) -> usize {
        self.inner.transaction_attempts.load(Ordering::SeqCst)
    }

    async fn before(&self, operation: StoreOperation) -> AdapterResult<()> {
        let latency = *self.inner.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if operation != StoreOperation::Close && self.is_closed() {
            return Err(AdapterError::connection("store is closed"));
        }

        match self.inner.failures.lock().remove(&operation) {
            Some(error) => {
                debug!(?operation, error = %error, "Injected store failure");
                Err(error)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    type Filter = RuleSelector;

    async fn ensure_unique_index(&self) -> AdapterResult<()> {
        self.before(StoreOperation::EnsureIndex).await?;

        let mut state = self.inner.state.lock();
        if state.unique {
            return Ok(());
        }

        for (i, rule) in state.rules.iter().enumerate() {
            if state.rules[i + 1..].contains(rule) {
                return Err(AdapterError::index(format!(
                    "cannot create unique index, duplicate rule: ptype={} fields={:?}",
                    rule.rule_type, rule.fields
                )));
            }
        }
        state.unique = true;
        Ok(())
    }

    async fn ping(&self) -> AdapterResult<()> {
        self.before(StoreOperation::Ping).await
    }

    async fn find(&self, filter: Option<RuleSelector>) -> AdapterResult<Vec<PolicyRule>> {
        self.before(StoreOperation::Find).await?;

        let state = self.inner.state.lock();
        Ok(match filter {
            Some(selector) => state.matching(&selector),
            None => state.rules.clone(),
        })
    }

    async fn find_matching(&self, selector: &RuleSelector) -> AdapterResult<Vec<PolicyRule>> {
        self.before(StoreOperation::Find).await?;
        Ok(self.inner.state.lock().matching(selector))
    }

    async fn insert_one(&self, rule: &PolicyRule) -> AdapterResult<()> {
        self.before(StoreOperation::InsertOne).await?;
        self.inner.state.lock().insert(rule)
    }

    async fn insert_many(&self, rules: &[PolicyRule]) -> AdapterResult<()> {
        self.before(StoreOperation::InsertMany).await?;
        self.inner.state.lock().insert_ordered(rules)
    }

    async fn delete_one(&self, rule: &PolicyRule) -> AdapterResult<u64> {
        self.before(StoreOperation::DeleteOne).await?;

        let mut state = self.inner.state.lock();
        match state.rules.iter().position(|r| r == rule) {
            Some(index) => {
                state.rules.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, selector: &RuleSelector) -> AdapterResult<u64> {
        self.before(StoreOperation::DeleteMany).await?;
        Ok(self.inner.state.lock().remove_matching(selector))
    }

    async fn replace_one(&self, old: &PolicyRule, new: &PolicyRule) -> AdapterResult<u64> {
        self.before(StoreOperation::ReplaceOne).await?;

        let mut state = self.inner.state.lock();
        let Some(index) = state.rules.iter().position(|r| r == old) else {
            return Ok(0);
        };

        if state.unique && old != new && state.contains(new) {
            return Err(duplicate_key_error(new));
        }
        state.rules[index] = new.clone();
        Ok(1)
    }

    async fn drop_collection(&self) -> AdapterResult<()> {
        self.before(StoreOperation::Drop).await?;

        let mut state = self.inner.state.lock();
        state.rules.clear();
        state.unique = false;
        Ok(())
    }

    async fn swap_in_transaction(
        &self,
        selector: &RuleSelector,
        rules: &[PolicyRule],
    ) -> AdapterResult<Vec<PolicyRule>> {
        self.inner.transaction_attempts.fetch_add(1, Ordering::SeqCst);
        self.before(StoreOperation::Transaction).await?;

        if !self.inner.transactions {
            return Err(AdapterError::transaction_unsupported(
                "Transaction numbers are only allowed on a replica set member or mongos",
            ));
        }

        let mut state = self.inner.state.lock();
        let snapshot = state.rules.clone();

        let removed = state.matching(selector);
        state.remove_matching(selector);
        if let Err(e) = state.insert_ordered(rules) {
            state.rules = snapshot;
            return Err(e);
        }
        Ok(removed)
    }

    async fn close(&self) -> AdapterResult<()> {
        self.before(StoreOperation::Close).await?;
        self.inner.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(values: &[&str]) -> PolicyRule {
        PolicyRule::encode("p", values).unwrap()
    }

    #[tokio::test]
    async fn test_unique_index_enforced_after_ensure() {
        let store = MemoryRuleStore::new();
        store.insert_one(&rule(&["alice", "data1", "read"])).await.unwrap();
        store.insert_one(&rule(&["alice", "data1", "read"])).await.unwrap();
        assert_eq!(store.len(), 2);

        let err = store.ensure_unique_index().await.unwrap_err();
        assert!(matches!(err, AdapterError::Index(_)));

        store.delete_one(&rule(&["alice", "data1", "read"])).await.unwrap();
        store.ensure_unique_index().await.unwrap();

        let err = store
            .insert_one(&rule(&["alice", "data1", "read"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Write(_)));
    }

    #[tokio::test]
    async fn test_insert_many_is_ordered() {
        let store = MemoryRuleStore::new();
        store.ensure_unique_index().await.unwrap();
        store.insert_one(&rule(&["bob", "data2", "write"])).await.unwrap();

        let err = store
            .insert_many(&[
                rule(&["alice", "data1", "read"]),
                rule(&["bob", "data2", "write"]),
                rule(&["carol", "data3", "read"]),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Write(_)));

        // 失败之前的插入保留，之后的不再执行
        let rules = store.rules();
        assert_eq!(rules.len(), 2);
        assert!(rules.contains(&rule(&["alice", "data1", "read"])));
        assert!(!rules.contains(&rule(&["carol", "data3", "read"])));
    }

    #[tokio::test]
    async fn test_drop_removes_index() {
        let store = MemoryRuleStore::new();
        store.ensure_unique_index().await.unwrap();
        store.insert_one(&rule(&["alice"])).await.unwrap();

        store.drop_collection().await.unwrap();
        assert!(store.is_empty());
        assert!(!store.has_unique_index());
    }

    #[tokio::test]
    async fn test_transaction_rolls_back_on_failure() {
        let store = MemoryRuleStore::new();
        store.ensure_unique_index().await.unwrap();
        store
            .insert_many(&[rule(&["alice", "data1", "read"]), rule(&["bob", "data2", "write"])])
            .await
            .unwrap();

        let selector = RuleSelector::from_field_values("p", 0, &["alice"]).unwrap();
        let err = store
            .swap_in_transaction(&selector, &[rule(&["bob", "data2", "write"])])
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Write(_)));
        assert_eq!(store.len(), 2);
        assert!(store.rules().contains(&rule(&["alice", "data1", "read"])));
    }

    #[tokio::test]
    async fn test_transactions_unsupported() {
        let store = MemoryRuleStore::without_transactions();
        let err = store
            .swap_in_transaction(&RuleSelector::for_rule_type("p"), &[])
            .await
            .unwrap_err();
        assert!(err.is_transaction_unsupported());
        assert_eq!(store.transaction_attempts(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let store = MemoryRuleStore::new();
        store.fail_next(StoreOperation::Find, AdapterError::query("cursor killed"));

        assert!(store.find(None).await.is_err());
        assert!(store.find(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_store_rejects_operations() {
        let store = MemoryRuleStore::new();
        store.close().await.unwrap();
        store.close().await.unwrap();

        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, AdapterError::Connection(_)));
    }

    #[tokio::test]
    async fn test_replace_one_missing_is_noop() {
        let store = MemoryRuleStore::new();
        let matched = store
            .replace_one(&rule(&["alice"]), &rule(&["bob"]))
            .await
            .unwrap();
        assert_eq!(matched, 0);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_keeps_shared_state() {
        let store = MemoryRuleStore::new();
        let other = store.clone();
        store.ensure_unique_index().await.unwrap();
        store.insert_one(&rule(&["alice"])).await.unwrap();
        store.fail_next(StoreOperation::Ping, AdapterError::connection("refused"));

        let store = store.with_latency(Duration::from_secs(2));
        assert!(store.has_unique_index());
        assert!(store.ping().await.is_err());

        // 延迟对之前的克隆同样生效
        let started = tokio::time::Instant::now();
        assert_eq!(other.find(None).await.unwrap(), vec![rule(&["alice"])]);
        assert!(started.elapsed() >= Duration::from_secs(2));

        let err = other.insert_one(&rule(&["alice"])).await.unwrap_err();
        assert!(matches!(err, AdapterError::Write(_)));
    }
}
