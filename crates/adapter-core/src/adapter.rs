//! 策略适配器实现
//!
//! 每个公开操作都在配置的超时内完成，并记录操作指标

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use policy_domain::{PolicyRule, PolicySet, RuleSelector};
use policy_errors::{AdapterError, AdapterResult};
use policy_ports::{PolicyAdapter, RuleStore};
use tracing::{debug, info, warn};

use crate::{AdapterOptions, OperationTimer, record_transaction_fallback};

/// 基于 `RuleStore` 的策略适配器
///
/// 存储句柄在适配器生命周期内共享，`close` 之后所有操作返回连接错误。
/// 适配器被丢弃时存储句柄随之释放。
pub struct Adapter<S: RuleStore> {
    store: S,
    timeout: Duration,
    filtered: bool,
    closed: bool,
}

impl<S: RuleStore> Adapter<S> {
    /// 打开适配器：检查连通性并确保唯一索引
    ///
    /// 任一步失败都不会返回适配器对象。
    pub async fn open(store: S, options: AdapterOptions) -> AdapterResult<Self> {
        let adapter = Self {
            store,
            timeout: options.timeout,
            filtered: options.filtered,
            closed: false,
        };

        adapter
            .run("open", async {
                adapter.store.ping().await?;
                adapter.store.ensure_unique_index().await
            })
            .await?;

        info!(
            timeout_ms = adapter.timeout.as_millis() as u64,
            filtered = adapter.filtered,
            "Policy adapter opened"
        );
        Ok(adapter)
    }

    /// 获取底层存储
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 单次操作超时
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 连通性检查
    pub async fn ping(&self) -> AdapterResult<()> {
        self.run("ping", self.store.ping()).await
    }

    fn ensure_open(&self) -> AdapterResult<()> {
        if self.closed {
            return Err(AdapterError::connection("adapter is closed"));
        }
        Ok(())
    }

    async fn run<T, F>(&self, operation: &'static str, fut: F) -> AdapterResult<T>
    where
        F: Future<Output = AdapterResult<T>>,
    {
        self.ensure_open()?;
        self.run_unchecked(operation, fut).await
    }

    async fn run_unchecked<T, F>(&self, operation: &'static str, fut: F) -> AdapterResult<T>
    where
        F: Future<Output = AdapterResult<T>>,
    {
        let timer = OperationTimer::new(operation);
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::timeout(format!(
                "{} did not complete within {:?}",
                operation, self.timeout
            ))),
        };

        match &result {
            Ok(_) => timer.finish("ok"),
            Err(e) => {
                debug!(operation, error = %e, "Policy adapter operation failed");
                timer.finish(e.kind().as_str());
            }
        }
        result
    }

    async fn load(
        &mut self,
        operation: &'static str,
        policies: &mut PolicySet,
        filter: Option<S::Filter>,
    ) -> AdapterResult<()> {
        self.ensure_open()?;
        self.filtered = filter.is_some();

        let rules = self.run(operation, self.store.find(filter)).await?;
        let count = rules.len();
        for rule in rules {
            policies.add_decoded(rule.decode());
        }

        debug!(count, filtered = self.filtered, "Policy loaded");
        Ok(())
    }

    /// 不使用事务执行 读取 -> 删除 -> 插入，阶段之间失败会留下不一致的数据
    async fn swap_without_transaction(
        &self,
        selector: &RuleSelector,
        rules: &[PolicyRule],
    ) -> AdapterResult<Vec<PolicyRule>> {
        let removed = self.store.find_matching(selector).await?;
        self.store.delete_many(selector).await?;
        if !rules.is_empty() {
            self.store.insert_many(rules).await?;
        }
        Ok(removed)
    }
}

fn encode_all(ptype: &str, rules: &[Vec<String>]) -> AdapterResult<Vec<PolicyRule>> {
    rules
        .iter()
        .map(|values| PolicyRule::encode(ptype, values))
        .collect()
}

#[async_trait]
impl<S: RuleStore> PolicyAdapter for Adapter<S> {
    type Filter = S::Filter;

    async fn load_policy(&mut self, policies: &mut PolicySet) -> AdapterResult<()> {
        self.load("load_policy", policies, None).await
    }

    async fn load_filtered_policy(
        &mut self,
        policies: &mut PolicySet,
        filter: Self::Filter,
    ) -> AdapterResult<()> {
        self.load("load_filtered_policy", policies, Some(filter)).await
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    async fn save_policy(&self, policies: &PolicySet) -> AdapterResult<()> {
        self.ensure_open()?;
        if self.filtered {
            return Err(AdapterError::FilteredState);
        }

        let count = self
            .run("save_policy", async {
                // 先完成编码，避免字段溢出时已经清空了集合
                let rules = policies
                    .persistable_rules()
                    .map(|(ptype, values)| PolicyRule::encode(ptype, values))
                    .collect::<AdapterResult<Vec<_>>>()?;

                self.store.drop_collection().await?;
                self.store.ensure_unique_index().await?;
                if !rules.is_empty() {
                    self.store.insert_many(&rules).await?;
                }
                Ok(rules.len())
            })
            .await?;

        info!(count, "Policy saved");
        Ok(())
    }

    async fn clear_policy(&self) -> AdapterResult<()> {
        self.run("clear_policy", async {
            self.store.drop_collection().await?;
            self.store.ensure_unique_index().await
        })
        .await?;

        info!("Policy cleared");
        Ok(())
    }

    async fn add_policy(&self, _sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        self.run("add_policy", async {
            let rule = PolicyRule::encode(ptype, rule)?;
            self.store.insert_one(&rule).await
        })
        .await
    }

    async fn add_policies(
        &self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> AdapterResult<()> {
        self.run("add_policies", async {
            let rules = encode_all(ptype, rules)?;
            if rules.is_empty() {
                return Ok(());
            }
            self.store.insert_many(&rules).await
        })
        .await
    }

    async fn remove_policy(&self, _sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        let deleted = self
            .run("remove_policy", async {
                let rule = PolicyRule::encode(ptype, rule)?;
                self.store.delete_one(&rule).await
            })
            .await?;

        if deleted == 0 {
            debug!(ptype, "No policy matched, nothing removed");
        }
        Ok(())
    }

    async fn remove_policies(
        &self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> AdapterResult<()> {
        self.run("remove_policies", async {
            for rule in encode_all(ptype, rules)? {
                self.store.delete_one(&rule).await?;
            }
            Ok(())
        })
        .await
    }

    async fn remove_filtered_policy(
        &self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<()> {
        let deleted = self
            .run("remove_filtered_policy", async {
                let selector = RuleSelector::from_field_values(ptype, field_index, field_values)?;
                self.store.delete_many(&selector).await
            })
            .await?;

        debug!(ptype, field_index, deleted, "Filtered policy removed");
        Ok(())
    }

    async fn update_policy(
        &self,
        _sec: &str,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> AdapterResult<()> {
        let matched = self
            .run("update_policy", async {
                let old_rule = PolicyRule::encode(ptype, old_rule)?;
                let new_rule = PolicyRule::encode(ptype, new_rule)?;
                self.store.replace_one(&old_rule, &new_rule).await
            })
            .await?;

        if matched == 0 {
            debug!(ptype, "No policy matched, nothing updated");
        }
        Ok(())
    }

    async fn update_policies(
        &self,
        _sec: &str,
        ptype: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> AdapterResult<()> {
        self.run("update_policies", async {
            if old_rules.len() != new_rules.len() {
                return Err(AdapterError::validation(format!(
                    "old and new rule lists differ in length: {} != {}",
                    old_rules.len(),
                    new_rules.len()
                )));
            }

            let old_rules = encode_all(ptype, old_rules)?;
            let new_rules = encode_all(ptype, new_rules)?;
            for (old_rule, new_rule) in old_rules.iter().zip(&new_rules) {
                self.store.replace_one(old_rule, new_rule).await?;
            }
            Ok(())
        })
        .await
    }

    async fn update_filtered_policies(
        &self,
        _sec: &str,
        ptype: &str,
        new_rules: &[Vec<String>],
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<Vec<Vec<String>>> {
        let removed = self
            .run("update_filtered_policies", async {
                let selector = RuleSelector::from_field_values(ptype, field_index, field_values)?;
                let rules = encode_all(ptype, new_rules)?;

                match self.store.swap_in_transaction(&selector, &rules).await {
                    Err(e) if e.is_transaction_unsupported() => {
                        warn!(
                            ptype,
                            error = %e,
                            "Transactions unsupported by deployment, updating filtered policies without a transaction"
                        );
                        record_transaction_fallback("update_filtered_policies");
                        self.swap_without_transaction(&selector, &rules).await
                    }
                    other => other,
                }
            })
            .await?;

        debug!(
            ptype,
            removed = removed.len(),
            inserted = new_rules.len(),
            "Filtered policies updated"
        );
        Ok(removed.iter().map(PolicyRule::values).collect())
    }

    async fn close(&mut self) -> AdapterResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.run_unchecked("close", self.store.close()).await?;
        info!("Policy adapter closed");
        Ok(())
    }
}
