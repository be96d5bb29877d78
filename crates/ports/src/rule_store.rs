//! RuleStore trait 定义

use async_trait::async_trait;
use policy_domain::{PolicyRule, RuleSelector};
use policy_errors::AdapterResult;

/// 规则存储 trait
///
/// 对单个集合的文档操作。实现方负责把存储层错误映射为 `AdapterError`，
/// 尤其是把“部署不支持事务”归类为 `TransactionUnsupported`。
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// 加载时使用的过滤条件，语法由存储决定
    type Filter: Send + Sync;

    /// 确保七个字段上的联合唯一索引存在（幂等）
    async fn ensure_unique_index(&self) -> AdapterResult<()>;

    /// 连通性检查
    async fn ping(&self) -> AdapterResult<()>;

    /// 查询规则，`None` 表示全部
    async fn find(&self, filter: Option<Self::Filter>) -> AdapterResult<Vec<PolicyRule>>;

    /// 查询匹配选择器的规则
    async fn find_matching(&self, selector: &RuleSelector) -> AdapterResult<Vec<PolicyRule>>;

    /// 插入单条规则
    async fn insert_one(&self, rule: &PolicyRule) -> AdapterResult<()>;

    /// 有序批量插入，遇到第一个失败即停止，之前的插入保留
    async fn insert_many(&self, rules: &[PolicyRule]) -> AdapterResult<()>;

    /// 删除至多一条结构相等的规则，返回删除数量
    async fn delete_one(&self, rule: &PolicyRule) -> AdapterResult<u64>;

    /// 删除所有匹配选择器的规则，返回删除数量
    async fn delete_many(&self, selector: &RuleSelector) -> AdapterResult<u64>;

    /// 用 `new` 替换与 `old` 结构相等的一条规则，返回匹配数量
    async fn replace_one(&self, old: &PolicyRule, new: &PolicyRule) -> AdapterResult<u64>;

    /// 删除整个集合（集合不存在不算错误）
    async fn drop_collection(&self) -> AdapterResult<()>;

    /// 在单个事务内执行 读取匹配 -> 删除匹配 -> 插入新规则，返回被删除的规则
    ///
    /// 部署不支持事务时返回 `TransactionUnsupported`，此时不得留下任何修改。
    async fn swap_in_transaction(
        &self,
        selector: &RuleSelector,
        rules: &[PolicyRule],
    ) -> AdapterResult<Vec<PolicyRule>>;

    /// 释放连接
    async fn close(&self) -> AdapterResult<()>;
}
