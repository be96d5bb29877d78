//! PolicyAdapter trait 定义
//!
//! 授权引擎在加载、保存以及自动保存时直接调用的契约

use async_trait::async_trait;
use policy_domain::PolicySet;
use policy_errors::AdapterResult;

/// 策略适配器 trait
///
/// 批量操作（`add_policies`、`remove_policies`、`update_policies`）不是原子的：
/// 返回错误时调用方必须假设部分规则已经落库。
#[async_trait]
pub trait PolicyAdapter: Send + Sync {
    /// 过滤加载使用的条件
    type Filter: Send;

    /// 加载全部规则，清除过滤标记
    async fn load_policy(&mut self, policies: &mut PolicySet) -> AdapterResult<()>;

    /// 加载匹配过滤条件的规则，设置过滤标记
    async fn load_filtered_policy(
        &mut self,
        policies: &mut PolicySet,
        filter: Self::Filter,
    ) -> AdapterResult<()>;

    /// 最近一次加载是否带过滤条件
    fn is_filtered(&self) -> bool;

    /// 用内存中的规则整体替换存储中的规则
    async fn save_policy(&self, policies: &PolicySet) -> AdapterResult<()>;

    /// 删除存储中的全部规则
    async fn clear_policy(&self) -> AdapterResult<()>;

    async fn add_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()>;

    async fn add_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> AdapterResult<()>;

    async fn remove_policy(&self, sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()>;

    async fn remove_policies(
        &self,
        sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> AdapterResult<()>;

    async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<()>;

    async fn update_policy(
        &self,
        sec: &str,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> AdapterResult<()>;

    async fn update_policies(
        &self,
        sec: &str,
        ptype: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> AdapterResult<()>;

    /// 用 `new_rules` 替换所有匹配的规则，返回被替换掉的旧规则
    async fn update_filtered_policies(
        &self,
        sec: &str,
        ptype: &str,
        new_rules: &[Vec<String>],
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<Vec<Vec<String>>>;

    /// 释放连接（幂等）
    async fn close(&mut self) -> AdapterResult<()>;
}
