//! 规则选择器
//!
//! 由字段相等约束组成的谓词，用于过滤删除和过滤更新

use policy_errors::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};

use crate::{MAX_FIELDS, PolicyRule};

/// 规则选择器
///
/// `None` 表示该位置不做约束。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSelector {
    pub rule_type: Option<String>,
    pub fields: [Option<String>; MAX_FIELDS],
}

impl RuleSelector {
    /// 匹配所有规则
    pub fn any() -> Self {
        Self::default()
    }

    /// 匹配指定类型的所有规则
    pub fn for_rule_type(rule_type: impl Into<String>) -> Self {
        Self {
            rule_type: Some(rule_type.into()),
            ..Default::default()
        }
    }

    /// 与给定规则结构相等（七个字段全部约束，包括空字段）
    pub fn exact(rule: &PolicyRule) -> Self {
        Self {
            rule_type: Some(rule.rule_type.clone()),
            fields: rule.fields.clone().map(Some),
        }
    }

    /// 由 (field_index, field_values) 构造部分匹配选择器
    ///
    /// 第 i 个非空值约束 `v[field_index + i]`，空值表示不关心该位置。
    /// 非空值落在第六个字段之后时返回 `FieldOverflow`。
    pub fn from_field_values<S: AsRef<str>>(
        rule_type: impl Into<String>,
        field_index: usize,
        field_values: &[S],
    ) -> AdapterResult<Self> {
        let mut selector = Self::for_rule_type(rule_type);

        for (offset, value) in field_values.iter().enumerate() {
            let value = value.as_ref();
            if value.is_empty() {
                continue;
            }
            let index = field_index.checked_add(offset).ok_or_else(|| {
                AdapterError::field_overflow(format!(
                    "field index {} + {} is out of range, rules have {} fields",
                    field_index, offset, MAX_FIELDS
                ))
            })?;
            selector = selector.with_field(index, value)?;
        }

        Ok(selector)
    }

    /// 约束第 `index` 个字段
    pub fn with_field(mut self, index: usize, value: impl Into<String>) -> AdapterResult<Self> {
        let slot = self.fields.get_mut(index).ok_or_else(|| {
            AdapterError::field_overflow(format!(
                "field index {} is out of range, rules have {} fields",
                index, MAX_FIELDS
            ))
        })?;
        *slot = Some(value.into());
        Ok(self)
    }

    /// 已约束的字段 (位置, 值)
    pub fn field_constraints(&self) -> impl Iterator<Item = (usize, &str)> {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_deref().map(|v| (index, v)))
    }

    /// 没有任何约束
    pub fn is_empty(&self) -> bool {
        self.rule_type.is_none() && self.fields.iter().all(Option::is_none)
    }

    pub fn matches(&self, rule: &PolicyRule) -> bool {
        if let Some(ref rule_type) = self.rule_type {
            if rule_type != &rule.rule_type {
                return false;
            }
        }

        self.field_constraints()
            .all(|(index, value)| rule.fields[index] == value)
    }
}
