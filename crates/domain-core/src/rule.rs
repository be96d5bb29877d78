//! 策略规则编解码
//!
//! 持久化文档固定为 `ptype` 加六个位置字段，未使用的尾部字段为空字符串

use policy_errors::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};

/// 单条规则的最大字段数
pub const MAX_FIELDS: usize = 6;

/// 权限规则所在的 section
pub const POLICY_SECTION: &str = "p";

/// 角色继承规则所在的 section
pub const GROUPING_SECTION: &str = "g";

/// 持久化的策略规则
///
/// 字段从左到右填充，中间不留空。两条规则相等当且仅当 `rule_type`
/// 和全部六个字段都相等。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRule {
    /// 规则类型标签，首字符即 section
    pub rule_type: String,
    /// 位置字段 v0..v5
    pub fields: [String; MAX_FIELDS],
}

/// 解码后的规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRule {
    pub section: String,
    pub rule_type: String,
    pub values: Vec<String>,
}

impl PolicyRule {
    pub fn new(rule_type: impl Into<String>, fields: [String; MAX_FIELDS]) -> Self {
        Self {
            rule_type: rule_type.into(),
            fields,
        }
    }

    /// 编码规则
    ///
    /// 按位置复制最多六个值，超出部分返回 `FieldOverflow`，不做静默截断。
    pub fn encode<S: AsRef<str>>(rule_type: impl Into<String>, values: &[S]) -> AdapterResult<Self> {
        let rule_type = rule_type.into();
        if values.len() > MAX_FIELDS {
            return Err(AdapterError::field_overflow(format!(
                "rule of type '{}' has {} fields, at most {} are supported",
                rule_type,
                values.len(),
                MAX_FIELDS
            )));
        }

        let mut fields: [String; MAX_FIELDS] = Default::default();
        for (slot, value) in fields.iter_mut().zip(values) {
            *slot = value.as_ref().to_string();
        }

        Ok(Self { rule_type, fields })
    }

    /// 规则所属 section（`rule_type` 的首字符）
    pub fn section(&self) -> &str {
        match self.rule_type.char_indices().nth(1) {
            Some((end, _)) => &self.rule_type[..end],
            None => &self.rule_type,
        }
    }

    /// 有效字段数：遇到第一个空字段即停止
    pub fn effective_len(&self) -> usize {
        self.fields
            .iter()
            .position(String::is_empty)
            .unwrap_or(MAX_FIELDS)
    }

    /// 有效字段列表
    pub fn values(&self) -> Vec<String> {
        self.fields[..self.effective_len()].to_vec()
    }

    /// 解码为 (section, rule_type, values)
    pub fn decode(&self) -> DecodedRule {
        DecodedRule {
            section: self.section().to_string(),
            rule_type: self.rule_type.clone(),
            values: self.values(),
        }
    }
}
