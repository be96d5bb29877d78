//! 内存策略集合
//!
//! section -> 规则类型 -> 有序规则列表。由调用方持有，适配器在加载时追加、
//! 保存时只读。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DecodedRule, GROUPING_SECTION, POLICY_SECTION};

/// 单个规则类型下的有序规则
pub type RuleList = Vec<Vec<String>>;

/// 策略集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicySet {
    sections: BTreeMap<String, BTreeMap<String, RuleList>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条规则
    pub fn add_rule(
        &mut self,
        section: impl Into<String>,
        rule_type: impl Into<String>,
        values: Vec<String>,
    ) {
        self.sections
            .entry(section.into())
            .or_default()
            .entry(rule_type.into())
            .or_default()
            .push(values);
    }

    /// 追加一条解码后的规则
    pub fn add_decoded(&mut self, rule: DecodedRule) {
        self.add_rule(rule.section, rule.rule_type, rule.values);
    }

    /// 获取指定类型的规则
    pub fn rules(&self, section: &str, rule_type: &str) -> &[Vec<String>] {
        self.sections
            .get(section)
            .and_then(|types| types.get(rule_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 遍历某个 section 下的 (规则类型, 规则列表)
    pub fn section(&self, section: &str) -> impl Iterator<Item = (&str, &[Vec<String>])> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|types| types.iter())
            .map(|(rule_type, rules)| (rule_type.as_str(), rules.as_slice()))
    }

    /// 遍历需要持久化的规则（仅 "p" 和 "g" 两个 section）
    pub fn persistable_rules(&self) -> impl Iterator<Item = (&str, &[String])> {
        [POLICY_SECTION, GROUPING_SECTION]
            .into_iter()
            .flat_map(|section| self.section(section))
            .flat_map(|(rule_type, rules)| {
                rules.iter().map(move |values| (rule_type, values.as_slice()))
            })
    }

    /// 规则总数
    pub fn len(&self) -> usize {
        self.sections
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 清空所有规则
    pub fn clear(&mut self) {
        self.sections.clear();
    }
}
