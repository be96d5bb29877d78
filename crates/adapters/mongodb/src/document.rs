//! 规则文档
//!
//! 集合中每个文档有七个字符串字段 `ptype, v0..v5`

use mongodb::IndexModel;
use mongodb::bson::Document;
use mongodb::options::IndexOptions;
use policy_domain::{MAX_FIELDS, PolicyRule, RuleSelector};
use serde::{Deserialize, Serialize};

/// 规则类型字段名
pub const RULE_TYPE_FIELD: &str = "ptype";

/// 位置字段名
pub const VALUE_FIELDS: [&str; MAX_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// 持久化的规则文档
///
/// 缺失的 `v*` 字段按空字符串解码，`_id` 等其它字段忽略。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    pub ptype: String,
    #[serde(default)]
    pub v0: String,
    #[serde(default)]
    pub v1: String,
    #[serde(default)]
    pub v2: String,
    #[serde(default)]
    pub v3: String,
    #[serde(default)]
    pub v4: String,
    #[serde(default)]
    pub v5: String,
}

impl From<&PolicyRule> for RuleDocument {
    fn from(rule: &PolicyRule) -> Self {
        let [v0, v1, v2, v3, v4, v5] = rule.fields.clone();
        Self {
            ptype: rule.rule_type.clone(),
            v0,
            v1,
            v2,
            v3,
            v4,
            v5,
        }
    }
}

impl From<RuleDocument> for PolicyRule {
    fn from(doc: RuleDocument) -> Self {
        PolicyRule::new(doc.ptype, [doc.v0, doc.v1, doc.v2, doc.v3, doc.v4, doc.v5])
    }
}

/// 与规则结构相等的过滤条件（七个字段全部约束）
pub fn rule_filter(rule: &PolicyRule) -> Document {
    selector_filter(&RuleSelector::exact(rule))
}

/// 选择器对应的过滤条件
pub fn selector_filter(selector: &RuleSelector) -> Document {
    let mut filter = Document::new();
    if let Some(ref rule_type) = selector.rule_type {
        filter.insert(RULE_TYPE_FIELD, rule_type.as_str());
    }
    for (index, value) in selector.field_constraints() {
        filter.insert(VALUE_FIELDS[index], value);
    }
    filter
}

/// 唯一索引的键
pub fn unique_index_keys() -> Document {
    let mut keys = Document::new();
    keys.insert(RULE_TYPE_FIELD, 1);
    for field in VALUE_FIELDS {
        keys.insert(field, 1);
    }
    keys
}

/// 七个字段上的联合唯一索引
///
/// 不指定索引名，由服务端生成默认名 `ptype_1_v0_1_..._v5_1`，
/// 其他实例以默认名建过的同一索引再次创建时视为已存在。
pub fn unique_index_model() -> IndexModel {
    IndexModel::builder()
        .keys(unique_index_keys())
        .options(IndexOptions::builder().unique(true).build())
        .build()
}
