//! policy-domain - 策略规则领域类型
//!
//! 规则编解码、内存策略集合以及部分匹配选择器

mod policy_set;
mod rule;
mod selector;

pub use policy_set::*;
pub use rule::*;
pub use selector::*;
