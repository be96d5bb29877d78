//! ports - 抽象 trait 层
//!
//! 定义授权引擎调用的适配器契约以及底层文档存储的抽象接口

mod policy_adapter;
mod rule_store;

pub use policy_adapter::*;
pub use rule_store::*;
