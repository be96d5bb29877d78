//! policy-adapter-core - 与存储无关的策略适配器
//!
//! 在 `RuleStore` 之上实现授权引擎使用的 `PolicyAdapter` 契约

mod adapter;
mod instrumentation;
mod options;

pub use adapter::*;
pub use instrumentation::*;
pub use options::*;
