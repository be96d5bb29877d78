//! policy-adapter-memory - 内存规则存储
//!
//! 与 MongoDB 存储语义一致的进程内实现，用于嵌入式场景和测试

mod store;

pub use store::*;
