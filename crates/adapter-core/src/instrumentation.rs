//! Metrics 埋点
//!
//! 适配器操作计数、耗时以及事务回退次数

use std::time::Instant;

use metrics::{counter, histogram};

pub const OPERATIONS_TOTAL: &str = "policy_adapter_operations_total";
pub const OPERATION_DURATION_MS: &str = "policy_adapter_operation_duration_ms";
pub const TRANSACTION_FALLBACKS_TOTAL: &str = "policy_adapter_transaction_fallbacks_total";

/// 记录适配器操作
pub fn record_operation(operation: &str, outcome: &str, duration_ms: f64) {
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", outcome.to_string()),
    ];

    counter!(OPERATIONS_TOTAL, &labels).increment(1);
    histogram!(OPERATION_DURATION_MS, &labels).record(duration_ms);
}

/// 记录非事务回退
pub fn record_transaction_fallback(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(TRANSACTION_FALLBACKS_TOTAL, &labels).increment(1);
}

/// 操作计时器
pub struct OperationTimer {
    start: Instant,
    operation: &'static str,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// `outcome` 为 "ok" 或错误分类标签
    pub fn finish(self, outcome: &str) {
        let duration = self.start.elapsed().as_secs_f64() * 1000.0;
        record_operation(self.operation, outcome, duration);
    }
}
