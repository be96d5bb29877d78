//! policy-errors - 统一错误处理
//!
//! 适配器对外暴露的全部错误类型

use serde::Serialize;
use thiserror::Error;

/// 适配器错误类型
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Cannot save a filtered policy")]
    FilteredState,

    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// 仅在内部使用，触发非事务回退路径
    #[error("Transactions unsupported: {0}")]
    TransactionUnsupported(String),

    #[error("Field overflow: {0}")]
    FieldOverflow(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// 错误分类（用于日志和指标标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Index,
    Query,
    Write,
    FilteredState,
    Timeout,
    TransactionUnsupported,
    FieldOverflow,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Index => "index",
            ErrorKind::Query => "query",
            ErrorKind::Write => "write",
            ErrorKind::FilteredState => "filtered_state",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TransactionUnsupported => "transaction_unsupported",
            ErrorKind::FieldOverflow => "field_overflow",
            ErrorKind::Validation => "validation",
        }
    }
}

impl AdapterError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn transaction_unsupported(msg: impl Into<String>) -> Self {
        Self::TransactionUnsupported(msg.into())
    }

    pub fn field_overflow(msg: impl Into<String>) -> Self {
        Self::FieldOverflow(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 获取错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Index(_) => ErrorKind::Index,
            Self::Query(_) => ErrorKind::Query,
            Self::Write(_) => ErrorKind::Write,
            Self::FilteredState => ErrorKind::FilteredState,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::TransactionUnsupported(_) => ErrorKind::TransactionUnsupported,
            Self::FieldOverflow(_) => ErrorKind::FieldOverflow,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }

    /// 当前部署是否不支持多文档事务
    pub fn is_transaction_unsupported(&self) -> bool {
        matches!(self, Self::TransactionUnsupported(_))
    }

    /// 调用方是否可以整体重试该操作
    ///
    /// 只对超时和连接错误返回 true。注意 AddPolicy 超时后重试并不安全，
    /// 上一次插入可能已经落库。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}

/// Result 类型别名
pub type AdapterResult<T> = Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            AdapterError::FilteredState.to_string(),
            "Cannot save a filtered policy"
        );
        assert_eq!(
            AdapterError::write("duplicate key").to_string(),
            "Write error: duplicate key"
        );
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(AdapterError::query("x").kind().as_str(), "query");
        assert_eq!(
            AdapterError::transaction_unsupported("standalone").kind(),
            ErrorKind::TransactionUnsupported
        );
        assert_eq!(AdapterError::FilteredState.kind().as_str(), "filtered_state");
    }

    #[test]
    fn test_classification() {
        assert!(AdapterError::transaction_unsupported("x").is_transaction_unsupported());
        assert!(!AdapterError::write("x").is_transaction_unsupported());

        assert!(AdapterError::timeout("load_policy").is_retryable());
        assert!(AdapterError::connection("refused").is_retryable());
        assert!(!AdapterError::write("dup").is_retryable());
        assert!(!AdapterError::FilteredState.is_retryable());
    }
}
