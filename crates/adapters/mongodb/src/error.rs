//! MongoDB 错误映射
//!
//! 在存储边界把驱动错误归类为 `AdapterError`，“部署不支持事务”单独归类

use mongodb::error::{Error, ErrorKind};
use policy_errors::AdapterError;

/// IllegalOperation，单机部署上使用事务时返回
pub const ILLEGAL_OPERATION: i32 = 20;

/// NamespaceNotFound
pub const NAMESPACE_NOT_FOUND: i32 = 26;

/// 不支持事务时驱动或服务端返回的错误信息
pub const TRANSACTION_UNSUPPORTED_PATTERNS: &[&str] = &[
    "Transaction numbers are only allowed on a replica set member or mongos",
    "Transactions are not supported",
];

fn command_code(err: &Error) -> Option<i32> {
    match *err.kind {
        ErrorKind::Command(ref command) => Some(command.code),
        _ => None,
    }
}

/// 错误信息是否表示部署不支持事务
pub fn message_indicates_transaction_unsupported(message: &str) -> bool {
    TRANSACTION_UNSUPPORTED_PATTERNS
        .iter()
        .any(|pattern| message.contains(pattern))
}

/// 当前部署是否不支持多文档事务
pub fn is_transaction_unsupported(err: &Error) -> bool {
    command_code(err) == Some(ILLEGAL_OPERATION)
        || message_indicates_transaction_unsupported(&err.to_string())
}

/// 集合不存在（drop 时忽略）
pub fn is_namespace_not_found(err: &Error) -> bool {
    command_code(err) == Some(NAMESPACE_NOT_FOUND) || err.to_string().contains("ns not found")
}

fn is_connection_failure(err: &Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. }
    )
}

fn classify(err: Error, context: &str, fallback: fn(String) -> AdapterError) -> AdapterError {
    let message = format!("{}: {}", context, err);

    if is_transaction_unsupported(&err) {
        AdapterError::TransactionUnsupported(message)
    } else if is_connection_failure(&err) {
        AdapterError::Connection(message)
    } else {
        fallback(message)
    }
}

/// 读操作错误（查询、游标、文档解码）
pub fn map_read_error(err: Error, context: &str) -> AdapterError {
    classify(err, context, AdapterError::Query)
}

/// 写操作错误（插入、删除、替换、唯一约束冲突）
pub fn map_write_error(err: Error, context: &str) -> AdapterError {
    classify(err, context, AdapterError::Write)
}

/// 索引创建错误
pub fn map_index_error(err: Error, context: &str) -> AdapterError {
    classify(err, context, AdapterError::Index)
}

/// 连接错误
pub fn map_connection_error(err: Error, context: &str) -> AdapterError {
    classify(err, context, AdapterError::Connection)
}
