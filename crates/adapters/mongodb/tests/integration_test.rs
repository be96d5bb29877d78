//! Integration tests for MongoDB policy adapter
//!
//! These tests require a running MongoDB server:
//! - Environment variable MONGODB_URL (defaults to mongodb://127.0.0.1:27017)
//! - Transaction tests behave differently on a replica set and on a standalone server;
//!   both paths must produce the same persisted result

use std::time::Duration;

use mongodb::bson::doc;
use policy_adapter_mongodb::{MongoAdapter, MongoConfig, open_adapter};
use policy_domain::PolicySet;
use policy_errors::AdapterError;
use policy_ports::PolicyAdapter;

fn test_config(name: &str) -> MongoConfig {
    let url = std::env::var("MONGODB_URL").unwrap_or_else(|_| "mongodb://127.0.0.1:27017".into());
    MongoConfig::new(url)
        .with_database("casbin_test")
        .with_collection(format!("rule_{}_{}", name, std::process::id()))
        .with_timeout(Duration::from_secs(5))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn seed_policies() -> PolicySet {
    let mut policies = PolicySet::new();
    policies.add_rule("p", "p", strings(&["alice", "data1", "read"]));
    policies.add_rule("p", "p", strings(&["bob", "data2", "write"]));
    policies.add_rule("p", "p", strings(&["data2_admin", "data2", "read"]));
    policies.add_rule("g", "g", strings(&["alice", "data2_admin"]));
    policies
}

async fn open_seeded(name: &str) -> MongoAdapter {
    let adapter = open_adapter(&test_config(name))
        .await
        .expect("Failed to open adapter");
    adapter
        .save_policy(&seed_policies())
        .await
        .expect("Failed to save seed policy");
    adapter
}

async fn reload(adapter: &mut MongoAdapter) -> PolicySet {
    let mut policies = PolicySet::new();
    adapter
        .load_policy(&mut policies)
        .await
        .expect("Failed to load policy");
    policies
}

#[tokio::test]
#[ignore] // Requires running MongoDB server
async fn test_save_and_load_round_trip() {
    policy_telemetry::init_test_tracing();
    let mut adapter = open_seeded("round_trip").await;

    let policies = reload(&mut adapter).await;
    assert_eq!(policies, seed_policies());
    assert!(!adapter.is_filtered());

    adapter.clear_policy().await.expect("Failed to clear policy");
    adapter.close().await.expect("Failed to close adapter");
}

#[tokio::test]
#[ignore] // Requires running MongoDB server
async fn test_add_remove_update() {
    policy_telemetry::init_test_tracing();
    let mut adapter = open_seeded("add_remove_update").await;

    adapter
        .add_policy("p", "p", &strings(&["carol", "data3", "read"]))
        .await
        .expect("Failed to add policy");

    // 唯一索引拒绝重复规则
    let err = adapter
        .add_policy("p", "p", &strings(&["carol", "data3", "read"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Write(_)));

    adapter
        .update_policy(
            "p",
            "p",
            &strings(&["carol", "data3", "read"]),
            &strings(&["carol", "data3", "write"]),
        )
        .await
        .expect("Failed to update policy");

    adapter
        .remove_policy("p", "p", &strings(&["bob", "data2", "write"]))
        .await
        .expect("Failed to remove policy");
    adapter
        .remove_policy("p", "p", &strings(&["bob", "data2", "write"]))
        .await
        .expect("Removing a missing policy should succeed");

    let policies = reload(&mut adapter).await;
    let rules = policies.rules("p", "p");
    assert!(rules.contains(&strings(&["carol", "data3", "write"])));
    assert!(!rules.contains(&strings(&["carol", "data3", "read"])));
    assert!(!rules.contains(&strings(&["bob", "data2", "write"])));

    adapter.clear_policy().await.expect("Failed to clear policy");
    adapter.close().await.expect("Failed to close adapter");
}

#[tokio::test]
#[ignore] // Requires running MongoDB server
async fn test_filtered_load_blocks_save() {
    policy_telemetry::init_test_tracing();
    let mut adapter = open_seeded("filtered").await;

    let mut policies = PolicySet::new();
    adapter
        .load_filtered_policy(&mut policies, doc! { "ptype": "p", "v0": "alice" })
        .await
        .expect("Failed to load filtered policy");

    assert!(adapter.is_filtered());
    assert_eq!(policies.len(), 1);
    assert_eq!(policies.rules("p", "p"), &[strings(&["alice", "data1", "read"])]);

    let err = adapter.save_policy(&policies).await.unwrap_err();
    assert!(matches!(err, AdapterError::FilteredState));

    reload(&mut adapter).await;
    assert!(!adapter.is_filtered());

    adapter.clear_policy().await.expect("Failed to clear policy");
    adapter.close().await.expect("Failed to close adapter");
}

#[tokio::test]
#[ignore] // Requires running MongoDB server
async fn test_update_filtered_policies() {
    policy_telemetry::init_test_tracing();
    let mut adapter = open_seeded("update_filtered").await;

    // 副本集上走事务，单机部署上退回非事务路径，结果一致
    let removed = adapter
        .update_filtered_policies(
            "p",
            "p",
            &[strings(&["alice", "data1", "write"])],
            0,
            &strings(&["alice"]),
        )
        .await
        .expect("Failed to update filtered policies");
    assert_eq!(removed, vec![strings(&["alice", "data1", "read"])]);

    let policies = reload(&mut adapter).await;
    let rules = policies.rules("p", "p");
    assert!(rules.contains(&strings(&["alice", "data1", "write"])));
    assert!(!rules.contains(&strings(&["alice", "data1", "read"])));

    adapter
        .remove_filtered_policy("g", "g", 1, &strings(&["data2_admin"]))
        .await
        .expect("Failed to remove filtered policy");
    let policies = reload(&mut adapter).await;
    assert!(policies.rules("g", "g").is_empty());

    adapter.clear_policy().await.expect("Failed to clear policy");
    adapter.close().await.expect("Failed to close adapter");
}

#[tokio::test]
#[ignore] // Requires running MongoDB server
async fn test_closed_adapter_rejects_operations() {
    policy_telemetry::init_test_tracing();
    let mut adapter = open_seeded("closed").await;
    adapter.clear_policy().await.expect("Failed to clear policy");

    adapter.close().await.expect("Failed to close adapter");
    adapter.close().await.expect("Close should be idempotent");

    let err = adapter
        .add_policy("p", "p", &strings(&["alice", "data1", "read"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Connection(_)));
}

#[tokio::test]
async fn test_unreachable_server_fails_open() {
    policy_telemetry::init_test_tracing();
    let config = MongoConfig::new("mongodb://127.0.0.1:1")
        .with_collection("unreachable")
        .with_timeout(Duration::from_millis(200));

    // 服务器选择先于操作超时失败
    let result = open_adapter(&config).await;
    assert!(matches!(result, Err(AdapterError::Connection(_))));
}

#[tokio::test]
async fn test_invalid_url_fails_open() {
    let config = MongoConfig::new("not-a-mongodb-url");
    let result = open_adapter(&config).await;
    assert!(matches!(result, Err(AdapterError::Connection(_))));
}
