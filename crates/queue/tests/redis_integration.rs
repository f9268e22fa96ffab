//! Redis integration tests.
//!
//! These tests require a running Redis instance.
//! Run with: `cargo test --test redis_integration -- --ignored`
//!
//! Set `REDIS_URL` environment variable to point to your Redis instance.
//! Default: <redis://localhost:6379>

use std::sync::Arc;

use chrono::Utc;

use fred::clients::Client;
use fred::interfaces::{ClientLike, KeysInterface};
use fred::types::config::Config;
use scrapjobs_core::models::{ApiConfig, ScrapingType, SelectorConfig, SiteScrapingConfig};
use scrapjobs_queue::{
    AlertDedupStore, FailureLog, QueueInspector, QueueStorages, RedisAlertSet, RedisFailureLog,
    RedisQueueInspector, RedisTaskQueue, ScrapeSitePayload, TaskFailure, TaskQueue,
};

fn get_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

async fn fred_client() -> Arc<Client> {
    let config = Config::from_url(&get_redis_url()).expect("Invalid Redis URL");
    let client = Client::new(config, None, None, None);
    client.init().await.expect("Failed to connect to Redis");
    Arc::new(client)
}

fn site() -> SiteScrapingConfig {
    SiteScrapingConfig {
        id: 4242,
        site_name: "Integration".to_string(),
        base_url: "https://integration.example".to_string(),
        is_active: true,
        scraping_type: ScrapingType::Selector,
        selectors: SelectorConfig::default(),
        api: ApiConfig::default(),
    }
}

/// Test that the storages connect.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_queue_connection() {
    let storages = QueueStorages::connect(&get_redis_url()).await;
    assert!(storages.is_ok(), "Failed to connect to Redis: {:?}", storages.err());
}

/// Test enqueueing a scrape task.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_enqueue_scrape() {
    let storages = QueueStorages::connect(&get_redis_url())
        .await
        .expect("Failed to connect to Redis");
    let queue = RedisTaskQueue::new(storages);

    let result = queue.enqueue_scrape(ScrapeSitePayload::new(site())).await;
    assert!(result.is_ok(), "Failed to enqueue: {:?}", result.err());
}

/// Test archived counts of known and unknown queues.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_inspector_counts() {
    let storages = QueueStorages::connect(&get_redis_url())
        .await
        .expect("Failed to connect to Redis");
    let failures = RedisFailureLog::new(
        fred_client().await,
        format!("scrapjobs:test:failures:{}", std::process::id()),
        60,
    );
    let inspector = RedisQueueInspector::new(&storages, Arc::new(failures));

    assert!(inspector.archived_count("scrape:site").await.is_ok());
    assert!(inspector.archived_count("no:such:queue").await.is_err());
    assert!(inspector.archived_tasks("notify:user", 1).await.is_ok());
}

/// Test the alerted-id set.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_alert_set_marks_ids() {
    let client = fred_client().await;
    let key = format!("scrapjobs:test:alerted:{}", std::process::id());
    let set = RedisAlertSet::new(client.clone(), key.clone());
    let ids = vec!["t1".to_string(), "t2".to_string()];

    assert!(set.alerted(&ids).await.expect("smismember failed").is_empty());

    set.mark_alerted(&ids[..1], 60).await.expect("sadd failed");
    let alerted = set.alerted(&ids).await.expect("smismember failed");
    assert!(alerted.contains("t1"));
    assert!(!alerted.contains("t2"));

    let ttl: i64 = client.ttl(key.as_str()).await.expect("ttl failed");
    assert!(ttl > 0 && ttl <= 60);

    let _: i64 = client.del(key.as_str()).await.expect("del failed");
}

/// Test that recorded failures are read back per task id.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_failure_log_records_last_failure() {
    let client = fred_client().await;
    let key = format!("scrapjobs:test:failures:{}", std::process::id());
    let log = RedisFailureLog::new(client.clone(), key.clone(), 60);

    let first = TaskFailure {
        error: "timed out".to_string(),
        failed_at: Utc::now(),
    };
    let last = TaskFailure {
        error: "smtp rejected".to_string(),
        failed_at: Utc::now(),
    };
    log.record("t1", &first).await.expect("hset failed");
    log.record("t1", &last).await.expect("hset failed");

    let ids = vec!["t1".to_string(), "t2".to_string()];
    let failures = log.last_failures(&ids).await.expect("hmget failed");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures["t1"].error, "smtp rejected");

    let ttl: i64 = client.ttl(key.as_str()).await.expect("ttl failed");
    assert!(ttl > 0 && ttl <= 60);

    let _: i64 = client.del(key.as_str()).await.expect("del failed");
}
