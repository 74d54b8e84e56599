//! Redis queue integration tests.
//!
//! Run with: `cargo test -p vscribe-queue --test redis_queue -- --ignored`

use std::time::Duration;

use vscribe_models::{JobId, JobMessage};
use vscribe_queue::{JobQueue, QueueConfig, RedisQueue};

fn test_config(queue_name: &str) -> QueueConfig {
    dotenvy::dotenv().ok();
    QueueConfig {
        queue_name: queue_name.to_string(),
        max_connections: 4,
        ..QueueConfig::from_env()
    }
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_push_pop_fifo() {
    let queue = RedisQueue::connect(test_config("vscribe:test:fifo"))
        .await
        .expect("Failed to connect to Redis");

    let first = JobMessage::new(JobId::new());
    let second = JobMessage::new(JobId::new());
    queue.push(&first).await.expect("Failed to push");
    queue.push(&second).await.expect("Failed to push");

    let popped = queue.pop(Duration::from_secs(1)).await.expect("pop failed");
    assert_eq!(popped, Some(first));
    let popped = queue.pop(Duration::from_secs(1)).await.expect("pop failed");
    assert_eq!(popped, Some(second));

    queue.close();
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_pop_times_out_on_empty_queue() {
    let queue = RedisQueue::connect(test_config("vscribe:test:empty"))
        .await
        .expect("Failed to connect to Redis");

    let popped = queue.pop(Duration::from_millis(200)).await.expect("pop failed");
    assert!(popped.is_none());
    assert_eq!(queue.len().await.expect("len failed"), 0);
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn test_malformed_payload_is_reported() {
    let config = test_config("vscribe:test:malformed");
    let queue = RedisQueue::connect(config.clone())
        .await
        .expect("Failed to connect to Redis");

    let client = redis::Client::open(config.redis_url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("LPUSH")
        .arg(&config.queue_name)
        .arg(r#"{"video":"no job id"}"#)
        .query_async::<()>(&mut conn)
        .await
        .unwrap();

    let err = queue.pop(Duration::from_secs(1)).await.unwrap_err();
    assert!(err.is_invalid_payload());
}
