//! Postgres store integration tests.
//!
//! Run with: `cargo test -p vscribe-store --test postgres_store -- --ignored`

use vscribe_models::{JobId, JobStatus, JobUpdate};
use vscribe_store::{JobStore, PostgresJobStore, StoreConfig};

const SCHEMA: &str = include_str!("../migrations/0001_jobs_and_videos.sql");

async fn test_store() -> PostgresJobStore {
    dotenvy::dotenv().ok();
    let config = StoreConfig::from_env().expect("DATABASE_URL must be set");
    let store = PostgresJobStore::connect(&config)
        .await
        .expect("Failed to connect to Postgres");
    sqlx::raw_sql(SCHEMA)
        .execute(store.pool())
        .await
        .expect("Failed to apply schema");
    store
}

async fn insert_job(store: &PostgresJobStore, url: Option<&str>) -> JobId {
    let job_id = JobId::new();
    sqlx::query("INSERT INTO jobs (id, status) VALUES ($1, 'pending')")
        .bind(job_id.as_str())
        .execute(store.pool())
        .await
        .expect("Failed to insert job");

    if let Some(url) = url {
        sqlx::query(
            "INSERT INTO videos (id, url, platform, title, job_id) VALUES ($1, $2, 'youtube', 'test', $3)",
        )
        .bind(JobId::new().as_str())
        .bind(url)
        .bind(job_id.as_str())
        .execute(store.pool())
        .await
        .expect("Failed to insert video");
    }
    job_id
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_video_url_lookup() {
    let store = test_store().await;
    let job_id = insert_job(&store, Some("https://youtu.be/abc")).await;

    let url = store.get_video_url(&job_id).await.expect("lookup failed");
    assert_eq!(url.as_deref(), Some("https://youtu.be/abc"));

    let missing = insert_job(&store, None).await;
    assert!(store.get_video_url(&missing).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_done_then_failed_keeps_transcript() {
    let store = test_store().await;
    let job_id = insert_job(&store, Some("https://youtu.be/abc")).await;

    assert!(store
        .update_status(&job_id, &JobUpdate::done("hello world"))
        .await
        .unwrap());
    let job = store.get_job(&job_id).await.unwrap().expect("job exists");
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.transcript.as_deref(), Some("hello world"));
    assert!(job.error.is_none());

    assert!(store
        .update_status(&job_id, &JobUpdate::failed("late failure"))
        .await
        .unwrap());
    let job = store.get_job(&job_id).await.unwrap().expect("job exists");
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("late failure"));
    assert_eq!(job.transcript.as_deref(), Some("hello world"));
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn test_update_unknown_job_does_not_apply() {
    let store = test_store().await;
    let applied = store
        .update_status(&JobId::new(), &JobUpdate::failed("nope"))
        .await
        .unwrap();
    assert!(!applied);
    store.ping().await.expect("ping failed");
    store.close().await;
}
