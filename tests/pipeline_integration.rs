mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::{harness, FakeApi};
use sqlx::sqlite::SqlitePoolOptions;
use trend_tracker::db::{self, Pool, SqliteSink};
use trend_tracker::model::Channel;
use trend_tracker::RunSettings;

async fn setup_pool() -> Pool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

fn fake_api() -> Arc<FakeApi> {
    Arc::new(
        FakeApi::new()
            .with_channel("UCa", vec![vec!["a1", "a2"], vec!["a3"]])
            .with_channel("UCb", vec![vec!["b1"]])
            .missing("UCgone"),
    )
}

fn channels() -> Vec<Channel> {
    ["UCa", "UCb", "UCgone"].into_iter().map(Channel::new).collect()
}

#[tokio::test]
async fn rerunning_the_same_day_does_not_duplicate_rows() {
    let pool = setup_pool().await;
    let day = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();

    for _ in 0..2 {
        let h = harness(
            fake_api(),
            Arc::new(SqliteSink::new(pool.clone())),
            RunSettings::default(),
        );
        let result = h.orchestrator.run(&channels(), day).await.unwrap();
        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 1);
    }

    assert_eq!(db::count_snapshots(&pool).await.unwrap(), 4);
    let rows = db::snapshots_for_date(&pool, day).await.unwrap();
    assert_eq!(rows.len(), 4);
    let a1 = rows.iter().find(|r| r.insert_id == "2025-08-01:UCa:a1").unwrap();
    assert_eq!(a1.channel_name.as_deref(), Some("UCa display"));
    assert_eq!(a1.views, Some(100));
    assert_eq!(a1.duration_sec, Some(45));
    assert!(a1.is_short);
    assert_eq!(a1.tag_list(), vec!["tag".to_string()]);
}

#[tokio::test]
async fn a_new_day_adds_a_fresh_snapshot_per_item() {
    let pool = setup_pool().await;
    let first = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
    let second = first.succ_opt().unwrap();

    for day in [first, second] {
        let h = harness(
            fake_api(),
            Arc::new(SqliteSink::new(pool.clone())),
            RunSettings::default(),
        );
        h.orchestrator.run(&channels(), day).await.unwrap();
    }

    assert_eq!(db::count_snapshots(&pool).await.unwrap(), 8);
    assert_eq!(db::snapshots_for_date(&pool, second).await.unwrap().len(), 4);
}
