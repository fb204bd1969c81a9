use super::model::SnapshotRow;
use crate::model::SnapshotRecord;
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/`, create the parent
/// directory and make sure the file gets created. In-memory and non-sqlite
/// URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    match query_part {
        Some(q) if q.contains("mode=") => {
            rebuilt.push('?');
            rebuilt.push_str(q);
        }
        Some(q) => {
            rebuilt.push('?');
            rebuilt.push_str(q);
            rebuilt.push_str("&mode=rwc");
        }
        None => rebuilt.push_str("?mode=rwc"),
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Append `records` in one transaction. Rows whose `insert_id` already exists
/// are skipped. Returns the number of rows actually added.
#[instrument(skip_all, fields(count = records.len()))]
pub async fn insert_snapshots(pool: &Pool, records: &[SnapshotRecord]) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;
    for rec in records {
        let tags = serde_json::to_string(&rec.tags).unwrap_or_else(|_| "[]".into());
        let topics = serde_json::to_string(&rec.topic_details).unwrap_or_else(|_| "[]".into());
        let res = sqlx::query(
            "INSERT OR IGNORE INTO video_snapshots (
                insert_id, dt, channel_id, video_id, title, channel_name, tags, is_short,
                views, likes, comments, published_at, created_at, duration_sec,
                content_details, topic_details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&rec.insert_id)
        .bind(rec.dt)
        .bind(&rec.channel_id)
        .bind(&rec.video_id)
        .bind(&rec.title)
        .bind(&rec.channel_name)
        .bind(tags)
        .bind(rec.is_short)
        .bind(rec.views)
        .bind(rec.likes)
        .bind(rec.comments)
        .bind(rec.published_at)
        .bind(rec.created_at)
        .bind(rec.duration_sec)
        .bind(&rec.content_details)
        .bind(topics)
        .execute(&mut *tx)
        .await?;
        inserted += res.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}

#[instrument(skip_all)]
pub async fn snapshots_for_date(pool: &Pool, dt: NaiveDate) -> Result<Vec<SnapshotRow>> {
    let rows = sqlx::query_as::<_, SnapshotRow>(
        "SELECT insert_id, dt, channel_id, video_id, title, channel_name, tags, is_short,
                views, likes, comments, published_at, created_at, duration_sec,
                content_details, topic_details
         FROM video_snapshots WHERE dt = ? ORDER BY channel_id, video_id",
    )
    .bind(dt)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn count_snapshots(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_snapshots")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
