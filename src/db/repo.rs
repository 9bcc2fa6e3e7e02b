use crate::model::{ContentType, NewPost, PostLogEntry, PostStatus};
use anyhow::Result;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, ensure the parent directory exists and
/// expand a leading `~/`. In-memory URLs and non-sqlite schemes pass
/// through untouched.
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

    let expanded_path = match path_part.strip_prefix("~/") {
        Some(tail) => match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home.trim_end_matches('/'), tail),
            Err(_) => path_part.to_string(),
        },
        None => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{expanded_path}");
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Append one publish-attempt record. Returns the new row id.
#[instrument(skip_all)]
pub async fn record_post(pool: &Pool, post: &NewPost) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO posts_log \
         (text, status, content_type, related_month, schedule_day, post_id, error_message, source_data) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&post.text)
    .bind(post.status.as_str())
    .bind(post.content_type.as_str())
    .bind(post.related_month.as_deref())
    .bind(post.schedule_day.map(i64::from))
    .bind(post.post_id.as_deref())
    .bind(post.error_message.as_deref())
    .bind(post.source_data.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

/// The dedup gate: true when a success row already exists for the
/// (content_type, month, schedule_day) slot.
#[instrument(skip_all)]
pub async fn exists_successful_post(
    pool: &Pool,
    content_type: ContentType,
    related_month: &str,
    schedule_day: u32,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM posts_log \
         WHERE content_type = ? AND related_month = ? AND schedule_day = ? AND status = ?",
    )
    .bind(content_type.as_str())
    .bind(related_month)
    .bind(i64::from(schedule_day))
    .bind(PostStatus::Success.as_str())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

#[instrument(skip_all)]
pub async fn get_state(pool: &Pool, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar("SELECT value FROM bot_state WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

#[instrument(skip_all)]
pub async fn set_state(pool: &Pool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO bot_state (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> PostLogEntry {
    PostLogEntry {
        id: row.get("id"),
        posted_at: row.get("posted_at"),
        text: row.get("text"),
        status: row.get("status"),
        content_type: row.get("content_type"),
        related_month: row.try_get("related_month").ok(),
        schedule_day: row.try_get::<Option<i64>, _>("schedule_day").ok().flatten(),
        post_id: row.try_get::<Option<String>, _>("post_id").ok().flatten(),
        error_message: row
            .try_get::<Option<String>, _>("error_message")
            .ok()
            .flatten(),
        source_data: row
            .try_get::<Option<String>, _>("source_data")
            .ok()
            .flatten(),
    }
}

const ENTRY_COLUMNS: &str = "id, posted_at, text, status, content_type, related_month, \
                             schedule_day, post_id, error_message, source_data";

/// Most recent publish attempts, newest first.
#[instrument(skip_all)]
pub async fn recent_posts(pool: &Pool, limit: i64) -> Result<Vec<PostLogEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM posts_log ORDER BY id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(row_to_entry).collect())
}

/// All attempts recorded against one publishing month, oldest first.
#[instrument(skip_all)]
pub async fn posts_for_month(pool: &Pool, related_month: &str) -> Result<Vec<PostLogEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT {ENTRY_COLUMNS} FROM posts_log WHERE related_month = ? ORDER BY id ASC"
    ))
    .bind(related_month)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(row_to_entry).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::STATE_CURRENT_MONTH;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn success_post() -> NewPost {
        NewPost {
            text: "✈️ Vuelos: 12,345".into(),
            status: PostStatus::Success,
            content_type: ContentType::MonthlySummary,
            related_month: Some("2025-09".into()),
            schedule_day: Some(0),
            post_id: Some("1234567890".into()),
            error_message: None,
            source_data: Some(r#"{"total_vuelos":12345}"#.into()),
        }
    }

    #[tokio::test]
    async fn dedup_gate_tracks_success_rows() {
        let pool = setup_pool().await;

        assert!(
            !exists_successful_post(&pool, ContentType::MonthlySummary, "2025-09", 0)
                .await
                .unwrap()
        );

        record_post(&pool, &success_post()).await.unwrap();

        assert!(
            exists_successful_post(&pool, ContentType::MonthlySummary, "2025-09", 0)
                .await
                .unwrap()
        );
        // Idempotent read.
        assert!(
            exists_successful_post(&pool, ContentType::MonthlySummary, "2025-09", 0)
                .await
                .unwrap()
        );
        // Other slots are unaffected.
        assert!(
            !exists_successful_post(&pool, ContentType::MonthlySummary, "2025-10", 0)
                .await
                .unwrap()
        );
        assert!(
            !exists_successful_post(&pool, ContentType::TopAirlines, "2025-09", 2)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn error_rows_do_not_satisfy_dedup() {
        let pool = setup_pool().await;
        let mut post = success_post();
        post.status = PostStatus::Error;
        post.post_id = None;
        post.error_message = Some("403 Forbidden".into());
        record_post(&pool, &post).await.unwrap();

        assert!(
            !exists_successful_post(&pool, ContentType::MonthlySummary, "2025-09", 0)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn record_round_trips_all_fields() {
        let pool = setup_pool().await;
        record_post(&pool, &success_post()).await.unwrap();

        let rows = posts_for_month(&pool, "2025-09").await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.text, "✈️ Vuelos: 12,345");
        assert_eq!(row.status, "success");
        assert_eq!(row.content_type, "resumen_mensual");
        assert_eq!(row.related_month.as_deref(), Some("2025-09"));
        assert_eq!(row.schedule_day, Some(0));
        assert_eq!(row.post_id.as_deref(), Some("1234567890"));
        assert!(row.error_message.is_none());
        assert_eq!(row.source_data.as_deref(), Some(r#"{"total_vuelos":12345}"#));

        let recent = recent_posts(&pool, 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, row.id);
    }

    #[tokio::test]
    async fn state_upserts() {
        let pool = setup_pool().await;
        assert!(get_state(&pool, STATE_CURRENT_MONTH).await.unwrap().is_none());

        set_state(&pool, STATE_CURRENT_MONTH, "2025-09").await.unwrap();
        assert_eq!(
            get_state(&pool, STATE_CURRENT_MONTH).await.unwrap().as_deref(),
            Some("2025-09")
        );

        set_state(&pool, STATE_CURRENT_MONTH, "2025-10").await.unwrap();
        assert_eq!(
            get_state(&pool, STATE_CURRENT_MONTH).await.unwrap().as_deref(),
            Some("2025-10")
        );

        // One row per key.
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bot_state")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn sqlite_url_normalization() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("postgres://x/y"),
            "postgres://x/y".to_string()
        );
        let td = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}/sub/dir/bot.db", td.path().display());
        let rebuilt = prepare_sqlite_url(&url);
        assert_eq!(rebuilt, url);
        assert!(td.path().join("sub/dir").is_dir());
    }
}
