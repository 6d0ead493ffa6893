//! Bulk loader: populates `videos` and `video_snapshots` from a JSON export.

use crate::error::{Result, VidsqlError};
use crate::schema;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use sqlx::PgPool;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub creator_id: String,
    pub video_created_at: String,
    pub views_count: i32,
    pub likes_count: i32,
    pub comments_count: i32,
    pub reports_count: i32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub snapshots: Vec<SnapshotRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRecord {
    pub views_count: i32,
    pub likes_count: i32,
    pub comments_count: i32,
    pub reports_count: i32,
    #[serde(default)]
    pub delta_views_count: i32,
    #[serde(default)]
    pub delta_likes_count: i32,
    #[serde(default)]
    pub delta_comments_count: i32,
    #[serde(default)]
    pub delta_reports_count: i32,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The export is either a bare array or an object with a `videos` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Export {
    List(Vec<VideoRecord>),
    Wrapped {
        #[serde(default)]
        videos: Vec<VideoRecord>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub videos: usize,
    pub snapshots: usize,
}

pub fn parse_export(json: &str) -> Result<Vec<VideoRecord>> {
    let export: Export = serde_json::from_str(json)?;
    Ok(match export {
        Export::List(videos) => videos,
        Export::Wrapped { videos } => videos,
    })
}

/// RFC 3339 timestamp (`Z` or offset) to naive UTC, as the schema stores it.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| VidsqlError::Load(format!("Invalid timestamp '{}': {}", value, e)))
}

/// Drop and recreate both relations and their indexes.
pub async fn create_tables(pool: &PgPool) -> Result<()> {
    for statement in schema::DROP_TABLES_SQL {
        sqlx::query(statement).execute(pool).await?;
    }
    sqlx::query(schema::CREATE_VIDEOS_TABLE_SQL).execute(pool).await?;
    sqlx::query(schema::CREATE_VIDEO_SNAPSHOTS_TABLE_SQL)
        .execute(pool)
        .await?;
    for statement in schema::CREATE_INDEXES_SQL {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Tables created");
    Ok(())
}

pub async fn load_json(pool: &PgPool, path: &Path) -> Result<LoadStats> {
    let json = tokio::fs::read_to_string(path).await?;
    let videos = parse_export(&json)?;
    info!("Found videos: {}", videos.len());

    create_tables(pool).await?;
    load_videos(pool, &videos).await
}

/// Replace the contents of both relations with `videos` in one transaction.
pub async fn load_videos(pool: &PgPool, videos: &[VideoRecord]) -> Result<LoadStats> {
    let mut tx = pool.begin().await?;
    sqlx::query("TRUNCATE TABLE video_snapshots CASCADE")
        .execute(&mut *tx)
        .await?;
    sqlx::query("TRUNCATE TABLE videos CASCADE")
        .execute(&mut *tx)
        .await?;

    let mut stats = LoadStats::default();
    for video in videos {
        let video_created_at = parse_timestamp(&video.video_created_at)?;
        let created_at = match &video.created_at {
            Some(ts) => parse_timestamp(ts)?,
            None => video_created_at,
        };
        let updated_at = match &video.updated_at {
            Some(ts) => parse_timestamp(ts)?,
            None => video_created_at,
        };

        sqlx::query(
            r#"
            INSERT INTO videos (id, creator_id, video_created_at, views_count, likes_count,
                comments_count, reports_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                creator_id = EXCLUDED.creator_id, video_created_at = EXCLUDED.video_created_at,
                views_count = EXCLUDED.views_count, likes_count = EXCLUDED.likes_count,
                comments_count = EXCLUDED.comments_count, reports_count = EXCLUDED.reports_count,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&video.id)
        .bind(&video.creator_id)
        .bind(video_created_at)
        .bind(video.views_count)
        .bind(video.likes_count)
        .bind(video.comments_count)
        .bind(video.reports_count)
        .bind(created_at)
        .bind(updated_at)
        .execute(&mut *tx)
        .await?;
        stats.videos += 1;

        for snapshot in &video.snapshots {
            let observed_at = parse_timestamp(&snapshot.created_at)?;
            let updated_at = match &snapshot.updated_at {
                Some(ts) => parse_timestamp(ts)?,
                None => observed_at,
            };

            sqlx::query(
                r#"
                INSERT INTO video_snapshots (video_id, views_count, likes_count, comments_count,
                    reports_count, delta_views_count, delta_likes_count, delta_comments_count,
                    delta_reports_count, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(&video.id)
            .bind(snapshot.views_count)
            .bind(snapshot.likes_count)
            .bind(snapshot.comments_count)
            .bind(snapshot.reports_count)
            .bind(snapshot.delta_views_count)
            .bind(snapshot.delta_likes_count)
            .bind(snapshot.delta_comments_count)
            .bind(snapshot.delta_reports_count)
            .bind(observed_at)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
            stats.snapshots += 1;
        }
    }

    tx.commit().await?;
    info!("Loaded {} videos, {} snapshots", stats.videos, stats.snapshots);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "videos": [{
            "id": "ecd8a4e4-1f24-4b97-a944-35d17078ce7c",
            "creator_id": "aca1061a9d324ecf8c3fa2bb32d7be63",
            "video_created_at": "2025-11-26T11:00:08.983295+00:00",
            "views_count": 1500,
            "likes_count": 30,
            "comments_count": 2,
            "reports_count": 0,
            "snapshots": [{
                "views_count": 1500,
                "likes_count": 30,
                "comments_count": 2,
                "reports_count": 0,
                "delta_views_count": 120,
                "created_at": "2025-11-28T10:00:00Z"
            }]
        }]
    }"#;

    #[test]
    fn test_parse_wrapped_export() {
        let videos = parse_export(EXPORT).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].snapshots.len(), 1);
        assert_eq!(videos[0].snapshots[0].delta_views_count, 120);
        assert_eq!(videos[0].snapshots[0].delta_likes_count, 0);
        assert!(videos[0].created_at.is_none());
    }

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[{"id": "v1", "creator_id": "c1", "video_created_at": "2025-01-01T00:00:00Z",
            "views_count": 1, "likes_count": 0, "comments_count": 0, "reports_count": 0}]"#;
        let videos = parse_export(json).unwrap();
        assert_eq!(videos[0].id, "v1");
        assert!(videos[0].snapshots.is_empty());
    }

    #[test]
    fn test_timestamps_become_naive_utc() {
        let ts = parse_timestamp("2025-11-28T13:00:00+03:00").unwrap();
        assert_eq!(ts.to_string(), "2025-11-28 10:00:00");
        let ts = parse_timestamp("2025-11-28T10:00:00Z").unwrap();
        assert_eq!(ts.to_string(), "2025-11-28 10:00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }
}
