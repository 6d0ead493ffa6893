//! Schema Descriptor
//!
//! Static description of the two relations the pipeline knows about. The same DDL text is
//! handed to the primary generator as prompt context and executed by the loader.

/// Entity relation: one row per tracked video.
pub const VIDEOS: &str = "videos";

/// Time-series relation: one row per observation of a video's counters.
pub const VIDEO_SNAPSHOTS: &str = "video_snapshots";

/// Both relation names, longest first so substring checks never confuse the two.
pub const KNOWN_RELATIONS: [&str; 2] = [VIDEO_SNAPSHOTS, VIDEOS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    BigSerial,
    Timestamp,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub name: &'static str,
    pub columns: &'static [Column],
}

const fn col(name: &'static str, column_type: ColumnType) -> Column {
    Column { name, column_type }
}

pub const VIDEOS_RELATION: Relation = Relation {
    name: VIDEOS,
    columns: &[
        col("id", ColumnType::Text),
        col("creator_id", ColumnType::Text),
        col("video_created_at", ColumnType::Timestamp),
        col("views_count", ColumnType::Integer),
        col("likes_count", ColumnType::Integer),
        col("comments_count", ColumnType::Integer),
        col("reports_count", ColumnType::Integer),
        col("created_at", ColumnType::Timestamp),
        col("updated_at", ColumnType::Timestamp),
    ],
};

pub const VIDEO_SNAPSHOTS_RELATION: Relation = Relation {
    name: VIDEO_SNAPSHOTS,
    columns: &[
        col("id", ColumnType::BigSerial),
        col("video_id", ColumnType::Text),
        col("views_count", ColumnType::Integer),
        col("likes_count", ColumnType::Integer),
        col("comments_count", ColumnType::Integer),
        col("reports_count", ColumnType::Integer),
        col("delta_views_count", ColumnType::Integer),
        col("delta_likes_count", ColumnType::Integer),
        col("delta_comments_count", ColumnType::Integer),
        col("delta_reports_count", ColumnType::Integer),
        col("created_at", ColumnType::Timestamp),
        col("updated_at", ColumnType::Timestamp),
    ],
};

pub const RELATIONS: [Relation; 2] = [VIDEOS_RELATION, VIDEO_SNAPSHOTS_RELATION];

/// SQL to create the `videos` table.
pub const CREATE_VIDEOS_TABLE_SQL: &str = "CREATE TABLE videos (
    id VARCHAR(255) PRIMARY KEY,
    creator_id VARCHAR(255) NOT NULL,
    video_created_at TIMESTAMP NOT NULL,
    views_count INTEGER NOT NULL DEFAULT 0,
    likes_count INTEGER NOT NULL DEFAULT 0,
    comments_count INTEGER NOT NULL DEFAULT 0,
    reports_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

/// SQL to create the `video_snapshots` table. Snapshots go away with their video.
pub const CREATE_VIDEO_SNAPSHOTS_TABLE_SQL: &str = "CREATE TABLE video_snapshots (
    id BIGSERIAL PRIMARY KEY,
    video_id VARCHAR(255) NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    views_count INTEGER NOT NULL DEFAULT 0,
    likes_count INTEGER NOT NULL DEFAULT 0,
    comments_count INTEGER NOT NULL DEFAULT 0,
    reports_count INTEGER NOT NULL DEFAULT 0,
    delta_views_count INTEGER NOT NULL DEFAULT 0,
    delta_likes_count INTEGER NOT NULL DEFAULT 0,
    delta_comments_count INTEGER NOT NULL DEFAULT 0,
    delta_reports_count INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);";

pub const CREATE_INDEXES_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_videos_creator_id ON videos(creator_id)",
    "CREATE INDEX IF NOT EXISTS idx_videos_created_at ON videos(video_created_at)",
    "CREATE INDEX IF NOT EXISTS idx_snapshots_video_id ON video_snapshots(video_id)",
    "CREATE INDEX IF NOT EXISTS idx_snapshots_created_at ON video_snapshots(created_at)",
];

/// Drop statements, dependents first.
pub const DROP_TABLES_SQL: &[&str] = &[
    "DROP TABLE IF EXISTS video_snapshots CASCADE",
    "DROP TABLE IF EXISTS videos CASCADE",
];

/// Textual schema used as generator context.
pub fn schema_ddl() -> String {
    format!("{}\n\n{}", CREATE_VIDEOS_TABLE_SQL, CREATE_VIDEO_SNAPSHOTS_TABLE_SQL)
}

pub fn is_known_relation(name: &str) -> bool {
    RELATIONS.iter().any(|r| r.name.eq_ignore_ascii_case(name))
}

/// True if `text` mentions either relation name anywhere (case-insensitive).
pub fn mentions_known_relation(text: &str) -> bool {
    let lower = text.to_lowercase();
    KNOWN_RELATIONS.iter().any(|r| lower.contains(r))
}
