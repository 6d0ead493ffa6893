//! Database module for PostgreSQL connection and operations
//!
//! Pool setup, the read-only scalar store, the dataset loader and startup helpers.

pub mod bootstrap;
pub mod connection;
pub mod loader;
pub mod pg_store;

pub use bootstrap::{ensure_data, storage_stats, wait_for_storage, StorageStats};
pub use connection::init_pool;
pub use loader::{create_tables, load_json, load_videos, LoadStats};
pub use pg_store::PgScalarStore;
