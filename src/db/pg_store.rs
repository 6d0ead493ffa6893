//! Postgres-backed scalar store

use crate::error::Result;
use crate::execution::engine::ScalarStore;
use crate::execution::result::ScalarValue;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Column, Executor, PgPool, Row, TypeInfo};

pub struct PgScalarStore {
    pool: PgPool,
}

impl PgScalarStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScalarStore for PgScalarStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_scalar(&self, sql: &str) -> Result<Option<ScalarValue>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;

        // Simple-protocol rows arrive in text format, so every column type decodes as text.
        let row = (&mut *tx).fetch_optional(sqlx::raw_sql(sql)).await?;
        tx.rollback().await?;

        match row {
            Some(row) => first_value(&row),
            None => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }
}

fn first_value(row: &PgRow) -> Result<Option<ScalarValue>> {
    let Some(column) = row.columns().first() else {
        return Ok(None);
    };
    let type_name = column.type_info().name().to_string();
    let text: Option<String> = row.try_get_unchecked(0)?;
    Ok(text.map(|t| ScalarValue::from_text(&type_name, &t)))
}
