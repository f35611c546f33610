//! A durable backend storing each row as a JSON blob, keyed by name.
//! Schema is deliberately narrow - row shape evolves with the taxa/parse
//! crates faster than a migration story would be worth here.

use async_trait::async_trait;
use lrt_core::{LatRow, LrtRow};
use sqlx::SqlitePool;

use crate::{LatRepository, Repository, RepositoryError, RepositoryResult};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn connect(url: &str) -> RepositoryResult<Self> {
        let pool = SqlitePool::connect(url).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS lrt_rows (
                name TEXT PRIMARY KEY,
                inserted_at INTEGER NOT NULL,
                data TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS lat_rows (
                law_name TEXT NOT NULL,
                position INTEGER NOT NULL,
                data TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn get(&self, name: &str) -> RepositoryResult<Option<LrtRow>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM lrt_rows WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, row: LrtRow) -> RepositoryResult<()> {
        let merged = match self.get(&row.name).await? {
            Some(existing) => lrt_core::merge_rows(&existing, row),
            None => row,
        };
        let data = serde_json::to_string(&merged)?;
        sqlx::query(
            "INSERT INTO lrt_rows (name, inserted_at, data) VALUES (?, (SELECT COALESCE(MAX(inserted_at), 0) + 1 FROM lrt_rows), ?)
             ON CONFLICT(name) DO UPDATE SET data = excluded.data",
        )
        .bind(&merged.name)
        .bind(&data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all(&self) -> RepositoryResult<Vec<LrtRow>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM lrt_rows ORDER BY inserted_at ASC")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|(data,)| serde_json::from_str(&data).map_err(RepositoryError::from))
            .collect()
    }

    async fn delete(&self, name: &str) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM lrt_rows WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn lookup_is_making(
        &self,
        names: &[String],
    ) -> RepositoryResult<std::collections::HashMap<String, bool>> {
        if names.is_empty() {
            return Ok(std::collections::HashMap::new());
        }
        let placeholders = names.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!("SELECT data FROM lrt_rows WHERE name IN ({placeholders})");
        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        for name in names {
            query = query.bind(name);
        }
        let rows = query.fetch_all(&self.pool).await?;
        let mut result = std::collections::HashMap::with_capacity(rows.len());
        for (data,) in rows {
            let row: LrtRow = serde_json::from_str(&data)?;
            result.insert(row.name.clone(), row.is_making);
        }
        Ok(result)
    }
}

#[async_trait]
impl LatRepository for SqliteRepository {
    async fn replace_rows(&self, law_name: &str, rows: Vec<LatRow>) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM lat_rows WHERE law_name = ?")
            .bind(law_name)
            .execute(&mut *tx)
            .await?;
        for row in &rows {
            let data = serde_json::to_string(row)?;
            sqlx::query("INSERT INTO lat_rows (law_name, position, data) VALUES (?, ?, ?)")
                .bind(law_name)
                .bind(row.position as i64)
                .bind(&data)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn rows_for(&self, law_name: &str) -> RepositoryResult<Vec<LatRow>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM lat_rows WHERE law_name = ? ORDER BY position ASC")
                .bind(law_name)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|(data,)| serde_json::from_str(&data).map_err(RepositoryError::from))
            .collect()
    }

    async fn delete_rows(&self, law_name: &str) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM lat_rows WHERE law_name = ?")
            .bind(law_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
