use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub original_name: String,
    pub storage_key: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub owner_id: i64,
    pub url: String,
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str =
    "id, original_name, storage_key, size_bytes, content_type, owner_id, url, created_at";

pub struct NewFileRecord<'a> {
    pub id: Uuid,
    pub original_name: &'a str,
    pub storage_key: &'a str,
    pub size_bytes: i64,
    pub content_type: &'a str,
    pub owner_id: i64,
    pub url: &'a str,
}

impl FileRecord {
    pub async fn create(db: &PgPool, new: &NewFileRecord<'_>) -> anyhow::Result<FileRecord> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            INSERT INTO files (id, original_name, storage_key, size_bytes, content_type, owner_id, url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.original_name)
        .bind(new.storage_key)
        .bind(new.size_bytes)
        .bind(new.content_type)
        .bind(new.owner_id)
        .bind(new.url)
        .fetch_one(db)
        .await?;
        Ok(record)
    }

    /// Insert within a batch transaction so a failed batch leaves no rows.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewFileRecord<'_>,
    ) -> anyhow::Result<FileRecord> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            INSERT INTO files (id, original_name, storage_key, size_bytes, content_type, owner_id, url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.original_name)
        .bind(new.storage_key)
        .bind(new.size_bytes)
        .bind(new.content_type)
        .bind(new.owner_id)
        .bind(new.url)
        .fetch_one(&mut **tx)
        .await?;
        Ok(record)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {COLUMNS} FROM files WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(record)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list_by_owner(
        db: &PgPool,
        owner_id: i64,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecord>(&format!(
            r#"
            SELECT {COLUMNS} FROM files
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_by_owner(db: &PgPool, owner_id: i64) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    /// (count, total bytes, average bytes), optionally scoped to one owner.
    pub async fn totals(db: &PgPool, owner_id: Option<i64>) -> anyhow::Result<(i64, i64, f64)> {
        let row: (i64, i64, f64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(size_bytes), 0)::bigint,
                COALESCE(AVG(size_bytes), 0)::float8
            FROM files
            WHERE ($1::bigint IS NULL OR owner_id = $1)
            "#,
        )
        .bind(owner_id)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn counts_by_type(
        db: &PgPool,
        owner_id: Option<i64>,
    ) -> anyhow::Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT content_type, COUNT(*)
            FROM files
            WHERE ($1::bigint IS NULL OR owner_id = $1)
            GROUP BY content_type
            "#,
        )
        .bind(owner_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
