use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::BrandIdentity;
use crate::types::{AppError, AppResult};

/// Persistence collaborator for the brand aggregate. The pipeline never
/// touches storage directly: it reads the aggregate before a turn and writes
/// it back only after a fully successful turn.
#[async_trait]
pub trait BrandStore: Send + Sync {
    async fn load(&self, id: Uuid) -> AppResult<Option<BrandIdentity>>;
    async fn save(&self, id: Uuid, identity: &BrandIdentity) -> AppResult<()>;
}

// Note: runtime query_as (no compile-time checked macros) so the crate
// builds without DATABASE_URL.

#[derive(Debug, sqlx::FromRow)]
struct BrandRow {
    #[allow(dead_code)]
    id: Uuid,
    identity: serde_json::Value,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

pub struct PgBrandStore {
    pool: PgPool,
}

impl PgBrandStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BrandStore for PgBrandStore {
    async fn load(&self, id: Uuid) -> AppResult<Option<BrandIdentity>> {
        let row = sqlx::query_as::<_, BrandRow>(
            "SELECT id, identity, updated_at FROM brands WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let identity = serde_json::from_value(row.identity)
                    .map_err(|e| AppError::Internal(format!("stored brand {id} is corrupt: {e}")))?;
                Ok(Some(identity))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: Uuid, identity: &BrandIdentity) -> AppResult<()> {
        let value = serde_json::to_value(identity)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO brands (id, identity, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            ON CONFLICT (id) DO UPDATE SET identity = $2, updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
