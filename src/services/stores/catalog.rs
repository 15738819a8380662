use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    services::stores::TagCatalog,
};

const TAG_CACHE_TTL: u64 = 3600; // 1 hour

/// Catalog lookup over the targets table, read-through cached in Redis.
///
/// The catalog is owned elsewhere; this core only reads it, and a missing
/// target is an explicit `NotFound` rather than a backend-specific sentinel.
#[derive(Clone)]
pub struct PgTagCatalog {
    pool: PgPool,
    cache: Cache,
}

impl PgTagCatalog {
    pub fn new(pool: PgPool, cache: Cache) -> Self {
        Self { pool, cache }
    }
}

#[async_trait]
impl TagCatalog for PgTagCatalog {
    async fn tags_of(&self, target_id: Uuid) -> AppResult<Vec<String>> {
        cached!(
            self.cache,
            CacheKey::TargetTags(target_id),
            TAG_CACHE_TTL,
            async move {
                let row = sqlx::query_as::<_, (Vec<String>,)>(
                    "SELECT tags FROM targets WHERE id = $1",
                )
                .bind(target_id)
                .fetch_optional(&self.pool)
                .await?;

                match row {
                    Some((tags,)) => Ok(tags),
                    None => Err(AppError::NotFound(format!(
                        "target {} not in catalog",
                        target_id
                    ))),
                }
            }
        )
    }
}
