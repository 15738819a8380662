use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{InteractionEvent, Rating, RatingStats},
    services::stores::{EventStore, PreferenceLedger, RatingDraft, RatingStore},
};

/// Append-only interaction-event store backed by Postgres
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: &InteractionEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO interaction_events
                (id, user_id, target_id, parent_id, kind, weight, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(event.target_id)
        .bind(event.parent_id)
        .bind(event.kind.as_str())
        .bind(event.weight)
        .bind(&event.metadata)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM interaction_events WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Preference ledger backed by Postgres.
///
/// `apply_delta` is a single additive upsert over the unnested tag array:
/// the conflict clause adds to the stored score in place, so concurrent
/// deltas for the same (user, tag) both land regardless of interleaving.
#[derive(Clone)]
pub struct PgPreferenceLedger {
    pool: PgPool,
}

impl PgPreferenceLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceLedger for PgPreferenceLedger {
    async fn apply_delta(&self, user_id: Uuid, tags: &[String], delta: f64) -> AppResult<()> {
        if tags.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO preference_scores (user_id, tag, score, updated_at)
            SELECT $1, t.tag, $3, now()
            FROM UNNEST($2::text[]) AS t(tag)
            ON CONFLICT (user_id, tag)
            DO UPDATE SET
                score = preference_scores.score + EXCLUDED.score,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(tags)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read(&self, user_id: Uuid) -> AppResult<HashMap<String, f64>> {
        let rows = sqlx::query_as::<_, (String, f64)>(
            "SELECT tag, score FROM preference_scores WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM preference_scores WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Rating store backed by Postgres.
///
/// The `(user_id, target_id)` unique constraint plus `ON CONFLICT` makes the
/// upsert race-safe: two concurrent submissions for one pair resolve to a
/// single row, last write winning on the value.
#[derive(Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingStore for PgRatingStore {
    async fn upsert(&self, draft: &RatingDraft) -> AppResult<Rating> {
        let rating = sqlx::query_as::<_, Rating>(
            r#"
            INSERT INTO ratings (user_id, target_id, value, comment, trip_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, target_id)
            DO UPDATE SET
                value = EXCLUDED.value,
                comment = EXCLUDED.comment,
                trip_id = EXCLUDED.trip_id,
                updated_at = now()
            RETURNING id, user_id, target_id, value, comment, trip_id, created_at, updated_at
            "#,
        )
        .bind(draft.user_id)
        .bind(draft.target_id)
        .bind(draft.value)
        .bind(&draft.comment)
        .bind(draft.trip_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(rating)
    }

    async fn stats_for(&self, target_id: Uuid) -> AppResult<RatingStats> {
        let (average, count) = sqlx::query_as::<_, (Option<f64>, i64)>(
            "SELECT AVG(value)::float8, COUNT(*) FROM ratings WHERE target_id = $1",
        )
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingStats {
            average: average.unwrap_or(0.0),
            count,
        })
    }

    async fn find(&self, user_id: Uuid, target_id: Uuid) -> AppResult<Rating> {
        let rating = sqlx::query_as::<_, Rating>(
            r#"
            SELECT id, user_id, target_id, value, comment, trip_id, created_at, updated_at
            FROM ratings
            WHERE user_id = $1 AND target_id = $2
            "#,
        )
        .bind(user_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        rating.ok_or_else(|| {
            AppError::NotFound(format!("no rating for target {} by user {}", target_id, user_id))
        })
    }

    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM ratings WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
