//! Storage seams consumed by the interaction/preference core.
//!
//! Every store is injected as an `Arc<dyn _>` at construction so tests can
//! substitute in-memory implementations; nothing reaches for an ambient
//! process-wide client.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{InteractionEvent, Rating, RatingStats};

pub mod catalog;
pub mod postgres;

pub use catalog::PgTagCatalog;
pub use postgres::{PgEventStore, PgPreferenceLedger, PgRatingStore};

/// Append-only store of raw interaction events
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Durably appends one immutable event
    async fn append(&self, event: &InteractionEvent) -> AppResult<()>;

    /// Removes every event recorded for a user (privacy erasure); returns
    /// the number of rows removed
    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64>;
}

/// Per-(user, tag) running preference scores.
///
/// Scores are mutated exclusively through `apply_delta`, whose combining
/// operator is addition: commutative and associative, so any interleaving of
/// concurrent writers converges on the same total. Implementations must make
/// each delta atomic at the storage layer; a read-then-write-back sequence
/// loses updates and is not an acceptable implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PreferenceLedger: Send + Sync {
    /// Adds `delta` to the score of every `(user_id, tag)` pair, creating
    /// missing rows at `delta`
    async fn apply_delta(&self, user_id: Uuid, tags: &[String], delta: f64) -> AppResult<()>;

    /// Snapshot of a user's scores, for inspection and export
    async fn read(&self, user_id: Uuid) -> AppResult<HashMap<String, f64>>;

    /// Removes every score for a user (privacy erasure); returns rows removed
    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64>;
}

/// Fields of a rating submission
#[derive(Debug, Clone)]
pub struct RatingDraft {
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub value: i16,
    pub comment: Option<String>,
    pub trip_id: Option<Uuid>,
}

/// Ratings, unique on (user, target).
///
/// The uniqueness constraint lives in the store so concurrent submissions
/// for the same pair serialize there; callers never read-then-branch.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    /// Inserts the rating or updates the existing (user, target) row in one
    /// race-safe operation, returning the stored row
    async fn upsert(&self, draft: &RatingDraft) -> AppResult<Rating>;

    /// Arithmetic mean and count over all current ratings of a target
    async fn stats_for(&self, target_id: Uuid) -> AppResult<RatingStats>;

    /// Point lookup of one user's rating; `NotFound` when absent
    async fn find(&self, user_id: Uuid, target_id: Uuid) -> AppResult<Rating>;

    /// Removes every rating submitted by a user; returns rows removed
    async fn erase_user(&self, user_id: Uuid) -> AppResult<u64>;
}

/// Read-only lookup of a target's tags, owned by the catalog service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TagCatalog: Send + Sync {
    /// Tags of a catalog target; `NotFound` for an unknown target
    async fn tags_of(&self, target_id: Uuid) -> AppResult<Vec<String>>;
}
