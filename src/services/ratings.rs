use std::sync::Arc;

use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{EngineHint, Rating},
    services::gateway::RecommendationEngine,
    services::stores::{PreferenceLedger, RatingDraft, RatingStore, TagCatalog},
    services::weights::WeightPolicy,
};

/// Result of reconciling one rating submission.
///
/// `average` is the freshly recomputed mean over all of the target's
/// ratings; `None` means the recompute failed after the rating itself was
/// already durable.
#[derive(Debug, Serialize)]
pub struct RatingOutcome {
    pub rating: Rating,
    pub average: Option<f64>,
}

/// Idempotent create-or-update of a user's rating for a target.
///
/// The upsert is the durable effect; the aggregate recompute is best-effort
/// reporting, and the ledger delta plus engine hint run on a spawned task
/// whose failures never surface. Each submission contributes its own ledger
/// delta: re-rating does not retract the previous contribution.
pub struct RatingReconciler {
    ratings: Arc<dyn RatingStore>,
    ledger: Arc<dyn PreferenceLedger>,
    catalog: Arc<dyn TagCatalog>,
    engine: Arc<dyn RecommendationEngine>,
    policy: WeightPolicy,
}

impl RatingReconciler {
    pub fn new(
        ratings: Arc<dyn RatingStore>,
        ledger: Arc<dyn PreferenceLedger>,
        catalog: Arc<dyn TagCatalog>,
        engine: Arc<dyn RecommendationEngine>,
        policy: WeightPolicy,
    ) -> Self {
        Self {
            ratings,
            ledger,
            catalog,
            engine,
            policy,
        }
    }

    pub async fn rate(&self, draft: RatingDraft) -> AppResult<RatingOutcome> {
        if !(1..=5).contains(&draft.value) {
            return Err(AppError::InvalidRating(draft.value));
        }

        let rating = self.ratings.upsert(&draft).await?;

        let average = match self.ratings.stats_for(rating.target_id).await {
            Ok(stats) => Some(stats.average),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    target_id = %rating.target_id,
                    "Average recompute failed, rating stands"
                );
                None
            }
        };

        tracing::info!(
            user_id = %rating.user_id,
            target_id = %rating.target_id,
            value = rating.value,
            "Rating reconciled"
        );

        self.spawn_fan_out(rating.clone());

        Ok(RatingOutcome { rating, average })
    }

    fn spawn_fan_out(&self, rating: Rating) {
        let ledger = Arc::clone(&self.ledger);
        let catalog = Arc::clone(&self.catalog);
        let engine = Arc::clone(&self.engine);
        let delta = self.policy.rating_delta(rating.value);

        tokio::spawn(async move {
            Self::fan_out(ledger, catalog, engine, rating, delta).await;
        });
    }

    /// Best-effort ledger delta and refresh hint for one reconciled rating
    async fn fan_out(
        ledger: Arc<dyn PreferenceLedger>,
        catalog: Arc<dyn TagCatalog>,
        engine: Arc<dyn RecommendationEngine>,
        rating: Rating,
        delta: f64,
    ) {
        match catalog.tags_of(rating.target_id).await {
            Ok(tags) => {
                if let Err(e) = ledger.apply_delta(rating.user_id, &tags, delta).await {
                    tracing::warn!(
                        error = %e,
                        user_id = %rating.user_id,
                        target_id = %rating.target_id,
                        delta,
                        "Preference update failed"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    target_id = %rating.target_id,
                    "Tag lookup failed, skipping preference update"
                );
            }
        }

        if let Err(e) = engine.notify(EngineHint::refresh(rating.user_id)).await {
            tracing::debug!(error = %e, user_id = %rating.user_id, "Engine hint dropped");
        }
    }
}
