use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{EngineHint, InteractionEvent},
    services::gateway::RecommendationEngine,
    services::stores::{EventStore, PreferenceLedger, TagCatalog},
    services::weights::WeightPolicy,
};

/// Incoming interaction payload, kind still unresolved
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionDraft {
    pub target_id: Uuid,
    pub kind: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Outcome of a batch record call.
///
/// `recorded` holds the ids of durably persisted events in input order.
/// A batch where some items failed still reports `Ok`; only a batch where
/// nothing persisted surfaces as an error.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub recorded: Vec<Uuid>,
    pub failed: usize,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Turns raw user actions into durable events and derived preference state.
///
/// The event append is the only operation the caller waits on; everything
/// downstream of it (tag lookup, ledger delta, engine hint) runs on a
/// spawned task and its failures never surface.
pub struct InteractionRecorder {
    events: Arc<dyn EventStore>,
    ledger: Arc<dyn PreferenceLedger>,
    catalog: Arc<dyn TagCatalog>,
    engine: Arc<dyn RecommendationEngine>,
    policy: WeightPolicy,
}

impl InteractionRecorder {
    pub fn new(
        events: Arc<dyn EventStore>,
        ledger: Arc<dyn PreferenceLedger>,
        catalog: Arc<dyn TagCatalog>,
        engine: Arc<dyn RecommendationEngine>,
        policy: WeightPolicy,
    ) -> Self {
        Self {
            events,
            ledger,
            catalog,
            engine,
            policy,
        }
    }

    /// Records one interaction, returning once the event row is durable
    pub async fn record(
        &self,
        user_id: Uuid,
        draft: InteractionDraft,
    ) -> AppResult<InteractionEvent> {
        let (kind, weight) = self.policy.resolve(&draft.kind)?;

        let mut event = InteractionEvent::new(user_id, draft.target_id, kind, weight);
        if let Some(parent_id) = draft.parent_id {
            event = event.with_parent(parent_id);
        }
        if let Some(metadata) = draft.metadata {
            event = event.with_metadata(metadata);
        }

        self.events.append(&event).await?;

        tracing::info!(
            user_id = %user_id,
            target_id = %event.target_id,
            kind = %kind,
            weight,
            "Interaction recorded"
        );

        self.spawn_fan_out(event.clone());

        Ok(event)
    }

    /// Records an ordered sequence of interactions with per-item semantics.
    ///
    /// Fails only when no item persisted at all (with the first error seen);
    /// any partial application is reported, not rolled back.
    pub async fn record_batch(
        &self,
        user_id: Uuid,
        drafts: Vec<InteractionDraft>,
    ) -> AppResult<BatchReport> {
        let mut recorded = Vec::with_capacity(drafts.len());
        let mut failed = 0;
        let mut first_error = None;

        for (index, draft) in drafts.into_iter().enumerate() {
            match self.record(user_id, draft).await {
                Ok(event) => recorded.push(event.id),
                Err(e) => {
                    tracing::warn!(error = %e, index, user_id = %user_id, "Batch item not recorded");
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if recorded.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        if failed > 0 {
            tracing::warn!(
                recorded = recorded.len(),
                failed,
                user_id = %user_id,
                "Batch partially recorded"
            );
        }

        Ok(BatchReport { recorded, failed })
    }

    fn spawn_fan_out(&self, event: InteractionEvent) {
        let ledger = Arc::clone(&self.ledger);
        let catalog = Arc::clone(&self.catalog);
        let engine = Arc::clone(&self.engine);

        tokio::spawn(async move {
            Self::fan_out(ledger, catalog, engine, event).await;
        });
    }

    /// Best-effort propagation of one durable event into derived state.
    ///
    /// The event row already holds the weight, so a dropped delta here is
    /// recoverable offline; nothing in this path may fail the caller.
    async fn fan_out(
        ledger: Arc<dyn PreferenceLedger>,
        catalog: Arc<dyn TagCatalog>,
        engine: Arc<dyn RecommendationEngine>,
        event: InteractionEvent,
    ) {
        match catalog.tags_of(event.target_id).await {
            Ok(tags) => {
                if let Err(e) = ledger.apply_delta(event.user_id, &tags, event.weight).await {
                    tracing::warn!(
                        error = %e,
                        user_id = %event.user_id,
                        target_id = %event.target_id,
                        delta = event.weight,
                        "Preference update failed"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    target_id = %event.target_id,
                    "Tag lookup failed, skipping preference update"
                );
            }
        }

        let hint = EngineHint::interaction(event.user_id, event.target_id, event.kind);
        if let Err(e) = engine.notify(hint).await {
            tracing::debug!(error = %e, user_id = %event.user_id, "Engine hint dropped");
        }
    }
}
