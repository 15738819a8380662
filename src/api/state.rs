use std::sync::Arc;

use crate::db::Cache;
use crate::services::gateway::RecommendationEngine;
use crate::services::stores::{EventStore, PreferenceLedger, RatingStore};
use crate::services::{InteractionRecorder, RatingReconciler};

/// Shared application state.
///
/// Everything is an explicitly constructed, injected handle; tests build a
/// state over in-memory stores and a fake engine.
#[derive(Clone)]
pub struct AppState {
    pub recorder: Arc<InteractionRecorder>,
    pub reconciler: Arc<RatingReconciler>,
    pub engine: Arc<dyn RecommendationEngine>,
    pub ledger: Arc<dyn PreferenceLedger>,
    pub events: Arc<dyn EventStore>,
    pub ratings: Arc<dyn RatingStore>,
    pub cache: Cache,
}
