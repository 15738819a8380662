use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    cached,
    db::CacheKey,
    error::AppResult,
    models::{
        InteractionEvent, Rating, RatingStats, RecommendationContext, RecommendationPage,
        RecommendationParams,
    },
    services::{
        gateway::EngineRequest, interactions::BatchReport, stores::RatingDraft, InteractionDraft,
        RatingOutcome,
    },
};

use super::{AppState, CallerIdentity};

const RATING_STATS_CACHE_TTL: u64 = 60; // aggregate staleness bound, seconds

// Request types

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub target_id: Uuid,
    pub value: i16,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub trip_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationsRequest {
    pub context: RecommendationContext,
    #[serde(default)]
    pub params: Option<RecommendationParams>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Records one interaction; responds once the event is durable
pub async fn record_interaction(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(draft): Json<InteractionDraft>,
) -> AppResult<(StatusCode, Json<InteractionEvent>)> {
    let event = state.recorder.record(caller.0, draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Records an ordered batch of interactions.
///
/// 200 when every item persisted, 207 when only some did; a batch where
/// nothing persisted surfaces as the first item's error.
pub async fn record_interaction_batch(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(drafts): Json<Vec<InteractionDraft>>,
) -> AppResult<(StatusCode, Json<BatchReport>)> {
    let report = state.recorder.record_batch(caller.0, drafts).await?;

    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };

    Ok((status, Json(report)))
}

/// Creates or updates the caller's rating of a target
pub async fn rate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<RatingOutcome>> {
    let outcome = state
        .reconciler
        .rate(RatingDraft {
            user_id: caller.0,
            target_id: request.target_id,
            value: request.value,
            comment: request.comment,
            trip_id: request.trip_id,
        })
        .await?;

    Ok(Json(outcome))
}

/// Fetches one page of recommendations for the caller.
///
/// Engine failures surface as typed errors; falling back to an empty list
/// is the client's decision, not made here.
pub async fn recommendations(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(request): Json<RecommendationsRequest>,
) -> AppResult<Json<RecommendationPage>> {
    let engine_request = EngineRequest {
        context: request.context,
        user_id: caller.0,
        params: request.params,
    };

    let page = state.engine.recommend(&engine_request).await?;
    Ok(Json(page))
}

/// Snapshot of the caller's preference scores, for inspection and export
pub async fn get_preferences(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> AppResult<Json<HashMap<String, f64>>> {
    let scores = state.ledger.read(caller.0).await?;
    Ok(Json(scores))
}

/// The caller's own rating of a target; 404 when they have not rated it
pub async fn get_own_rating(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<Rating>> {
    let rating = state.ratings.find(caller.0, target_id).await?;
    Ok(Json(rating))
}

/// A target's aggregate rating stats, briefly cached
pub async fn get_target_rating(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<RatingStats>> {
    let stats = cached!(
        state.cache,
        CacheKey::TargetRating(target_id),
        RATING_STATS_CACHE_TTL,
        async { state.ratings.stats_for(target_id).await }
    )?;

    Ok(Json(stats))
}

/// Privacy erasure: removes the caller's events, scores, and ratings
pub async fn erase_user_data(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> AppResult<StatusCode> {
    let events = state.events.erase_user(caller.0).await?;
    let scores = state.ledger.erase_user(caller.0).await?;
    let ratings = state.ratings.erase_user(caller.0).await?;

    tracing::info!(
        user_id = %caller.0,
        events,
        scores,
        ratings,
        "User data erased"
    );

    Ok(StatusCode::NO_CONTENT)
}
