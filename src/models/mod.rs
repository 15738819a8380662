use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use uuid::Uuid;

/// Kind of a recorded user interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    Click,
    Save,
    Share,
    Message,
    Book,
    SwipeLeft,
    SwipeRight,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Click => "click",
            InteractionKind::Save => "save",
            InteractionKind::Share => "share",
            InteractionKind::Message => "message",
            InteractionKind::Book => "book",
            InteractionKind::SwipeLeft => "swipe_left",
            InteractionKind::SwipeRight => "swipe_right",
        }
    }
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of a single user action against a listing target.
///
/// Rows are append-only: the event is the durable signal of record, and
/// derived state (preference scores) is always recomputable from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub kind: InteractionKind,
    pub weight: f64,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn new(user_id: Uuid, target_id: Uuid, kind: InteractionKind, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            target_id,
            parent_id: None,
            kind,
            weight,
            metadata: Value::Object(Default::default()),
            created_at: Utc::now(),
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A user's star rating of a target, unique per (user, target)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub value: i16,
    pub comment: Option<String>,
    pub trip_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate rating statistics for a target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub average: f64,
    pub count: i64,
}

impl Default for RatingStats {
    fn default() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }
}

/// Surface a recommendation request originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationContext {
    Fyp,
    Explore,
    AfterBooking,
    Trip,
}

impl RecommendationContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationContext::Fyp => "fyp",
            RecommendationContext::Explore => "explore",
            RecommendationContext::AfterBooking => "after_booking",
            RecommendationContext::Trip => "trip",
        }
    }
}

impl Display for RecommendationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Optional knobs forwarded to the engine alongside a recommendation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_target_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_seen: Option<bool>,
}

/// One normalized recommendation card.
///
/// Every non-optional field is always populated: absent values in the raw
/// engine payload become empty strings, empty lists, zeros, or `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCard {
    pub target_id: String,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub price: f64,
    pub rating: RatingStats,
    pub location: GeoPoint,
    pub amenities: Vec<String>,
    pub available: bool,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Response metadata echoed alongside a page of cards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub context: RecommendationContext,
    pub generated_at: DateTime<Utc>,
    pub total_count: u64,
    pub page: u32,
    pub has_more: bool,
}

/// Ordered page of recommendation cards plus response metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationPage {
    pub listings: Vec<RecommendationCard>,
    pub metadata: PageMeta,
}

/// Secondary-channel action forwarded to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineAction {
    RecordInteraction,
    RefreshUser,
}

/// Best-effort notification payload for the engine's secondary channel.
///
/// Purely an optimization hint: nothing in the core depends on it being
/// delivered, and no response contract is relied upon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHint {
    pub action: EngineAction,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<InteractionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RecommendationContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl EngineHint {
    /// Hint that a user interacted with a target
    pub fn interaction(user_id: Uuid, target_id: Uuid, kind: InteractionKind) -> Self {
        Self {
            action: EngineAction::RecordInteraction,
            user_id,
            target_id: Some(target_id),
            kind: Some(kind),
            context: None,
            metadata: None,
        }
    }

    /// Hint that a user's recommendations are worth regenerating
    pub fn refresh(user_id: Uuid) -> Self {
        Self {
            action: EngineAction::RefreshUser,
            user_id,
            target_id: None,
            kind: None,
            context: None,
            metadata: None,
        }
    }

    pub fn with_context(mut self, context: RecommendationContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
