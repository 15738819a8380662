use crate::error::{AppError, AppResult};
use crate::models::InteractionKind;

/// Interaction kind → score weight.
///
/// The single source of truth for how much each action moves a preference
/// score. Adding a kind is one row here plus the enum variant.
const INTERACTION_WEIGHTS: &[(InteractionKind, f64)] = &[
    (InteractionKind::View, 1.0),
    (InteractionKind::Click, 2.0),
    (InteractionKind::Save, 3.0),
    (InteractionKind::Message, 4.0),
    (InteractionKind::Share, 5.0),
    (InteractionKind::Book, 10.0),
    (InteractionKind::SwipeLeft, -2.0),
    (InteractionKind::SwipeRight, 1.0),
];

const DEFAULT_RATING_WEIGHT: f64 = 1.0;

/// Maps user actions to preference-score deltas
#[derive(Debug, Clone, Copy)]
pub struct WeightPolicy {
    rating_weight: f64,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            rating_weight: DEFAULT_RATING_WEIGHT,
        }
    }
}

impl WeightPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rating_weight(rating_weight: f64) -> Self {
        Self { rating_weight }
    }

    /// Resolves a kind string from the wire into a typed kind and its weight
    pub fn resolve(&self, kind: &str) -> AppResult<(InteractionKind, f64)> {
        INTERACTION_WEIGHTS
            .iter()
            .find(|(k, _)| k.as_str() == kind)
            .map(|(k, w)| (*k, *w))
            .ok_or_else(|| AppError::UnknownInteractionKind(kind.to_string()))
    }

    /// Weight of an already-typed interaction kind
    pub fn weight_of(&self, kind: InteractionKind) -> f64 {
        INTERACTION_WEIGHTS
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    /// Ledger delta for a star rating.
    ///
    /// Centered so 3 stars is neutral: 5 contributes +2, 1 contributes -2
    /// (at the default rating weight).
    pub fn rating_delta(&self, value: i16) -> f64 {
        f64::from(value - 3) * self.rating_weight
    }
}
