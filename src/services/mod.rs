pub mod gateway;
pub mod interactions;
pub mod ratings;
pub mod stores;
pub mod weights;

pub use gateway::{HttpRecommendationGateway, RecommendationEngine};
pub use interactions::{BatchReport, InteractionDraft, InteractionRecorder};
pub use ratings::{RatingOutcome, RatingReconciler};
pub use weights::WeightPolicy;
