//! Evacuation route recommendation: fan out to a routing backend, score every
//! returned path by travel time, hazard proximity and shelter load, and rank.

pub mod aggregator;
mod defaults;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod provider;
pub mod router;
pub mod scoring;

#[cfg(test)]
mod tests;

pub use aggregator::{RouteAggregator, RouteBundle};
pub use defaults::PALISADES_ORIGIN;
pub use domain::{
    FailureReason, GeoPoint, HazardPoint, HazardSet, InputError, Recommendation, RiskLevel,
    RouteCandidate, ScoredRoute, Severity, Shelter, ShelterFailure, ShelterId, ShelterSet,
};
pub use engine::{compare_routes, EngineConfig, RecommendationEngine, RecommendationError};
pub use feed::{FeedImportError, HazardFeedImporter, HazardImport, ShelterDirectoryImporter};
pub use provider::{ProviderError, ProviderPath, RouteProvider, StraightLineProvider};
pub use router::{recommendation_router, RecommendRequest};
pub use scoring::{RiskScorer, ScoringWeights};
