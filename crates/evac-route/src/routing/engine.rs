use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::aggregator::{RouteAggregator, RouteBundle};
use super::domain::{
    GeoPoint, HazardSet, InputError, Recommendation, ScoredRoute, ShelterFailure, ShelterId,
    ShelterSet,
};
use super::provider::RouteProvider;
use super::scoring::{RiskScorer, ScoringWeights};

/// Tunables for a recommendation cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub request_timeout: Duration,
    pub weights: ScoringWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            weights: ScoringWeights::default(),
        }
    }
}

/// Terminal outcomes that stop a cycle from producing a [`Recommendation`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecommendationError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("no safe route available ({} shelter request(s) failed)", .failures.len())]
    NoRouteAvailable { failures: Vec<ShelterFailure> },
    #[error("recommendation cycle cancelled")]
    Cancelled,
}

impl RecommendationError {
    pub fn failed_shelter_ids(&self) -> BTreeSet<ShelterId> {
        match self {
            RecommendationError::NoRouteAvailable { failures } => failures
                .iter()
                .map(|failure| failure.shelter_id.clone())
                .collect(),
            _ => BTreeSet::new(),
        }
    }
}

/// Fans out to the provider, scores every returned path, and ranks them.
///
/// Holds no per-cycle state, so one engine can serve concurrent callers.
pub struct RecommendationEngine<P> {
    aggregator: RouteAggregator<P>,
    scorer: RiskScorer,
}

impl<P> RecommendationEngine<P>
where
    P: RouteProvider,
{
    pub fn new(provider: P, config: EngineConfig) -> Self {
        Self {
            aggregator: RouteAggregator::new(provider, config.request_timeout),
            scorer: RiskScorer::new(config.weights),
        }
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            request_timeout: self.aggregator.request_timeout(),
            weights: self.scorer.weights(),
        }
    }

    pub fn provider(&self) -> &P {
        self.aggregator.provider()
    }

    pub async fn recommend(
        &self,
        origin: GeoPoint,
        shelters: &ShelterSet,
        hazards: &HazardSet,
    ) -> Result<Recommendation, RecommendationError> {
        origin.validate()?;
        shelters.validate()?;

        if shelters.is_empty() {
            info!("no shelters supplied; nothing to route to");
            return Err(RecommendationError::NoRouteAvailable {
                failures: Vec::new(),
            });
        }

        let bundle = self
            .aggregator
            .request_routes(origin, shelters.shelters())
            .await;
        self.rank(bundle, shelters, hazards)
    }

    /// Like [`recommend`](Self::recommend), abandoning pending requests once
    /// `cancel` fires.
    pub async fn recommend_until(
        &self,
        origin: GeoPoint,
        shelters: &ShelterSet,
        hazards: &HazardSet,
        cancel: &CancellationToken,
    ) -> Result<Recommendation, RecommendationError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(shelters = shelters.len(), "recommendation cycle cancelled");
                Err(RecommendationError::Cancelled)
            }
            outcome = self.recommend(origin, shelters, hazards) => outcome,
        }
    }

    fn rank(
        &self,
        bundle: RouteBundle,
        shelters: &ShelterSet,
        hazards: &HazardSet,
    ) -> Result<Recommendation, RecommendationError> {
        let RouteBundle {
            candidates,
            failures,
        } = bundle;

        let mut alternatives: Vec<ScoredRoute> = candidates
            .iter()
            .filter_map(|candidate| {
                shelters
                    .get(&candidate.shelter_id)
                    .map(|shelter| self.scorer.score(candidate, shelter, hazards))
            })
            .collect();
        alternatives.sort_by(compare_routes);

        let Some(best) = alternatives.first().cloned() else {
            info!(failed = failures.len(), "no route available");
            return Err(RecommendationError::NoRouteAvailable { failures });
        };

        info!(
            candidates = alternatives.len(),
            failed = failures.len(),
            best_shelter = %best.route.shelter_id,
            risk_score = best.risk_score,
            "recommendation ready"
        );

        let failed_shelter_ids = failures
            .iter()
            .map(|failure| failure.shelter_id.clone())
            .collect();

        Ok(Recommendation {
            best,
            alternatives,
            failed_shelter_ids,
            failures,
        })
    }
}

/// Ascending risk, then duration, then shelter id, then path position.
pub fn compare_routes(left: &ScoredRoute, right: &ScoredRoute) -> Ordering {
    left.risk_score
        .total_cmp(&right.risk_score)
        .then_with(|| {
            left.route
                .duration_seconds
                .total_cmp(&right.route.duration_seconds)
        })
        .then_with(|| left.route.shelter_id.cmp(&right.route.shelter_id))
        .then_with(|| left.route.route_index.cmp(&right.route.route_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::domain::{RiskLevel, RouteCandidate};

    fn scored(shelter: &str, risk_score: f64, duration_seconds: f64) -> ScoredRoute {
        ScoredRoute {
            route: RouteCandidate {
                shelter_id: ShelterId::from(shelter),
                route_index: 0,
                geometry: Vec::new(),
                distance_meters: 0.0,
                duration_seconds,
            },
            risk_score,
            hazard_proximity_penalty: 0.0,
            capacity_penalty: 0.0,
            risk_level: RiskLevel::Low,
        }
    }

    #[test]
    fn ties_fall_back_to_duration_then_shelter_id() {
        let mut routes = vec![
            scored("c", 10.0, 300.0),
            scored("b", 10.0, 200.0),
            scored("a", 10.0, 300.0),
            scored("d", 5.0, 900.0),
        ];

        routes.sort_by(compare_routes);

        let order: Vec<&str> = routes
            .iter()
            .map(|route| route.route.shelter_id.as_str())
            .collect();
        assert_eq!(order, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn no_route_error_reports_failed_ids() {
        let error = RecommendationError::NoRouteAvailable {
            failures: vec![ShelterFailure {
                shelter_id: ShelterId::from("2"),
                reason: crate::routing::domain::FailureReason::ProviderTimeout,
            }],
        };

        assert_eq!(
            error.failed_shelter_ids().into_iter().collect::<Vec<_>>(),
            vec![ShelterId::from("2")]
        );
        assert_eq!(
            error.to_string(),
            "no safe route available (1 shelter request(s) failed)"
        );
    }
}
