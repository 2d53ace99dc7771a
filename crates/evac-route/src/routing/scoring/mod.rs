mod config;
mod penalties;

pub use config::ScoringWeights;

use super::domain::{HazardSet, RiskLevel, RouteCandidate, ScoredRoute, Shelter};

/// Stateless scorer combining travel time, hazard proximity, and shelter load.
///
/// `riskScore = minutes + hazard_penalty * weights.hazard + capacity_penalty * weights.capacity`
#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    weights: ScoringWeights,
}

impl RiskScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    pub fn score(
        &self,
        route: &RouteCandidate,
        shelter: &Shelter,
        hazards: &HazardSet,
    ) -> ScoredRoute {
        let hazard_proximity_penalty =
            penalties::hazard_proximity_penalty(&route.geometry, hazards);
        let capacity_penalty = penalties::capacity_penalty(shelter);
        let risk_score = route.duration_seconds / 60.0
            + hazard_proximity_penalty * self.weights.hazard
            + capacity_penalty * self.weights.capacity;

        ScoredRoute {
            route: route.clone(),
            risk_score,
            hazard_proximity_penalty,
            capacity_penalty,
            risk_level: RiskLevel::from_hazard_penalty(hazard_proximity_penalty),
        }
    }
}
