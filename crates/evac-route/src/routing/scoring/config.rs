use serde::{Deserialize, Serialize};

/// Multipliers applied to the hazard and capacity penalties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub hazard: f64,
    pub capacity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            hazard: 50.0,
            capacity: 20.0,
        }
    }
}
