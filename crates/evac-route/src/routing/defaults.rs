use super::domain::{GeoPoint, HazardPoint, HazardSet, Severity, Shelter, ShelterId, ShelterSet};

/// Pacific Palisades staging point used by demos when no origin is supplied.
pub const PALISADES_ORIGIN: GeoPoint = GeoPoint {
    latitude: 34.0459,
    longitude: -118.5267,
};

impl ShelterSet {
    /// Palisades-area safe zones used by the demo and as the server fallback.
    pub fn palisades() -> Self {
        let shelter = |id: &str, name: &str, latitude, longitude, capacity, occupancy| Shelter {
            id: ShelterId::from(id),
            name: name.to_string(),
            location: GeoPoint {
                latitude,
                longitude,
            },
            capacity,
            occupancy,
        };

        Self::new(vec![
            shelter(
                "1",
                "Palisades Recreation Center",
                34.0459,
                -118.5267,
                500,
                123,
            ),
            shelter(
                "2",
                "Paul Revere Middle School",
                34.0486,
                -118.533,
                1000,
                456,
            ),
            shelter(
                "3",
                "Santa Monica Civic Center",
                34.0153,
                -118.4918,
                2000,
                789,
            ),
        ])
    }
}

impl HazardSet {
    /// Sample fire detections around the Palisades shelters.
    pub fn palisades() -> Self {
        let hazard = |id: &str, latitude, longitude, severity| HazardPoint {
            id: id.to_string(),
            location: GeoPoint {
                latitude,
                longitude,
            },
            severity,
            detected_at: None,
        };

        Self::new(vec![
            hazard("fire1", 34.05723, -118.5267, Severity::High),
            hazard("fire2", 34.0499, -118.533, Severity::Medium),
            hazard("fire3", 34.0153, -118.4918, Severity::Low),
        ])
    }
}
