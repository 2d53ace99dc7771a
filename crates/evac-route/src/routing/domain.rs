use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a validated point; both axes must be finite and within range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InputError> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        let valid_latitude = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let valid_longitude =
            self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);

        if valid_latitude && valid_longitude {
            Ok(())
        } else {
            Err(InputError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Haversine distance in meters.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_METERS * c
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub const fn weight(self) -> f64 {
        match self {
            Self::Low => 1.0,
            Self::Medium => 3.0,
            Self::High => 9.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Feed values are free text; anything unrecognized degrades to `Low`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Low;
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "h" | "severe" | "critical" | "extreme" => Self::High,
            "medium" | "m" | "moderate" => Self::Medium,
            _ => Self::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardPoint {
    pub id: String,
    pub location: GeoPoint,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<NaiveDateTime>,
}

fn lenient_severity<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(Severity::parse_lenient(
        value.as_ref().and_then(serde_json::Value::as_str),
    ))
}

/// Immutable snapshot of hazard points; refreshed by replacing the whole set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HazardSet {
    points: Vec<HazardPoint>,
}

impl HazardSet {
    pub fn new(points: Vec<HazardPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[HazardPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Drops points outside valid coordinates and returns how many were removed.
    pub fn retain_valid_points(&mut self) -> usize {
        let before = self.points.len();
        self.points.retain(|point| point.location.validate().is_ok());
        before - self.points.len()
    }
}

impl FromIterator<HazardPoint> for HazardSet {
    fn from_iter<I: IntoIterator<Item = HazardPoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShelterId(pub String);

impl ShelterId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShelterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShelterId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelter {
    pub id: ShelterId,
    pub name: String,
    pub location: GeoPoint,
    pub capacity: u32,
    #[serde(default)]
    pub occupancy: u32,
}

impl Shelter {
    /// Share of the shelter already taken, clamped to `[0, 1]`.
    pub fn occupancy_ratio(&self) -> f64 {
        let capacity = f64::from(self.capacity.max(1));
        (f64::from(self.occupancy) / capacity).clamp(0.0, 1.0)
    }

    pub fn capacity_fitness(&self) -> f64 {
        1.0 - self.occupancy_ratio()
    }
}

/// Immutable snapshot of candidate shelters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShelterSet {
    shelters: Vec<Shelter>,
}

impl ShelterSet {
    pub fn new(shelters: Vec<Shelter>) -> Self {
        Self { shelters }
    }

    pub fn shelters(&self) -> &[Shelter] {
        &self.shelters
    }

    pub fn get(&self, id: &ShelterId) -> Option<&Shelter> {
        self.shelters.iter().find(|shelter| &shelter.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.shelters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.shelters.len()
    }

    /// Rejects the whole set when any shelter sits outside valid coordinates
    /// or shares its id with an earlier shelter.
    pub fn validate(&self) -> Result<(), InputError> {
        let mut seen = BTreeSet::new();
        for shelter in &self.shelters {
            if !seen.insert(&shelter.id) {
                return Err(InputError::DuplicateShelterId {
                    shelter_id: shelter.id.clone(),
                });
            }
            shelter
                .location
                .validate()
                .map_err(|_| InputError::InvalidShelter {
                    shelter_id: shelter.id.clone(),
                    latitude: shelter.location.latitude,
                    longitude: shelter.location.longitude,
                })?;
        }
        Ok(())
    }
}

impl FromIterator<Shelter> for ShelterSet {
    fn from_iter<I: IntoIterator<Item = Shelter>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCandidate {
    pub shelter_id: ShelterId,
    pub route_index: usize,
    pub geometry: Vec<GeoPoint>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Badge shown next to a route, derived from its hazard proximity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_hazard_penalty(penalty: f64) -> Self {
        if penalty < 1.0 {
            Self::Low
        } else if penalty < 5.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRoute {
    #[serde(flatten)]
    pub route: RouteCandidate,
    pub risk_score: f64,
    pub hazard_proximity_penalty: f64,
    pub capacity_penalty: f64,
    pub risk_level: RiskLevel,
}

impl ScoredRoute {
    pub fn shelter_id(&self) -> &ShelterId {
        &self.route.shelter_id
    }
}

/// Why a single shelter dropped out of a recommendation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    ProviderTimeout,
    ProviderFailure { reason: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ProviderTimeout => f.write_str("route request timed out"),
            FailureReason::ProviderFailure { reason } => write!(f, "provider failure: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterFailure {
    pub shelter_id: ShelterId,
    pub reason: FailureReason,
}

/// Outcome of one recommendation cycle. `best` is always `alternatives[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub best: ScoredRoute,
    pub alternatives: Vec<ScoredRoute>,
    pub failed_shelter_ids: BTreeSet<ShelterId>,
    #[serde(default)]
    pub failures: Vec<ShelterFailure>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("coordinates ({latitude}, {longitude}) are outside valid latitude/longitude ranges")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
    #[error("shelter {shelter_id} has invalid coordinates ({latitude}, {longitude})")]
    InvalidShelter {
        shelter_id: ShelterId,
        latitude: f64,
        longitude: f64,
    },
    #[error("shelter id {shelter_id} appears more than once")]
    DuplicateShelterId { shelter_id: ShelterId },
}
