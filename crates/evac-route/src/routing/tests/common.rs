use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::routing::domain::{
    GeoPoint, HazardPoint, HazardSet, RouteCandidate, Severity, Shelter, ShelterId, ShelterSet,
};
use crate::routing::engine::{EngineConfig, RecommendationEngine};
use crate::routing::provider::{ProviderError, ProviderPath, RouteProvider};

/// Meters per degree of latitude on the haversine sphere.
pub(super) const METERS_PER_DEGREE: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

pub(super) fn origin() -> GeoPoint {
    GeoPoint {
        latitude: 34.0459,
        longitude: -118.5267,
    }
}

pub(super) fn point(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint {
        latitude,
        longitude,
    }
}

/// Moves a point due north by `meters`.
pub(super) fn north_of(base: GeoPoint, meters: f64) -> GeoPoint {
    point(base.latitude + meters / METERS_PER_DEGREE, base.longitude)
}

pub(super) fn shelter(id: &str, location: GeoPoint, capacity: u32, occupancy: u32) -> Shelter {
    Shelter {
        id: ShelterId::from(id),
        name: format!("Shelter {id}"),
        location,
        capacity,
        occupancy,
    }
}

pub(super) fn hazard(id: &str, location: GeoPoint, severity: Severity) -> HazardPoint {
    HazardPoint {
        id: id.to_string(),
        location,
        severity,
        detected_at: None,
    }
}

pub(super) fn candidate(
    shelter_id: &str,
    geometry: Vec<GeoPoint>,
    duration: f64,
) -> RouteCandidate {
    RouteCandidate {
        shelter_id: ShelterId::from(shelter_id),
        route_index: 0,
        geometry,
        distance_meters: 1000.0,
        duration_seconds: duration,
    }
}

pub(super) fn path(geometry: Vec<GeoPoint>, duration_seconds: f64) -> ProviderPath {
    ProviderPath {
        geometry,
        distance_meters: duration_seconds * 10.0,
        duration_seconds,
    }
}

#[derive(Debug, Clone)]
pub(super) enum Scripted {
    Paths(Vec<ProviderPath>),
    Fail(ProviderError),
    Hang,
}

/// Fake provider answering per destination after a scripted delay.
#[derive(Default)]
pub(super) struct ScriptedProvider {
    responses: HashMap<(u64, u64), (Duration, Scripted)>,
    calls: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub(super) fn with(
        mut self,
        destination: GeoPoint,
        delay: Duration,
        response: Scripted,
    ) -> Self {
        self.responses.insert(key(destination), (delay, response));
        self
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(super) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

fn key(point: GeoPoint) -> (u64, u64) {
    (point.latitude.to_bits(), point.longitude.to_bits())
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RouteProvider for ScriptedProvider {
    async fn request_route(
        &self,
        _origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<ProviderPath>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(self.in_flight.clone());

        let Some((delay, response)) = self.responses.get(&key(destination)).cloned() else {
            return Err(ProviderError::InvalidDestination(destination.to_string()));
        };

        tokio::time::sleep(delay).await;
        match response {
            Scripted::Paths(paths) => Ok(paths),
            Scripted::Fail(error) => Err(error),
            Scripted::Hang => std::future::pending().await,
        }
    }
}

pub(super) fn engine(
    provider: Arc<ScriptedProvider>,
) -> RecommendationEngine<Arc<ScriptedProvider>> {
    RecommendationEngine::new(provider, EngineConfig::default())
}

/// Two shelters from the reference scenario: A is slower but clear, B is faster
/// but runs 200 m past a high-severity fire and is nearly full.
pub(super) struct Scenario {
    pub(super) shelters: ShelterSet,
    pub(super) hazards: HazardSet,
    pub(super) provider: ScriptedProvider,
}

pub(super) fn palisades_scenario() -> Scenario {
    let a_location = point(34.0700, -118.5600);
    let b_location = point(33.9900, -118.4500);
    let b_waypoint = point(34.0000, -118.4700);

    let shelters = ShelterSet::new(vec![
        shelter("A", a_location, 500, 123),
        shelter("B", b_location, 1000, 990),
    ]);
    let hazards = HazardSet::new(vec![hazard(
        "fire-b",
        north_of(b_waypoint, 200.0),
        Severity::High,
    )]);

    let provider = ScriptedProvider::default()
        .with(
            a_location,
            Duration::from_millis(20),
            Scripted::Paths(vec![path(vec![origin(), a_location], 600.0)]),
        )
        .with(
            b_location,
            Duration::from_millis(10),
            Scripted::Paths(vec![path(vec![origin(), b_waypoint, b_location], 500.0)]),
        );

    Scenario {
        shelters,
        hazards,
        provider,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
