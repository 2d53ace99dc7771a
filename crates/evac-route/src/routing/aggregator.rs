use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::domain::{
    FailureReason, GeoPoint, RouteCandidate, Shelter, ShelterFailure, ShelterId,
};
use super::provider::{ProviderPath, RouteProvider};

/// Settled results of one fan-out: every shelter lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteBundle {
    pub candidates: Vec<RouteCandidate>,
    pub failures: Vec<ShelterFailure>,
}

impl RouteBundle {
    pub fn failed_shelter_ids(&self) -> BTreeSet<ShelterId> {
        self.failures
            .iter()
            .map(|failure| failure.shelter_id.clone())
            .collect()
    }
}

/// Issues one route request per shelter and waits for all of them to settle.
pub struct RouteAggregator<P> {
    provider: P,
    request_timeout: Duration,
}

impl<P> RouteAggregator<P>
where
    P: RouteProvider,
{
    pub fn new(provider: P, request_timeout: Duration) -> Self {
        Self {
            provider,
            request_timeout,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Full barrier: total wall time is bounded by one request timeout, not N.
    pub async fn request_routes(&self, origin: GeoPoint, shelters: &[Shelter]) -> RouteBundle {
        let requests = shelters
            .iter()
            .map(|shelter| self.request_shelter(origin, shelter));
        let settled = join_all(requests).await;

        let mut bundle = RouteBundle::default();
        for outcome in settled {
            match outcome {
                Ok(candidates) => bundle.candidates.extend(candidates),
                Err(failure) => bundle.failures.push(failure),
            }
        }
        bundle
    }

    async fn request_shelter(
        &self,
        origin: GeoPoint,
        shelter: &Shelter,
    ) -> Result<Vec<RouteCandidate>, ShelterFailure> {
        debug!(shelter_id = %shelter.id, destination = %shelter.location, "requesting route");

        let response = tokio::time::timeout(
            self.request_timeout,
            self.provider.request_route(origin, shelter.location),
        )
        .await;

        let reason = match response {
            Ok(Ok(paths)) => {
                let offered = paths.len();
                let candidates = build_candidates(origin, shelter, paths);
                if !candidates.is_empty() {
                    debug!(
                        shelter_id = %shelter.id,
                        offered,
                        accepted = candidates.len(),
                        "route request settled"
                    );
                    return Ok(candidates);
                }
                FailureReason::ProviderFailure {
                    reason: format!("provider returned no usable paths ({offered} offered)"),
                }
            }
            Ok(Err(err)) => FailureReason::ProviderFailure {
                reason: err.to_string(),
            },
            Err(_) => FailureReason::ProviderTimeout,
        };

        warn!(shelter_id = %shelter.id, %reason, "shelter excluded from recommendation");
        Err(ShelterFailure {
            shelter_id: shelter.id.clone(),
            reason,
        })
    }
}

fn build_candidates(
    origin: GeoPoint,
    shelter: &Shelter,
    paths: Vec<ProviderPath>,
) -> Vec<RouteCandidate> {
    paths
        .into_iter()
        .enumerate()
        .filter(|(_, path)| {
            usable_metric(path.distance_meters) && usable_metric(path.duration_seconds)
        })
        .map(|(route_index, path)| RouteCandidate {
            shelter_id: shelter.id.clone(),
            route_index,
            geometry: normalize_geometry(origin, shelter.location, path.geometry),
            distance_meters: path.distance_meters,
            duration_seconds: path.duration_seconds,
        })
        .collect()
}

fn usable_metric(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn normalize_geometry(
    origin: GeoPoint,
    destination: GeoPoint,
    geometry: Vec<GeoPoint>,
) -> Vec<GeoPoint> {
    if !geometry.is_empty() {
        return geometry;
    }
    if origin == destination {
        vec![origin]
    } else {
        vec![origin, destination]
    }
}
