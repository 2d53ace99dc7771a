use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::GeoPoint;

/// One path alternative returned by a routing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPath {
    pub geometry: Vec<GeoPoint>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("no path found")]
    NoPath,
    #[error("invalid destination: {0}")]
    InvalidDestination(String),
    #[error("routing transport unavailable: {0}")]
    Transport(String),
}

/// Routing backend (map vendor, local graph, fake) consumed by the aggregator.
///
/// Implementations must tolerate concurrent calls. Dropping the returned future
/// abandons the request.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn request_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<ProviderPath>, ProviderError>;
}

#[async_trait]
impl<P> RouteProvider for std::sync::Arc<P>
where
    P: RouteProvider + ?Sized,
{
    async fn request_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<ProviderPath>, ProviderError> {
        (**self).request_route(origin, destination).await
    }
}

/// Offline provider that travels in a straight line at a fixed speed.
#[derive(Debug, Clone)]
pub struct StraightLineProvider {
    meters_per_second: f64,
}

impl StraightLineProvider {
    pub fn new(travel_speed_kmh: f64) -> Self {
        Self {
            meters_per_second: travel_speed_kmh * 1000.0 / 3600.0,
        }
    }
}

#[async_trait]
impl RouteProvider for StraightLineProvider {
    async fn request_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<ProviderPath>, ProviderError> {
        destination
            .validate()
            .map_err(|err| ProviderError::InvalidDestination(err.to_string()))?;
        if !(self.meters_per_second.is_finite() && self.meters_per_second > 0.0) {
            return Err(ProviderError::Transport(
                "travel speed must be positive".to_string(),
            ));
        }

        let distance_meters = origin.distance_meters(&destination);
        let geometry = if distance_meters == 0.0 {
            vec![origin]
        } else {
            vec![origin, destination]
        };

        Ok(vec![ProviderPath {
            geometry,
            distance_meters,
            duration_seconds: distance_meters / self.meters_per_second,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn straight_line_duration_follows_speed() {
        let provider = StraightLineProvider::new(36.0);
        let origin = GeoPoint::new(34.0459, -118.5267).expect("origin");
        let destination = GeoPoint::new(34.0153, -118.4918).expect("destination");

        let paths = provider
            .request_route(origin, destination)
            .await
            .expect("route");

        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.geometry, vec![origin, destination]);
        assert!(path.distance_meters > 4000.0 && path.distance_meters < 5000.0);
        assert!((path.duration_seconds - path.distance_meters / 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn same_point_yields_single_vertex() {
        let provider = StraightLineProvider::new(40.0);
        let origin = GeoPoint::new(34.0459, -118.5267).expect("origin");

        let paths = provider.request_route(origin, origin).await.expect("route");

        assert_eq!(paths[0].geometry, vec![origin]);
        assert_eq!(paths[0].duration_seconds, 0.0);
    }

    #[tokio::test]
    async fn rejects_out_of_range_destination() {
        let provider = StraightLineProvider::new(40.0);
        let origin = GeoPoint::new(34.0459, -118.5267).expect("origin");
        let destination = GeoPoint {
            latitude: 123.0,
            longitude: 0.0,
        };

        let error = provider
            .request_route(origin, destination)
            .await
            .expect_err("invalid destination");
        assert!(matches!(error, ProviderError::InvalidDestination(_)));
    }
}
