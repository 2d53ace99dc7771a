use std::io::Cursor;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::warn;

use super::domain::{GeoPoint, HazardSet, Recommendation, ShelterSet};
use super::engine::RecommendationEngine;
use super::feed::HazardFeedImporter;
use super::provider::RouteProvider;
use crate::error::AppError;

/// Body accepted by the recommendation endpoint. Omitted snapshots fall back
/// to the Palisades defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub origin: GeoPoint,
    #[serde(default)]
    pub shelters: Option<ShelterSet>,
    #[serde(default)]
    pub hazards: Option<HazardSet>,
    #[serde(default)]
    pub hazards_csv: Option<String>,
}

/// Router builder exposing the recommendation endpoint.
pub fn recommendation_router<P>(engine: Arc<RecommendationEngine<P>>) -> Router
where
    P: RouteProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/evacuation/recommend",
            post(recommend_handler::<P>),
        )
        .with_state(engine)
}

pub(crate) async fn recommend_handler<P>(
    State(engine): State<Arc<RecommendationEngine<P>>>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Recommendation>, AppError>
where
    P: RouteProvider + 'static,
{
    let RecommendRequest {
        origin,
        shelters,
        hazards,
        hazards_csv,
    } = request;

    let hazards = match (hazards_csv, hazards) {
        (Some(csv), _) => HazardFeedImporter::from_reader(Cursor::new(csv.into_bytes()))?.hazards,
        (None, Some(mut hazards)) => {
            let dropped = hazards.retain_valid_points();
            if dropped > 0 {
                warn!(dropped, "ignoring hazard points with invalid coordinates");
            }
            hazards
        }
        (None, None) => HazardSet::palisades(),
    };
    let shelters = shelters.unwrap_or_else(ShelterSet::palisades);

    let recommendation = engine.recommend(origin, &shelters, &hazards).await?;
    Ok(Json(recommendation))
}
