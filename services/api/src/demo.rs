use crate::infra::{
    build_engine, load_snapshots, parse_latitude, parse_longitude, Engine, SnapshotSource,
    Snapshots,
};
use clap::Args;
use evac_route::config::AppConfig;
use evac_route::error::AppError;
use evac_route::routing::{
    GeoPoint, HazardSet, Recommendation, RecommendationError, ScoredRoute, ShelterSet,
    PALISADES_ORIGIN,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug, Default)]
pub(crate) struct RecommendArgs {
    /// Origin latitude in decimal degrees. Defaults to the Palisades staging point.
    #[arg(long, value_parser = parse_latitude, requires = "lng", allow_hyphen_values = true)]
    pub(crate) lat: Option<f64>,
    /// Origin longitude in decimal degrees.
    #[arg(long, value_parser = parse_longitude, requires = "lat", allow_hyphen_values = true)]
    pub(crate) lng: Option<f64>,
    /// Shelter directory CSV (id, name, latitude, longitude, capacity, occupancy)
    #[arg(long)]
    pub(crate) shelters_csv: Option<PathBuf>,
    /// Hazard feed CSV (latitude, longitude, severity and optional detection time)
    #[arg(long)]
    pub(crate) hazards_csv: Option<PathBuf>,
    /// Print the recommendation as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the recommendation as JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let RecommendArgs {
        lat,
        lng,
        shelters_csv,
        hazards_csv,
        json,
    } = args;

    let origin = match (lat, lng) {
        (Some(latitude), Some(longitude)) => {
            GeoPoint::new(latitude, longitude).map_err(RecommendationError::from)?
        }
        _ => PALISADES_ORIGIN,
    };

    let config = AppConfig::load()?;
    let engine = build_engine(&config);
    let snapshots = load_snapshots(shelters_csv, hazards_csv)?;

    let recommendation = recommend_interruptible(
        &engine,
        origin,
        &snapshots.shelters,
        &snapshots.hazards,
    )
    .await?;

    if json {
        return print_json(&recommendation);
    }

    render_snapshot_summary(origin, &snapshots);
    render_recommendation(&recommendation, &snapshots.shelters);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = build_engine(&config);
    let snapshots = load_snapshots(None, None)?;

    let recommendation = recommend_interruptible(
        &engine,
        PALISADES_ORIGIN,
        &snapshots.shelters,
        &snapshots.hazards,
    )
    .await?;

    if args.json {
        return print_json(&recommendation);
    }

    println!("Pacific Palisades evacuation demo");
    println!(
        "Provider: straight-line travel at {} km/h, {} ms per-shelter timeout",
        config.provider.travel_speed_kmh,
        config.engine.request_timeout.as_millis()
    );
    println!(
        "Weights: hazard x{}, capacity x{}",
        config.engine.weights.hazard, config.engine.weights.capacity
    );
    render_snapshot_summary(PALISADES_ORIGIN, &snapshots);

    println!("\nWith current fire detections");
    render_recommendation(&recommendation, &snapshots.shelters);

    let calm = recommend_interruptible(
        &engine,
        PALISADES_ORIGIN,
        &snapshots.shelters,
        &HazardSet::default(),
    )
    .await?;
    println!("\nWithout fire detections");
    render_recommendation(&calm, &snapshots.shelters);

    Ok(())
}

/// Runs one cycle, abandoning outstanding provider requests on Ctrl-C.
async fn recommend_interruptible(
    engine: &Engine,
    origin: GeoPoint,
    shelters: &ShelterSet,
    hazards: &HazardSet,
) -> Result<Recommendation, AppError> {
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let outcome = engine
        .recommend_until(origin, shelters, hazards, &cancel)
        .await;
    interrupt.abort();
    Ok(outcome?)
}

fn print_json(recommendation: &Recommendation) -> Result<(), AppError> {
    let body = serde_json::to_string_pretty(recommendation).map_err(std::io::Error::from)?;
    println!("{body}");
    Ok(())
}

fn render_snapshot_summary(origin: GeoPoint, snapshots: &Snapshots) {
    println!("Origin: {origin}");
    println!(
        "Shelters: {} ({})",
        snapshots.shelters.len(),
        snapshots.shelter_source.label()
    );

    let skipped = if snapshots.hazard_source == SnapshotSource::Csv {
        format!(", {} row(s) skipped", snapshots.skipped_hazard_rows)
    } else {
        String::new()
    };
    println!(
        "Hazards: {} ({}{})",
        snapshots.hazards.len(),
        snapshots.hazard_source.label(),
        skipped
    );
}

pub(crate) fn render_recommendation(recommendation: &Recommendation, shelters: &ShelterSet) {
    let best = &recommendation.best;
    println!(
        "Recommended: {} -> {}",
        shelter_label(best, shelters),
        route_metrics(best)
    );

    println!("Alternatives");
    for (rank, route) in recommendation.alternatives.iter().enumerate() {
        println!(
            "{}. {} route #{}: {}, hazard {:.2}, load {:.2}",
            rank + 1,
            shelter_label(route, shelters),
            route.route.route_index,
            route_metrics(route),
            route.hazard_proximity_penalty,
            route.capacity_penalty
        );
    }

    if recommendation.failures.is_empty() {
        println!("Failed shelters: none");
    } else {
        println!("Failed shelters");
        for failure in &recommendation.failures {
            println!("- {}: {}", failure.shelter_id, failure.reason);
        }
    }
}

fn shelter_label(route: &ScoredRoute, shelters: &ShelterSet) -> String {
    match shelters.get(route.shelter_id()) {
        Some(shelter) => format!("{} [{}]", shelter.name, shelter.id),
        None => format!("[{}]", route.shelter_id()),
    }
}

fn route_metrics(route: &ScoredRoute) -> String {
    format!(
        "risk {:.2} ({}), {:.1} min, {:.2} km",
        route.risk_score,
        route.risk_level.label(),
        route.route.duration_seconds / 60.0,
        route.route.distance_meters / 1000.0
    )
}
