use evac_route::config::AppConfig;
use evac_route::error::AppError;
use evac_route::routing::{
    HazardFeedImporter, HazardSet, RecommendationEngine, ShelterDirectoryImporter, ShelterSet,
    StraightLineProvider,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Engine = RecommendationEngine<StraightLineProvider>;

pub(crate) fn build_engine(config: &AppConfig) -> Engine {
    RecommendationEngine::new(
        StraightLineProvider::new(config.provider.travel_speed_kmh),
        config.engine,
    )
}

/// Where the snapshots of one cycle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SnapshotSource {
    Csv,
    Defaults,
}

impl SnapshotSource {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV import",
            Self::Defaults => "built-in Palisades snapshot",
        }
    }
}

pub(crate) struct Snapshots {
    pub(crate) shelters: ShelterSet,
    pub(crate) shelter_source: SnapshotSource,
    pub(crate) hazards: HazardSet,
    pub(crate) hazard_source: SnapshotSource,
    pub(crate) skipped_hazard_rows: usize,
}

pub(crate) fn load_snapshots(
    shelters_csv: Option<PathBuf>,
    hazards_csv: Option<PathBuf>,
) -> Result<Snapshots, AppError> {
    let (shelters, shelter_source) = match shelters_csv {
        Some(path) => (
            ShelterDirectoryImporter::from_path(path)?,
            SnapshotSource::Csv,
        ),
        None => (ShelterSet::palisades(), SnapshotSource::Defaults),
    };

    let (hazards, hazard_source, skipped_hazard_rows) = match hazards_csv {
        Some(path) => {
            let import = HazardFeedImporter::from_path(path)?;
            (import.hazards, SnapshotSource::Csv, import.skipped_rows)
        }
        None => (HazardSet::palisades(), SnapshotSource::Defaults, 0),
    };

    Ok(Snapshots {
        shelters,
        shelter_source,
        hazards,
        hazard_source,
        skipped_hazard_rows,
    })
}

pub(crate) fn parse_latitude(raw: &str) -> Result<f64, String> {
    parse_degrees(raw, 90.0)
}

pub(crate) fn parse_longitude(raw: &str) -> Result<f64, String> {
    parse_degrees(raw, 180.0)
}

fn parse_degrees(raw: &str, limit: f64) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("failed to parse '{raw}' as decimal degrees ({err})"))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("'{raw}' is outside -{limit}..={limit}"));
    }
    Ok(value)
}
