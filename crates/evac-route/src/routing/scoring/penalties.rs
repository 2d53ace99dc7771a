use super::super::domain::{GeoPoint, HazardSet, Shelter};

/// Sum over hazards of `weight / (1 + km)`, where `km` is the distance from the
/// hazard to the nearest vertex of the path.
pub(crate) fn hazard_proximity_penalty(geometry: &[GeoPoint], hazards: &HazardSet) -> f64 {
    hazards
        .points()
        .iter()
        .filter_map(|hazard| {
            nearest_vertex_meters(&hazard.location, geometry)
                .map(|meters| hazard.severity.weight() / (1.0 + meters / 1000.0))
        })
        .sum()
}

/// `occupancy / max(capacity, 1)`, clamped so over-capacity feeds stay at 1.0.
pub(crate) fn capacity_penalty(shelter: &Shelter) -> f64 {
    shelter.occupancy_ratio()
}

fn nearest_vertex_meters(point: &GeoPoint, geometry: &[GeoPoint]) -> Option<f64> {
    geometry
        .iter()
        .map(|vertex| point.distance_meters(vertex))
        .min_by(f64::total_cmp)
}
