mod normalizer;
mod parser;

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use super::domain::{GeoPoint, HazardPoint, HazardSet, Severity, Shelter, ShelterId, ShelterSet};
use parser::{
    parse_coordinate, parse_datetime, parse_rows, parse_rows_lossy, HazardRow, ShelterRow,
};

#[derive(Debug, thiserror::Error)]
pub enum FeedImportError {
    #[error("failed to read feed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid feed CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {detail}")]
    InvalidRecord { row: usize, detail: String },
}

/// Hazard snapshot plus the number of rows that could not be placed on the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HazardImport {
    pub hazards: HazardSet,
    pub skipped_rows: usize,
}

/// Reads hazard detections from CSV exports keyed by header name.
pub struct HazardFeedImporter;

impl HazardFeedImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<HazardImport, FeedImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<HazardImport, FeedImportError> {
        let mut import = HazardImport::default();
        let mut points = Vec::new();

        for (row, record) in parse_rows_lossy::<_, HazardRow>(reader)? {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    debug!(row, error = %err, "skipping unreadable hazard row");
                    import.skipped_rows += 1;
                    continue;
                }
            };
            match hazard_from_row(row, record) {
                Some(point) => points.push(point),
                None => {
                    debug!(row, "skipping hazard row without usable coordinates");
                    import.skipped_rows += 1;
                }
            }
        }

        if import.skipped_rows > 0 {
            warn!(
                skipped = import.skipped_rows,
                accepted = points.len(),
                "hazard feed contained unusable rows"
            );
        }

        import.hazards = HazardSet::new(points);
        Ok(import)
    }
}

fn hazard_from_row(row: usize, record: HazardRow) -> Option<HazardPoint> {
    let location = GeoPoint::new(
        parse_coordinate(record.latitude.as_deref())?,
        parse_coordinate(record.longitude.as_deref())?,
    )
    .ok()?;

    Some(HazardPoint {
        id: record.id.unwrap_or_else(|| format!("hazard-{row}")),
        location,
        severity: Severity::parse_lenient(record.severity.as_deref()),
        detected_at: record.detected_at.as_deref().and_then(parse_datetime),
    })
}

/// Reads the shelter directory from CSV. Any malformed row rejects the file.
pub struct ShelterDirectoryImporter;

impl ShelterDirectoryImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ShelterSet, FeedImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ShelterSet, FeedImportError> {
        parse_rows::<_, ShelterRow>(reader)?
            .into_iter()
            .map(|(row, record)| shelter_from_row(row, record))
            .collect()
    }
}

fn shelter_from_row(row: usize, record: ShelterRow) -> Result<Shelter, FeedImportError> {
    let invalid = |detail: String| FeedImportError::InvalidRecord { row, detail };

    let id = record
        .id
        .ok_or_else(|| invalid("missing shelter id".to_string()))?;
    let latitude = parse_coordinate(record.latitude.as_deref())
        .ok_or_else(|| invalid(format!("shelter {id} has no usable latitude")))?;
    let longitude = parse_coordinate(record.longitude.as_deref())
        .ok_or_else(|| invalid(format!("shelter {id} has no usable longitude")))?;
    let location =
        GeoPoint::new(latitude, longitude).map_err(|err| invalid(format!("shelter {id}: {err}")))?;
    let capacity = parse_count(record.capacity.as_deref())
        .ok_or_else(|| invalid(format!("shelter {id} has no usable capacity")))?;
    let occupancy = match record.occupancy.as_deref() {
        Some(raw) => parse_count(Some(raw))
            .ok_or_else(|| invalid(format!("shelter {id} has invalid occupancy '{raw}'")))?,
        None => 0,
    };

    Ok(Shelter {
        name: record.name.unwrap_or_else(|| id.clone()),
        id: ShelterId(id),
        location,
        capacity,
        occupancy,
    })
}

fn parse_count(value: Option<&str>) -> Option<u32> {
    value.and_then(|raw| raw.trim().parse::<u32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    #[test]
    fn normalize_header_strips_bom_and_case() {
        assert_eq!(normalizer::normalize_for_tests("\u{feff} Latitude "), "latitude");
        assert_eq!(normalizer::normalize_for_tests("Detected  At"), "detected_at");
    }

    #[test]
    fn hazard_columns_are_matched_by_name_not_position() {
        let csv = "severity,longitude,id,latitude\nhigh,-118.5267,fire1,34.05723\n";
        let import = HazardFeedImporter::from_reader(Cursor::new(csv)).expect("import");

        assert_eq!(import.skipped_rows, 0);
        let point = &import.hazards.points()[0];
        assert_eq!(point.id, "fire1");
        assert_eq!(point.severity, Severity::High);
        assert_eq!(point.location.latitude, 34.05723);
        assert_eq!(point.location.longitude, -118.5267);
    }

    #[test]
    fn missing_or_malformed_severity_defaults_to_low() {
        let csv = "lat,lng,severity\n34.0,-118.5,\n34.1,-118.4,catastrophic!!\n34.2,-118.3,Medium\n";
        let import = HazardFeedImporter::from_reader(Cursor::new(csv)).expect("import");

        let severities: Vec<Severity> = import
            .hazards
            .points()
            .iter()
            .map(|point| point.severity)
            .collect();
        assert_eq!(
            severities,
            vec![Severity::Low, Severity::Low, Severity::Medium]
        );
        assert_eq!(import.hazards.points()[0].id, "hazard-1");
    }

    #[test]
    fn bad_rows_are_skipped_without_rejecting_snapshot() {
        let csv = "latitude,longitude,brightness,scan\n\
34.0,-118.5,330.1,1.0\n\
not-a-number,-118.5,300.0,1.0\n\
95.0,-118.5,300.0,1.0\n\
,,,\n";
        let import = HazardFeedImporter::from_reader(Cursor::new(csv)).expect("import");

        assert_eq!(import.hazards.len(), 1);
        assert_eq!(import.skipped_rows, 3);
    }

    #[test]
    fn invalid_utf8_cells_degrade_the_row_instead_of_the_snapshot() {
        let mut csv = b"latitude,longitude,severity\n34.0,-118.5,high\n34.1,-118.4,".to_vec();
        csv.extend_from_slice(&[0xFF, 0xFE]);
        csv.extend_from_slice(b"\n34.\xFF,-118.3,medium\n34.2,-118.2,medium\n");

        let import = HazardFeedImporter::from_reader(Cursor::new(csv)).expect("import");

        let severities: Vec<Severity> = import
            .hazards
            .points()
            .iter()
            .map(|point| point.severity)
            .collect();
        assert_eq!(
            severities,
            vec![Severity::High, Severity::Low, Severity::Medium]
        );
        assert_eq!(import.skipped_rows, 1);
    }

    #[test]
    fn shelter_directory_stays_strict_on_invalid_utf8() {
        let mut csv = b"id,latitude,longitude,capacity\nrec,34.0,-118.5,".to_vec();
        csv.extend_from_slice(&[0xFF]);
        csv.push(b'\n');

        let error = ShelterDirectoryImporter::from_reader(Cursor::new(csv))
            .expect_err("invalid utf8 rejects directory");

        assert!(matches!(error, FeedImportError::Csv(_)));
    }

    #[test]
    fn detected_at_accepts_rfc3339_and_plain_dates() {
        let csv = "latitude,longitude,detected_at\n\
34.0,-118.5,2025-01-08T10:30:00Z\n\
34.0,-118.5,2025-01-09\n\
34.0,-118.5,yesterday\n";
        let import = HazardFeedImporter::from_reader(Cursor::new(csv)).expect("import");
        let points = import.hazards.points();

        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).expect("valid date");
        assert_eq!(
            points[0].detected_at,
            day(8).and_hms_opt(10, 30, 0)
        );
        assert_eq!(points[1].detected_at, day(9).and_hms_opt(0, 0, 0));
        assert_eq!(points[2].detected_at, None);
    }

    #[test]
    fn shelter_directory_defaults_name_and_occupancy() {
        let csv = "ID,Latitude,Longitude,Capacity\nrec,34.0459,-118.5267,500\n";
        let shelters = ShelterDirectoryImporter::from_reader(Cursor::new(csv)).expect("import");

        let shelter = &shelters.shelters()[0];
        assert_eq!(shelter.id, ShelterId::from("rec"));
        assert_eq!(shelter.name, "rec");
        assert_eq!(shelter.capacity, 500);
        assert_eq!(shelter.occupancy, 0);
    }

    #[test]
    fn shelter_directory_rejects_out_of_range_coordinates() {
        let csv = "id,name,latitude,longitude,capacity,occupancy\n\
ok,Fine,34.0,-118.5,100,10\n\
bad,Broken,34.0,-218.5,100,10\n";
        let error =
            ShelterDirectoryImporter::from_reader(Cursor::new(csv)).expect_err("invalid shelter");

        match error {
            FeedImportError::InvalidRecord { row, detail } => {
                assert_eq!(row, 2);
                assert!(detail.contains("bad"));
            }
            other => panic!("expected invalid record, got {other:?}"),
        }
    }

    #[test]
    fn shelter_directory_propagates_io_errors() {
        let error = ShelterDirectoryImporter::from_path("./does-not-exist.csv")
            .expect_err("expected io error");

        assert!(matches!(error, FeedImportError::Io(_)));
    }
}
