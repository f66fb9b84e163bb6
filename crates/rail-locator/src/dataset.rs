//! Dataset loading from JSON files

use anyhow::Context;
use rail_locator_lib::Dataset;
use std::path::Path;

/// Read and parse a dataset file
pub fn load(path: &Path) -> anyhow::Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let dataset =
        parse(&text).with_context(|| format!("Failed to parse dataset {}", path.display()))?;

    tracing::debug!(
        "Read {} lines and {} facilities from {}",
        dataset.lines.len(),
        dataset.facilities.len(),
        path.display()
    );
    Ok(dataset)
}

pub fn parse(text: &str) -> serde_json::Result<Dataset> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rail_locator_lib::{ContactSource, GeoPoint, Locator, LocatorError};

    const BUNDLED: &str = include_str!("../../../data/network.json");

    #[test]
    fn test_bundled_dataset() {
        let dataset = parse(BUNDLED).unwrap();
        assert_eq!(dataset.lines.len(), 2);
        assert_eq!(dataset.facilities.len(), 4);

        let locator = Locator::from_dataset(dataset).unwrap();
        assert_eq!(locator.network().line_count(), 2);

        // PORTAL_001 sits on the first vertex of the Paris-Lyon line
        let report = locator.locate(GeoPoint::new(2.3522, 48.8566).unwrap());
        let position = report.position_record().unwrap();
        assert_eq!(position.line_id, "LIGNE_PARIS_LYON");
        assert_eq!(position.pk, "PK0+000");

        let facility = report.facility_record().unwrap();
        assert_eq!(facility.facility_id, "PORTAL_001");
        assert!(facility.distance_meters < 1e-6);
        assert_eq!(report.contacts.source, ContactSource::Facility);
        assert_eq!(report.contacts.entries["local"], "01 23 45 67 89");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let dataset = parse("{}").unwrap();
        assert!(dataset.lines.is_empty());
        assert!(dataset.facilities.is_empty());
        assert_eq!(dataset.config.default_facility_category, "emergency");

        let dataset = parse(r#"{"config": {"maxFacilityDistanceMeters": 250.0}}"#).unwrap();
        assert_eq!(dataset.config.max_facility_distance_meters, 250.0);
        assert_eq!(dataset.config.max_projection_distance_meters, 5000.0);
    }

    #[test]
    fn test_config_keys_take_effect() {
        let dataset = parse(
            r#"{
                "config": {
                    "maxProjectionDistanceMeters": 100.0,
                    "maxFacilityDistanceMeters": 50.0,
                    "defaultFacilityCategory": "technical",
                    "subQueryTimeoutMs": 250,
                    "fallbackContacts": {"secours": "112"}
                }
            }"#,
        )
        .unwrap();
        let config = dataset.config;
        assert_eq!(config.max_projection_distance_meters, 100.0);
        assert_eq!(config.max_facility_distance_meters, 50.0);
        assert_eq!(config.default_facility_category, "technical");
        assert_eq!(config.sub_query_timeout_ms, 250);
        assert_eq!(config.fallback_contacts.len(), 1);
    }

    #[test]
    fn test_unknown_config_key_rejected() {
        let err = parse(r#"{"config": {"max_projection_distance_meters": 100.0}}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"), "{}", err);
    }

    #[test]
    fn test_collaborator_record_keys() {
        let locator = Locator::from_dataset(parse(BUNDLED).unwrap()).unwrap();
        let report = locator.locate(GeoPoint::new(2.3522, 48.8566).unwrap());

        let position = serde_json::to_value(report.position_record().unwrap()).unwrap();
        assert_eq!(position["pk"], "PK0+000");
        assert_eq!(position["lineId"], "LIGNE_PARIS_LYON");
        assert!(position["lineName"].is_string());
        assert_eq!(position["confidenceTier"], "very-high");
        assert!(position["distanceMeters"].is_number());

        let facility = serde_json::to_value(report.facility_record().unwrap()).unwrap();
        assert_eq!(facility["facilityId"], "PORTAL_001");
        assert_eq!(facility["category"], "emergency");
        assert!(facility["distanceMeters"].is_number());
    }

    #[test]
    fn test_minimal_facility() {
        let dataset = parse(
            r#"{
                "facilities": [{
                    "id": "F1",
                    "name": "Gate",
                    "category": "emergency",
                    "location": {"longitude": 2.35, "latitude": 48.85}
                }]
            }"#,
        )
        .unwrap();

        let facility = &dataset.facilities[0];
        assert_eq!(facility.status, "open");
        assert!(facility.contacts.is_empty());
        assert!(facility.next_inspection.is_none());
    }

    #[test]
    fn test_out_of_range_coordinate_is_rejected() {
        let err = parse(
            r#"{
                "facilities": [{
                    "id": "F1",
                    "name": "Gate",
                    "category": "emergency",
                    "location": {"longitude": 200.0, "latitude": 48.85}
                }]
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid coordinate"), "{}", err);
    }

    #[test]
    fn test_invalid_line_fails_on_registration() {
        let dataset = parse(
            r#"{
                "lines": [{
                    "id": "L1",
                    "name": "Stub",
                    "vertices": [{"longitude": 2.0, "latitude": 48.0}],
                    "pk_start": 0.0,
                    "pk_end": 1.0
                }]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            Locator::from_dataset(dataset),
            Err(LocatorError::InvalidLine { line_id, .. }) if line_id == "L1"
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read dataset"));
    }
}
