//! Locator - façade combining projection and facility search into emergency reports

use crate::repository::{MemoryRepository, Repository};
use crate::{
    ConfidenceTier, Facility, FacilityIndex, FacilitySearch, FacilitySearchResult, GeoPoint,
    NetworkModel, ProjectionOutcome, ProjectionResult, RailLine, RailLineRecord, Result,
    format_pk,
};

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Locator configuration
///
/// Serialized keys are camelCase (`maxProjectionDistanceMeters`, ...). Unknown keys are
/// rejected so that a misspelled option never silently falls back to its default.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, rename_all = "camelCase", deny_unknown_fields)
)]
pub struct Config {
    /// Projection search radius in meters
    pub max_projection_distance_meters: f64,
    /// Facility search radius in meters
    pub max_facility_distance_meters: f64,
    /// Category searched by emergency reports
    pub default_facility_category: String,
    /// Per sub-query timeout of [`Locator::emergency_report`], in milliseconds
    pub sub_query_timeout_ms: u64,
    /// Contacts reported when no facility contacts are available
    pub fallback_contacts: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_projection_distance_meters: 5000.0,
            max_facility_distance_meters: 5000.0,
            default_facility_category: "emergency".to_string(),
            sub_query_timeout_ms: 500,
            fallback_contacts: BTreeMap::from([
                ("sncf".to_string(), "3635".to_string()),
                ("secours".to_string(), "112".to_string()),
            ]),
        }
    }
}

/// Lines, facilities and configuration loaded together at startup
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct Dataset {
    pub config: Config,
    pub lines: Vec<RailLineRecord>,
    pub facilities: Vec<Facility>,
}

/// Position record handed to persistence and notification collaborators
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct PositionRecord {
    /// Canonical `PK<km>+<meters>` text
    pub pk: String,
    pub line_id: String,
    pub line_name: String,
    pub confidence_tier: ConfidenceTier,
    pub distance_meters: f64,
}

impl From<&ProjectionResult> for PositionRecord {
    fn from(result: &ProjectionResult) -> Self {
        Self {
            pk: format_pk(result.pk),
            line_id: result.line_id.clone(),
            line_name: result.line_name.clone(),
            confidence_tier: result.confidence,
            distance_meters: result.perpendicular_distance_meters,
        }
    }
}

/// Facility record handed to persistence and notification collaborators
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct FacilityRecord {
    pub facility_id: String,
    pub name: String,
    pub category: String,
    pub distance_meters: f64,
}

impl From<&FacilitySearchResult> for FacilityRecord {
    fn from(result: &FacilitySearchResult) -> Self {
        Self {
            facility_id: result.facility.id.clone(),
            name: result.facility.name.clone(),
            category: result.facility.category.clone(),
            distance_meters: result.distance_meters,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ContactSource {
    /// Taken from the nearest facility
    Facility,
    /// Configured fallback, no facility contacts were available
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmergencyContacts {
    pub source: ContactSource,
    pub entries: BTreeMap<String, String>,
}

/// A sub-query of a report that fell back to its sentinel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SubQuery {
    Projection,
    Facility,
}

/// Combined situation report for a reported location
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EmergencyReport {
    pub location: GeoPoint,
    pub generated_at: DateTime<Utc>,
    pub position: ProjectionOutcome,
    pub access: FacilitySearch,
    pub contacts: EmergencyContacts,
    /// Sub-queries that timed out or failed and were replaced by their sentinel
    pub degraded: Vec<SubQuery>,
}

impl EmergencyReport {
    pub fn position_record(&self) -> Option<PositionRecord> {
        self.position.matched().map(PositionRecord::from)
    }

    pub fn facility_record(&self) -> Option<FacilityRecord> {
        self.access.found().map(FacilityRecord::from)
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// High-level entry point owning a network, a facility index and their configuration
pub struct Locator<LR = MemoryRepository<RailLine>, FR = MemoryRepository<Facility>> {
    network: Arc<NetworkModel<LR>>,
    facilities: Arc<FacilityIndex<FR>>,
    config: Config,
}

impl Locator {
    /// Create a locator with empty registries
    pub fn new(config: Config) -> Self {
        Self::from_parts(
            Arc::new(NetworkModel::new()),
            Arc::new(FacilityIndex::new()),
            config,
        )
    }

    /// Build a locator from a dataset, failing on the first invalid line or facility
    pub fn from_dataset(dataset: Dataset) -> Result<Self> {
        let Dataset {
            config,
            lines,
            facilities,
        } = dataset;

        let locator = Self::new(config);
        let line_count = locator.network.load_records(lines)?;
        let facility_count = locator.facilities.load(facilities)?;

        tracing::info!(
            "Loaded dataset: {} lines, {} facilities",
            line_count,
            facility_count
        );
        Ok(locator)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<LR, FR> Locator<LR, FR>
where
    LR: Repository<RailLine> + 'static,
    FR: Repository<Facility> + 'static,
{
    pub fn from_parts(
        network: Arc<NetworkModel<LR>>,
        facilities: Arc<FacilityIndex<FR>>,
        config: Config,
    ) -> Self {
        Self {
            network,
            facilities,
            config,
        }
    }

    #[inline]
    pub fn network(&self) -> &Arc<NetworkModel<LR>> {
        &self.network
    }

    #[inline]
    pub fn facilities(&self) -> &Arc<FacilityIndex<FR>> {
        &self.facilities
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build a report on the calling thread, running both sub-queries in sequence
    pub fn locate(&self, point: GeoPoint) -> EmergencyReport {
        let position = self
            .network
            .project(point, self.config.max_projection_distance_meters);
        let access = self.facilities.find_nearest(
            point,
            Some(self.config.default_facility_category.as_str()),
            self.config.max_facility_distance_meters,
        );

        self.assemble(point, position, access, Vec::new())
    }

    fn assemble(
        &self,
        location: GeoPoint,
        position: ProjectionOutcome,
        access: FacilitySearch,
        degraded: Vec<SubQuery>,
    ) -> EmergencyReport {
        let contacts = match access.found() {
            Some(result) if !result.facility.contacts.is_empty() => EmergencyContacts {
                source: ContactSource::Facility,
                entries: result.facility.contacts.clone(),
            },
            _ => EmergencyContacts {
                source: ContactSource::Fallback,
                entries: self.config.fallback_contacts.clone(),
            },
        };

        match position.matched() {
            Some(result) => tracing::info!(
                "Report for {}: {} on {} ({})",
                location,
                result.pk_text(),
                result.line_id,
                result.confidence
            ),
            None => tracing::info!("Report for {}: no line nearby", location),
        }

        EmergencyReport {
            location,
            generated_at: Utc::now(),
            position,
            access,
            contacts,
            degraded,
        }
    }
}

impl<LR, FR> Locator<LR, FR>
where
    LR: Repository<RailLine> + 'static,
    FR: Repository<Facility> + 'static,
{
    /// Build a report, running projection and facility search concurrently
    ///
    /// Each sub-query runs on the blocking pool under its own timeout. A sub-query that
    /// times out or panics degrades to `NoMatch` / `NoFacility` and is listed in
    /// [`EmergencyReport::degraded`]; the report itself always succeeds.
    ///
    /// Dropping the returned future, or a timeout, does not stop a sub-query that is
    /// already running: blocking tasks cannot be aborted. The task finishes against its
    /// own registry snapshot and its result is discarded. Sub-queries only read, so a
    /// detached task never leaves the registries in a partial state.
    pub async fn emergency_report(&self, point: GeoPoint) -> EmergencyReport {
        let timeout = Duration::from_millis(self.config.sub_query_timeout_ms);

        let network = Arc::clone(&self.network);
        let max_projection = self.config.max_projection_distance_meters;
        let projection =
            tokio::task::spawn_blocking(move || network.project(point, max_projection));

        let facilities = Arc::clone(&self.facilities);
        let category = self.config.default_facility_category.clone();
        let max_facility = self.config.max_facility_distance_meters;
        let search = tokio::task::spawn_blocking(move || {
            facilities.find_nearest(point, Some(category.as_str()), max_facility)
        });

        let (position, access) = tokio::join!(
            tokio::time::timeout(timeout, projection),
            tokio::time::timeout(timeout, search)
        );

        let mut degraded = Vec::new();

        let position = match position {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::warn!("Projection sub-query failed: {}", err);
                degraded.push(SubQuery::Projection);
                ProjectionOutcome::NoMatch
            }
            Err(_) => {
                tracing::warn!("Projection sub-query timed out after {:?}", timeout);
                degraded.push(SubQuery::Projection);
                ProjectionOutcome::NoMatch
            }
        };

        let access = match access {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                tracing::warn!("Facility sub-query failed: {}", err);
                degraded.push(SubQuery::Facility);
                FacilitySearch::NoFacility
            }
            Err(_) => {
                tracing::warn!("Facility sub-query timed out after {:?}", timeout);
                degraded.push(SubQuery::Facility);
                FacilitySearch::NoFacility
            }
        };

        self.assemble(point, position, access, degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Snapshot;
    use crate::facility::tests::facility;
    use crate::network::tests::line;
    use crate::repository::{RepositoryError, WriteMode};

    fn p(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lon, lat).unwrap()
    }

    fn dataset() -> Dataset {
        let mut portal = facility("PORTAL_001", "emergency", 0.001, 0.5);
        portal
            .contacts
            .insert("securite".to_string(), "+33 1 23 45 67 89".to_string());

        Dataset {
            config: Config::default(),
            lines: vec![line("A", &[(0.0, 0.0), (0.0, 1.0)], 0.0, 111.2).to_record()],
            facilities: vec![portal, facility("PORTAL_002", "technical", 0.0, 0.5)],
        }
    }

    /// Line repository whose snapshots take a while to produce
    struct SlowRepository {
        inner: MemoryRepository<RailLine>,
        delay: Duration,
    }

    impl Repository<RailLine> for SlowRepository {
        fn snapshot(&self) -> Snapshot<RailLine> {
            std::thread::sleep(self.delay);
            self.inner.snapshot()
        }

        fn put(
            &self,
            item: RailLine,
            mode: WriteMode,
        ) -> std::result::Result<Option<Arc<RailLine>>, RepositoryError> {
            self.inner.put(item, mode)
        }

        fn modify(
            &self,
            id: &str,
            apply: &mut dyn FnMut(&RailLine) -> RailLine,
        ) -> Option<Arc<RailLine>> {
            self.inner.modify(id, apply)
        }

        fn delete(&self, id: &str) -> Option<Arc<RailLine>> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_projection_distance_meters, 5000.0);
        assert_eq!(config.max_facility_distance_meters, 5000.0);
        assert_eq!(config.default_facility_category, "emergency");
        assert_eq!(config.fallback_contacts["secours"], "112");
        assert_eq!(config.fallback_contacts["sncf"], "3635");
    }

    #[test]
    fn test_from_dataset_rejects_duplicates() {
        let mut data = dataset();
        data.facilities.push(facility("PORTAL_001", "emergency", 0.0, 0.0));
        assert!(matches!(
            Locator::from_dataset(data),
            Err(crate::LocatorError::DuplicateFacilityId(id)) if id == "PORTAL_001"
        ));
    }

    #[test]
    fn test_locate_on_line() {
        let locator = Locator::from_dataset(dataset()).unwrap();
        let report = locator.locate(p(0.0001, 0.5));

        let position = report.position_record().unwrap();
        assert_eq!(position.line_id, "A");
        assert_eq!(position.pk, "PK55+597");
        assert_eq!(position.confidence_tier, ConfidenceTier::VeryHigh);

        // PORTAL_002 is closer but not in the emergency category
        let facility = report.facility_record().unwrap();
        assert_eq!(facility.facility_id, "PORTAL_001");
        assert_eq!(facility.category, "emergency");

        assert_eq!(report.contacts.source, ContactSource::Facility);
        assert!(report.contacts.entries.contains_key("securite"));
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_locate_far_away_uses_fallback() {
        let locator = Locator::from_dataset(dataset()).unwrap();
        let report = locator.locate(p(10.0, 10.0));

        assert_eq!(report.position, ProjectionOutcome::NoMatch);
        assert_eq!(report.access, FacilitySearch::NoFacility);
        assert!(report.position_record().is_none());
        assert!(report.facility_record().is_none());
        assert_eq!(report.contacts.source, ContactSource::Fallback);
        assert_eq!(report.contacts.entries, Config::default().fallback_contacts);
    }

    #[tokio::test]
    async fn test_emergency_report_matches_locate() {
        let locator = Locator::from_dataset(dataset()).unwrap();
        let point = p(0.0001, 0.5);

        let concurrent = locator.emergency_report(point).await;
        let sequential = locator.locate(point);

        assert_eq!(concurrent.position, sequential.position);
        assert_eq!(concurrent.access, sequential.access);
        assert_eq!(concurrent.contacts, sequential.contacts);
        assert!(concurrent.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_emergency_report_degrades_on_timeout() {
        let network = NetworkModel::with_repository(SlowRepository {
            inner: MemoryRepository::new(),
            delay: Duration::from_millis(600),
        });
        network
            .register_line(line("A", &[(0.0, 0.0), (0.0, 1.0)], 0.0, 111.2))
            .unwrap();

        let facilities = FacilityIndex::new();
        facilities
            .add(facility("PORTAL_001", "emergency", 0.001, 0.5))
            .unwrap();

        let config = Config {
            sub_query_timeout_ms: 100,
            ..Config::default()
        };
        let locator = Locator::from_parts(Arc::new(network), Arc::new(facilities), config);

        let report = locator.emergency_report(p(0.0001, 0.5)).await;
        assert_eq!(report.degraded, vec![SubQuery::Projection]);
        assert_eq!(report.position, ProjectionOutcome::NoMatch);
        assert!(report.access.is_found());
        // Facility has no contacts of its own
        assert_eq!(report.contacts.source, ContactSource::Fallback);
    }

    #[test]
    fn test_runtime_registration_visible_to_reports() {
        let locator = Locator::new(Config::default());
        let point = p(2.3522, 48.8566);
        assert!(!locator.locate(point).access.is_found());

        locator
            .facilities()
            .add(facility("F1", "emergency", 2.3522, 48.8566))
            .unwrap();
        assert!(locator.locate(point).access.is_found());
    }
}
