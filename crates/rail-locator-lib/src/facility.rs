//! FacilityIndex - registry of categorized access facilities
//!
//! Nearest-neighbour search is a linear scan over one snapshot of the registry. Like the
//! projector, facilities are visited in id order and only a strictly closer candidate
//! replaces the current best, so equidistant facilities resolve to the smallest id no
//! matter in which order they were registered.

use crate::repository::{MemoryRepository, Repository, RepositoryError, Snapshot, WriteMode};
use crate::{GeoPoint, LocatorError, Pk, Result, utils};

use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Days between inspections scheduled for newly added facilities
pub const INSPECTION_INTERVAL_DAYS: u64 = 30;

fn default_status() -> String {
    "open".to_string()
}

/// A categorized point of interest along the network
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Facility {
    pub id: String,
    pub name: String,
    /// Physical kind of access, e.g. `passage_pieton`
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: String,
    /// The only dimension searches filter on, e.g. `emergency`
    pub category: String,
    pub location: GeoPoint,
    #[cfg_attr(feature = "serde", serde(default))]
    pub equipment: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub restrictions: Vec<String>,
    /// Contact kind to value, e.g. `"securite" -> "+33 1 23 45 67 89"`
    #[cfg_attr(feature = "serde", serde(default))]
    pub contacts: BTreeMap<String, String>,
    #[cfg_attr(feature = "serde", serde(default = "default_status"))]
    pub status: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub line_id: Option<String>,
    /// Kilometric label as printed on site, e.g. `PK12+500`
    #[cfg_attr(feature = "serde", serde(default))]
    pub pk: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub access_hours: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub last_inspection: Option<NaiveDate>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub next_inspection: Option<NaiveDate>,
}

impl Facility {
    /// Create an open facility with no equipment, contacts or schedule
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        location: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: String::new(),
            category: category.into(),
            location,
            equipment: Vec::new(),
            restrictions: Vec::new(),
            contacts: BTreeMap::new(),
            status: default_status(),
            line_id: None,
            pk: None,
            access_hours: None,
            last_inspection: None,
            next_inspection: None,
        }
    }

    /// Parsed kilometric label, if present and well formed
    pub fn pk_value(&self) -> Option<Pk> {
        self.pk.as_deref().and_then(|label| label.parse().ok())
    }
}

impl crate::repository::Identified for Facility {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial update for [`FacilityIndex::update`]: `Some` fields overwrite, `None` keep
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct FacilityUpdate {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub category: Option<String>,
    pub location: Option<GeoPoint>,
    pub equipment: Option<Vec<String>>,
    pub restrictions: Option<Vec<String>>,
    pub contacts: Option<BTreeMap<String, String>>,
    pub status: Option<String>,
    pub line_id: Option<String>,
    pub pk: Option<String>,
    pub access_hours: Option<String>,
    pub last_inspection: Option<NaiveDate>,
    pub next_inspection: Option<NaiveDate>,
}

impl FacilityUpdate {
    fn apply(&self, current: &Facility) -> Facility {
        let mut next = current.clone();
        macro_rules! overwrite {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    next.$field = value.clone();
                })*
            };
        }
        overwrite!(name, kind, category, location, equipment, restrictions, contacts, status);

        if let Some(line_id) = &self.line_id {
            next.line_id = Some(line_id.clone());
        }
        if let Some(pk) = &self.pk {
            next.pk = Some(pk.clone());
        }
        if let Some(access_hours) = &self.access_hours {
            next.access_hours = Some(access_hours.clone());
        }
        if self.last_inspection.is_some() {
            next.last_inspection = self.last_inspection;
        }
        if self.next_inspection.is_some() {
            next.next_inspection = self.next_inspection;
        }
        next
    }
}

/// Nearest facility to a query point
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacilitySearchResult {
    pub facility: Arc<Facility>,
    pub distance_meters: f64,
    /// Always `true` from [`FacilityIndex::find_nearest`]; only a best guess can be `false`
    pub within_threshold: bool,
}

/// Outcome of a facility search: either a facility or an explicit "nothing nearby"
#[must_use]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "status", content = "result", rename_all = "snake_case")
)]
pub enum FacilitySearch {
    Found(FacilitySearchResult),
    NoFacility,
}

impl FacilitySearch {
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, FacilitySearch::Found(_))
    }

    #[inline]
    pub fn found(&self) -> Option<&FacilitySearchResult> {
        match self {
            FacilitySearch::Found(result) => Some(result),
            FacilitySearch::NoFacility => None,
        }
    }

    #[inline]
    pub fn into_found(self) -> Option<FacilitySearchResult> {
        match self {
            FacilitySearch::Found(result) => Some(result),
            FacilitySearch::NoFacility => None,
        }
    }
}

/// Facility counts over the current registry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacilityStats {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
    /// Only facilities attached to a line are counted here
    pub by_line: BTreeMap<String, usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum MaintenancePriority {
    /// Inspection is due today or overdue
    Urgent,
    High,
}

/// A facility whose next inspection falls inside the requested horizon
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaintenanceDue {
    pub facility: Arc<Facility>,
    /// Negative when overdue
    pub days_until: i64,
    pub priority: MaintenancePriority,
}

/// Closest facility in `facilities`, optionally restricted to one category
fn nearest_in<'a>(
    facilities: &'a BTreeMap<String, Arc<Facility>>,
    point: GeoPoint,
    category: Option<&str>,
) -> Option<(&'a Arc<Facility>, f64)> {
    #[cfg(feature = "profiling")]
    profiling::scope!("facility::nearest_in");

    let mut best: Option<(&Arc<Facility>, f64)> = None;

    for facility in facilities.values() {
        if category.is_some_and(|category| facility.category != category) {
            continue;
        }
        let distance = utils::great_circle_distance(point, facility.location);
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((facility, distance));
        }
    }

    best
}

/// Registry of access facilities
pub struct FacilityIndex<R = MemoryRepository<Facility>> {
    repository: R,
}

impl Default for FacilityIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FacilityIndex {
    /// Create an empty index backed by an in-memory repository
    pub fn new() -> Self {
        Self::with_repository(MemoryRepository::new())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<R: Repository<Facility>> FacilityIndex<R> {
    pub fn with_repository(repository: R) -> Self {
        Self { repository }
    }

    /// Add a facility, scheduling its first inspection if it has none
    ///
    /// Fails with `DuplicateFacilityId` if the id is taken.
    pub fn add(&self, facility: Facility) -> Result<()> {
        self.add_on(facility, chrono::Local::now().date_naive())
    }

    /// Add a facility as of `today`
    ///
    /// A facility without `next_inspection` is inspected on `today` and scheduled again
    /// [`INSPECTION_INTERVAL_DAYS`] later. Existing dates are kept.
    pub fn add_on(&self, mut facility: Facility, today: NaiveDate) -> Result<()> {
        if facility.next_inspection.is_none() {
            facility.last_inspection.get_or_insert(today);
            facility.next_inspection =
                today.checked_add_days(Days::new(INSPECTION_INTERVAL_DAYS));
        }
        self.insert(facility)
    }

    fn insert(&self, facility: Facility) -> Result<()> {
        let id = facility.id.clone();
        self.repository
            .put(facility, WriteMode::Insert)
            .map_err(|err| match err {
                RepositoryError::AlreadyExists(_) => LocatorError::DuplicateFacilityId(id.clone()),
                RepositoryError::NotFound(_) => LocatorError::FacilityNotFound(id.clone()),
            })?;

        tracing::info!("Added facility {}", id);
        Ok(())
    }

    /// Apply `changes` to the facility `id` and return the updated record
    pub fn update(&self, id: &str, changes: FacilityUpdate) -> Result<Arc<Facility>> {
        let updated = self
            .repository
            .modify(id, &mut |current| changes.apply(current))
            .ok_or_else(|| LocatorError::FacilityNotFound(id.to_string()))?;

        tracing::info!("Updated facility {}", id);
        Ok(updated)
    }

    /// Remove a facility, returning it
    pub fn remove(&self, id: &str) -> Result<Arc<Facility>> {
        let removed = self
            .repository
            .delete(id)
            .ok_or_else(|| LocatorError::FacilityNotFound(id.to_string()))?;

        tracing::info!("Removed facility {}", id);
        Ok(removed)
    }

    /// Add many existing facilities as they are, stopping at the first duplicate
    ///
    /// Unlike [`FacilityIndex::add`], no inspection is scheduled.
    pub fn load(&self, facilities: Vec<Facility>) -> Result<usize> {
        let count = facilities.len();
        for facility in facilities {
            self.insert(facility)?;
        }
        Ok(count)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<Arc<Facility>> {
        self.repository.get(id)
    }

    /// All facilities in id order
    #[inline]
    pub fn all(&self) -> Vec<Arc<Facility>> {
        self.repository.list()
    }

    #[inline]
    pub fn snapshot(&self) -> Snapshot<Facility> {
        self.repository.snapshot()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.repository.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.repository.is_empty()
    }

    /// Nearest facility within `max_distance_meters`
    ///
    /// # Arguments
    /// * `point` - Query location
    /// * `category` - Restrict the search to one category
    /// * `max_distance_meters` - Search radius
    ///
    /// # Returns
    /// `NoFacility` when the index is empty, nothing matches the category, or the
    /// nearest candidate lies outside the radius. Never an error.
    pub fn find_nearest(
        &self,
        point: GeoPoint,
        category: Option<&str>,
        max_distance_meters: f64,
    ) -> FacilitySearch {
        let snapshot = self.snapshot();

        match nearest_in(&snapshot, point, category) {
            Some((facility, distance)) if distance <= max_distance_meters => {
                FacilitySearch::Found(FacilitySearchResult {
                    facility: facility.clone(),
                    distance_meters: distance,
                    within_threshold: true,
                })
            }
            Some((facility, distance)) => {
                tracing::debug!(
                    "No {} facility within {} m of {}: closest is {} at {:.0} m",
                    category.unwrap_or("any"),
                    max_distance_meters,
                    point,
                    facility.id,
                    distance
                );
                FacilitySearch::NoFacility
            }
            None => FacilitySearch::NoFacility,
        }
    }

    /// Nearest facility regardless of distance
    ///
    /// `within_threshold` reports whether it lies within `max_distance_meters`. Only an
    /// empty (or fully filtered) index yields `NoFacility`.
    pub fn best_guess(
        &self,
        point: GeoPoint,
        category: Option<&str>,
        max_distance_meters: f64,
    ) -> FacilitySearch {
        let snapshot = self.snapshot();

        match nearest_in(&snapshot, point, category) {
            Some((facility, distance)) => FacilitySearch::Found(FacilitySearchResult {
                facility: facility.clone(),
                distance_meters: distance,
                within_threshold: distance <= max_distance_meters,
            }),
            None => FacilitySearch::NoFacility,
        }
    }

    pub fn list_by_category(&self, category: &str) -> Vec<Arc<Facility>> {
        self.snapshot()
            .values()
            .filter(|facility| facility.category == category)
            .cloned()
            .collect()
    }

    pub fn list_by_line(&self, line_id: &str) -> Vec<Arc<Facility>> {
        self.snapshot()
            .values()
            .filter(|facility| facility.line_id.as_deref() == Some(line_id))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> FacilityStats {
        let snapshot = self.snapshot();
        let mut stats = FacilityStats {
            total: snapshot.len(),
            ..Default::default()
        };

        for facility in snapshot.values() {
            *stats.by_category.entry(facility.category.clone()).or_default() += 1;
            *stats.by_status.entry(facility.status.clone()).or_default() += 1;
            *stats.by_kind.entry(facility.kind.clone()).or_default() += 1;
            if let Some(line_id) = &facility.line_id {
                *stats.by_line.entry(line_id.clone()).or_default() += 1;
            }
        }

        stats
    }

    /// Facilities due for inspection within `within_days` of today (local time)
    pub fn due_for_maintenance(&self, within_days: i64) -> Vec<MaintenanceDue> {
        self.due_for_maintenance_on(chrono::Local::now().date_naive(), within_days)
    }

    /// Facilities whose next inspection is at most `within_days` after `today`
    ///
    /// Overdue inspections are included. Sorted by days remaining, then id.
    pub fn due_for_maintenance_on(&self, today: NaiveDate, within_days: i64) -> Vec<MaintenanceDue> {
        let mut due: Vec<MaintenanceDue> = self
            .snapshot()
            .values()
            .filter_map(|facility| {
                let next = facility.next_inspection?;
                let days_until = (next - today).num_days();
                (days_until <= within_days).then(|| MaintenanceDue {
                    facility: facility.clone(),
                    days_until,
                    priority: if days_until <= 0 {
                        MaintenancePriority::Urgent
                    } else {
                        MaintenancePriority::High
                    },
                })
            })
            .collect();

        due.sort_by(|a, b| {
            a.days_until
                .cmp(&b.days_until)
                .then_with(|| a.facility.id.cmp(&b.facility.id))
        });
        due
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One meter north, in degrees of latitude
    const METER_IN_DEGREES: f64 = 1.0 / 111_194.93;

    pub(crate) fn facility(id: &str, category: &str, lon: f64, lat: f64) -> Facility {
        Facility::new(
            id,
            format!("Facility {}", id),
            category,
            GeoPoint::new(lon, lat).unwrap(),
        )
    }

    fn p(lon: f64, lat: f64) -> GeoPoint {
        GeoPoint::new(lon, lat).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paris_index() -> FacilityIndex {
        let index = FacilityIndex::new();
        index
            .load(vec![
                facility("PORTAL_001", "emergency", 2.3522, 48.8566),
                facility("PORTAL_002", "technical", 2.3525, 48.857),
                facility("PORTAL_003", "construction", 2.353, 48.8575),
                facility("PORTAL_004", "inspection", 2.3535, 48.858),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_find_nearest_ten_meters_away() {
        let index = FacilityIndex::new();
        index
            .add(facility("F1", "emergency", 2.3522, 48.8566))
            .unwrap();

        let query = p(2.3522, 48.8566 + 10.0 * METER_IN_DEGREES);
        let result = index
            .find_nearest(query, Some("emergency"), 5000.0)
            .into_found()
            .unwrap();

        assert_eq!(result.facility.id, "F1");
        assert!((result.distance_meters - 10.0).abs() < 0.01, "d={}", result.distance_meters);
        assert!(result.within_threshold);
    }

    #[test]
    fn test_find_nearest_outside_radius() {
        let index = FacilityIndex::new();
        index
            .add(facility("F1", "emergency", 2.3522, 48.8566))
            .unwrap();

        let query = p(2.3522, 48.8566 + 10_000.0 * METER_IN_DEGREES);
        assert_eq!(
            index.find_nearest(query, Some("emergency"), 5000.0),
            FacilitySearch::NoFacility
        );
    }

    #[test]
    fn test_find_nearest_on_empty_index() {
        let index = FacilityIndex::new();
        assert_eq!(
            index.find_nearest(p(0.0, 0.0), None, 5000.0),
            FacilitySearch::NoFacility
        );
        assert_eq!(
            index.best_guess(p(0.0, 0.0), None, 5000.0),
            FacilitySearch::NoFacility
        );
    }

    #[test]
    fn test_nan_or_negative_radius_finds_nothing() {
        let index = paris_index();
        let query = p(2.3522, 48.8566);
        assert!(!index.find_nearest(query, None, f64::NAN).is_found());
        assert!(!index.find_nearest(query, None, -1.0).is_found());
    }

    #[test]
    fn test_category_filter() {
        let index = paris_index();
        let query = p(2.3522, 48.8566);

        let any = index.find_nearest(query, None, 5000.0).into_found().unwrap();
        assert_eq!(any.facility.id, "PORTAL_001");

        let technical = index
            .find_nearest(query, Some("technical"), 5000.0)
            .into_found()
            .unwrap();
        assert_eq!(technical.facility.id, "PORTAL_002");
        assert!(technical.distance_meters > 0.0);

        assert!(!index.find_nearest(query, Some("hospital"), 5000.0).is_found());
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let facilities = vec![
            facility("B", "emergency", 1.0, 1.0),
            facility("A", "emergency", 1.0, 1.0),
            facility("C", "emergency", 1.001, 1.0),
        ];

        let forward = FacilityIndex::new();
        forward.load(facilities.clone()).unwrap();
        let backward = FacilityIndex::new();
        backward
            .load(facilities.into_iter().rev().collect())
            .unwrap();

        let query = p(1.0, 1.0005);
        let a = forward.find_nearest(query, None, 5000.0);
        let b = backward.find_nearest(query, None, 5000.0);
        assert_eq!(a, b);
        // A and B are at the same spot: the smaller id wins
        assert_eq!(a.found().unwrap().facility.id, "A");
    }

    #[test]
    fn test_best_guess_reports_threshold() {
        let index = paris_index();
        let far = p(2.3522, 48.8566 + 10_000.0 * METER_IN_DEGREES);

        assert!(!index.find_nearest(far, Some("emergency"), 5000.0).is_found());

        let guess = index
            .best_guess(far, Some("emergency"), 5000.0)
            .into_found()
            .unwrap();
        assert_eq!(guess.facility.id, "PORTAL_001");
        assert!(!guess.within_threshold);
        assert!(guess.distance_meters > 5000.0);

        let near = index
            .best_guess(p(2.3522, 48.8566), Some("emergency"), 5000.0)
            .into_found()
            .unwrap();
        assert!(near.within_threshold);
    }

    #[test]
    fn test_crud_errors() {
        let index = paris_index();

        assert_eq!(
            index.add(facility("PORTAL_001", "emergency", 0.0, 0.0)),
            Err(LocatorError::DuplicateFacilityId("PORTAL_001".to_string()))
        );
        assert_eq!(
            index.update("missing", FacilityUpdate::default()).unwrap_err(),
            LocatorError::FacilityNotFound("missing".to_string())
        );
        assert_eq!(
            index.remove("missing").unwrap_err(),
            LocatorError::FacilityNotFound("missing".to_string())
        );

        let removed = index.remove("PORTAL_004").unwrap();
        assert_eq!(removed.category, "inspection");
        assert_eq!(index.len(), 3);
        assert!(index.get("PORTAL_004").is_none());
    }

    #[test]
    fn test_update_changes_only_given_fields() {
        let index = paris_index();
        let updated = index
            .update(
                "PORTAL_002",
                FacilityUpdate {
                    status: Some("closed".to_string()),
                    line_id: Some("LIGNE_PARIS_LYON".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.status, "closed");
        assert_eq!(updated.line_id.as_deref(), Some("LIGNE_PARIS_LYON"));
        assert_eq!(updated.category, "technical");
        assert_eq!(index.get("PORTAL_002").unwrap(), updated);
    }

    #[test]
    fn test_list_by_category_and_line() {
        let index = paris_index();
        index
            .update(
                "PORTAL_003",
                FacilityUpdate {
                    line_id: Some("L1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let emergency = index.list_by_category("emergency");
        assert_eq!(emergency.len(), 1);
        assert_eq!(emergency[0].id, "PORTAL_001");

        let on_line = index.list_by_line("L1");
        assert_eq!(on_line.len(), 1);
        assert_eq!(on_line[0].id, "PORTAL_003");
        assert!(index.list_by_line("L2").is_empty());
    }

    #[test]
    fn test_stats() {
        let index = paris_index();
        index
            .update(
                "PORTAL_001",
                FacilityUpdate {
                    status: Some("closed".to_string()),
                    kind: Some("passage_pieton".to_string()),
                    line_id: Some("L1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let stats = index.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_category["emergency"], 1);
        assert_eq!(stats.by_category.len(), 4);
        assert_eq!(stats.by_status["open"], 3);
        assert_eq!(stats.by_status["closed"], 1);
        assert_eq!(stats.by_kind["passage_pieton"], 1);
        assert_eq!(stats.by_line["L1"], 1);
        assert_eq!(stats.by_line.len(), 1);
    }

    #[test]
    fn test_due_for_maintenance() {
        let index = paris_index();
        let today = date(2024, 3, 10);
        let schedule = [
            ("PORTAL_001", date(2024, 3, 8)),
            ("PORTAL_002", date(2024, 3, 15)),
            ("PORTAL_003", date(2024, 4, 30)),
        ];
        for (id, next) in schedule {
            index
                .update(
                    id,
                    FacilityUpdate {
                        next_inspection: Some(next),
                        ..Default::default()
                    },
                )
                .unwrap();
        }

        let due = index.due_for_maintenance_on(today, 7);
        let summary: Vec<(&str, i64, MaintenancePriority)> = due
            .iter()
            .map(|d| (d.facility.id.as_str(), d.days_until, d.priority))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("PORTAL_001", -2, MaintenancePriority::Urgent),
                ("PORTAL_002", 5, MaintenancePriority::High),
            ]
        );

        assert_eq!(index.due_for_maintenance_on(today, 60).len(), 3);
    }

    #[test]
    fn test_radius_is_inclusive() {
        let index = FacilityIndex::new();
        index
            .add(facility("F1", "emergency", 2.3522, 48.8566))
            .unwrap();

        let query = p(2.3522, 48.8566 + 250.0 * METER_IN_DEGREES);
        let distance = utils::great_circle_distance(query, p(2.3522, 48.8566));

        let at_radius = index
            .find_nearest(query, Some("emergency"), distance)
            .into_found()
            .unwrap();
        assert_eq!(at_radius.distance_meters, distance);
        assert!(at_radius.within_threshold);

        let just_below = f64::from_bits(distance.to_bits() - 1);
        assert_eq!(
            index.find_nearest(query, Some("emergency"), just_below),
            FacilitySearch::NoFacility
        );
        let guess = index
            .best_guess(query, Some("emergency"), just_below)
            .into_found()
            .unwrap();
        assert!(!guess.within_threshold);
    }

    #[test]
    fn test_maintenance_horizon_is_inclusive() {
        let index = FacilityIndex::new();
        let today = date(2024, 3, 10);
        let mut portal = facility("P", "emergency", 0.0, 0.0);
        portal.next_inspection = Some(date(2024, 3, 17));
        index.add_on(portal, today).unwrap();

        let due = index.due_for_maintenance_on(today, 7);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].days_until, 7);
        assert_eq!(due[0].priority, MaintenancePriority::High);
        assert!(index.due_for_maintenance_on(today, 6).is_empty());
    }

    #[test]
    fn test_add_schedules_first_inspection() {
        let index = FacilityIndex::new();
        let today = date(2024, 3, 10);
        index
            .add_on(facility("NEW", "emergency", 0.0, 0.0), today)
            .unwrap();

        let added = index.get("NEW").unwrap();
        assert_eq!(added.last_inspection, Some(today));
        assert_eq!(added.next_inspection, Some(date(2024, 4, 9)));

        let due = index.due_for_maintenance_on(today, 30);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].days_until, 30);
        assert!(index.due_for_maintenance_on(today, 29).is_empty());

        // Existing schedules and bulk loads are left alone
        let mut scheduled = facility("OLD", "emergency", 0.0, 0.0);
        scheduled.next_inspection = Some(date(2024, 3, 12));
        index.add_on(scheduled, today).unwrap();
        assert_eq!(index.get("OLD").unwrap().last_inspection, None);
        assert_eq!(index.get("OLD").unwrap().next_inspection, Some(date(2024, 3, 12)));

        index
            .load(vec![facility("BULK", "emergency", 0.0, 0.0)])
            .unwrap();
        assert_eq!(index.get("BULK").unwrap().next_inspection, None);
    }

    #[test]
    fn test_pk_label() {
        let mut portal = facility("P", "emergency", 0.0, 0.0);
        assert_eq!(portal.pk_value(), None);
        portal.pk = Some("PK12+500".to_string());
        assert_eq!(portal.pk_value(), Some(Pk(12.5)));
        portal.pk = Some("near the bridge".to_string());
        assert_eq!(portal.pk_value(), None);
    }
}
