//! Projector - converts a geographic fix into a kilometric position
//!
//! Every segment of every line is tested with [`utils::project_onto_segment`]; the
//! globally closest segment wins. Lines are scanned in id order and a candidate only
//! replaces the current best when strictly closer, so an exact tie between lines goes to
//! the lexically smallest line id, and within a line to the lowest segment index.

use crate::repository::Repository;
use crate::{GeoPoint, NetworkModel, RailLine, format_pk, utils};

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Qualitative closeness of a fix to the line it was projected onto
///
/// Informational only: whether a projection matches is decided by the caller's maximum
/// search distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ConfidenceTier {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceTier {
    /// Tier for a perpendicular distance in meters
    pub fn from_distance(meters: f64) -> Self {
        if meters <= 100.0 {
            ConfidenceTier::VeryHigh
        } else if meters <= 500.0 {
            ConfidenceTier::High
        } else if meters <= 1000.0 {
            ConfidenceTier::Medium
        } else if meters <= 2000.0 {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::VeryHigh => "very-high",
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
            ConfidenceTier::VeryLow => "very-low",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fix expressed as a position along a line
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProjectionResult {
    pub line_id: String,
    pub line_name: String,
    /// Kilometric position, always within the line's declared range
    pub pk: f64,
    pub perpendicular_distance_meters: f64,
    pub segment_index: usize,
    pub segment_count: usize,
    pub confidence: ConfidenceTier,
    pub direction: String,
}

impl ProjectionResult {
    /// Canonical `PK<km>+<meters>` text of the position
    pub fn pk_text(&self) -> String {
        format_pk(self.pk)
    }
}

/// Outcome of a projection: either a match or an explicit "no line nearby"
#[must_use]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "status", content = "result", rename_all = "snake_case")
)]
pub enum ProjectionOutcome {
    Matched(ProjectionResult),
    /// No line lies within the requested search radius
    NoMatch,
}

impl ProjectionOutcome {
    #[inline]
    pub fn is_match(&self) -> bool {
        matches!(self, ProjectionOutcome::Matched(_))
    }

    #[inline]
    pub fn matched(&self) -> Option<&ProjectionResult> {
        match self {
            ProjectionOutcome::Matched(result) => Some(result),
            ProjectionOutcome::NoMatch => None,
        }
    }

    #[inline]
    pub fn into_matched(self) -> Option<ProjectionResult> {
        match self {
            ProjectionOutcome::Matched(result) => Some(result),
            ProjectionOutcome::NoMatch => None,
        }
    }
}

/// Closest segment found so far
struct Candidate<'a> {
    line: &'a Arc<RailLine>,
    segment_index: usize,
    t: f64,
    distance: f64,
}

/// Project a point against one snapshot of the network
pub(crate) fn project_on_lines(
    lines: &BTreeMap<String, Arc<RailLine>>,
    point: GeoPoint,
    max_distance_meters: f64,
) -> ProjectionOutcome {
    #[cfg(feature = "profiling")]
    profiling::scope!("projector::project_on_lines");

    let mut best: Option<Candidate<'_>> = None;

    for line in lines.values() {
        for segment_index in 0..line.segment_count() {
            let Some((start, end)) = line.segment(segment_index) else {
                continue;
            };
            let projection = utils::project_onto_segment(point, start, end);

            if best
                .as_ref()
                .is_none_or(|c| projection.perpendicular_distance_meters < c.distance)
            {
                best = Some(Candidate {
                    line,
                    segment_index,
                    t: projection.t,
                    distance: projection.perpendicular_distance_meters,
                });
            }
        }
    }

    let Some(best) = best else {
        return ProjectionOutcome::NoMatch;
    };

    // Written so that a NaN limit also yields NoMatch
    if !(best.distance <= max_distance_meters) {
        tracing::debug!(
            "No line within {} m of {}: closest is {} at {:.0} m",
            max_distance_meters,
            point,
            best.line.id(),
            best.distance
        );
        return ProjectionOutcome::NoMatch;
    }

    let line = best.line;
    let offset = line.offset_of_segment(best.segment_index).unwrap_or(0.0)
        + best.t * line.segment_length(best.segment_index).unwrap_or(0.0);

    ProjectionOutcome::Matched(ProjectionResult {
        line_id: line.id().to_string(),
        line_name: line.name().to_string(),
        pk: line.pk_at_offset(offset),
        perpendicular_distance_meters: best.distance,
        segment_index: best.segment_index,
        segment_count: line.segment_count(),
        confidence: ConfidenceTier::from_distance(best.distance),
        direction: line.direction().to_string(),
    })
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<R: Repository<RailLine>> NetworkModel<R> {
    /// Project a point onto the nearest line
    ///
    /// # Arguments
    /// * `point` - The fix to project
    /// * `max_distance_meters` - Search radius; beyond it the result is `NoMatch`
    pub fn project(&self, point: GeoPoint, max_distance_meters: f64) -> ProjectionOutcome {
        project_on_lines(&self.snapshot(), point, max_distance_meters)
    }

    /// Project many points against the same snapshot, in parallel
    pub fn project_batch(
        &self,
        points: &[GeoPoint],
        max_distance_meters: f64,
    ) -> Vec<ProjectionOutcome> {
        let snapshot = self.snapshot();
        points
            .par_iter()
            .map(|point| project_on_lines(&snapshot, *point, max_distance_meters))
            .collect()
    }

    /// Check whether a point lies within `max_distance_meters` of any line
    pub fn is_near_railway(&self, point: GeoPoint, max_distance_meters: f64) -> bool {
        self.project(point, max_distance_meters).is_match()
    }
}
