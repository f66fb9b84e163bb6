//! Rail line storage
//!
//! This module provides the `RailLine` struct for storing a corridor polyline with
//! precomputed metadata like segment lengths, cumulative offsets and bounding box.

use crate::repository::Identified;
use crate::{GeoPoint, LocatorError, Result, utils};
use geo::Rect;

/// Registration record for a rail line, as loaded from configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RailLineRecord {
    pub id: String,
    pub name: String,
    /// Ordered vertices from the PK origin to the end of the line
    pub vertices: Vec<GeoPoint>,
    pub pk_start: f64,
    pub pk_end: f64,
    /// Free-form direction label, e.g. "Paris → Lyon"
    #[cfg_attr(feature = "serde", serde(default))]
    pub direction: String,
}

/// A named rail corridor with a linear kilometric range
///
/// Immutable once built. Segment lengths are great-circle distances computed once during
/// construction.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RailLineRecord", into = "RailLineRecord")
)]
pub struct RailLine {
    id: String,
    name: String,
    vertices: Vec<GeoPoint>,
    pk_start: f64,
    pk_end: f64,
    direction: String,
    /// Length of each segment in meters (`vertices.len() - 1` entries)
    segment_lengths: Vec<f64>,
    /// Distance from the first vertex to the start of each segment, in meters
    cumulative_offsets: Vec<f64>,
    /// Total geometric length in meters
    total_length: f64,
    /// Bounding box in degrees (x = longitude, y = latitude)
    bounding_box: Rect<f64>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RailLine {
    /// Build a rail line from its registration record
    ///
    /// # Returns
    /// The validated line, or `InvalidLine` if it has fewer than two vertices, a
    /// non-finite PK, or `pk_start >= pk_end`
    pub fn new(record: RailLineRecord) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("line::new");

        let RailLineRecord {
            id,
            name,
            vertices,
            pk_start,
            pk_end,
            direction,
        } = record;

        let invalid = |reason: &str| LocatorError::InvalidLine {
            line_id: id.clone(),
            reason: reason.to_string(),
        };

        if vertices.len() < 2 {
            return Err(invalid("a line needs at least two vertices"));
        }
        if !pk_start.is_finite() || !pk_end.is_finite() {
            return Err(invalid("PK bounds must be finite"));
        }
        if pk_start >= pk_end {
            return Err(invalid("pk_start must be lower than pk_end"));
        }

        let (segment_lengths, cumulative_offsets, total_length, bounding_box) =
            Self::compute_metadata(&vertices);

        let declared_length = (pk_end - pk_start) * 1000.0;
        if total_length > declared_length + 1.0 {
            tracing::debug!(
                "Line {} geometry ({:.0} m) is longer than its PK range ({:.0} m); PKs will be clamped",
                id,
                total_length,
                declared_length
            );
        }

        Ok(RailLine {
            id,
            name,
            vertices,
            pk_start,
            pk_end,
            direction,
            segment_lengths,
            cumulative_offsets,
            total_length,
            bounding_box,
        })
    }

    /// Compute all metadata in a single pass over the vertices
    ///
    /// Returns (segment_lengths, cumulative_offsets, total_length, bounding_box)
    fn compute_metadata(vertices: &[GeoPoint]) -> (Vec<f64>, Vec<f64>, f64, Rect<f64>) {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        let segments = vertices.len().saturating_sub(1);
        let mut segment_lengths = Vec::with_capacity(segments);
        let mut cumulative_offsets = Vec::with_capacity(segments);
        let mut total_length = 0.0;

        for (i, vertex) in vertices.iter().enumerate() {
            min_x = min_x.min(vertex.longitude());
            min_y = min_y.min(vertex.latitude());
            max_x = max_x.max(vertex.longitude());
            max_y = max_y.max(vertex.latitude());

            if let Some(next) = vertices.get(i + 1) {
                let length = utils::great_circle_distance(*vertex, *next);
                cumulative_offsets.push(total_length);
                segment_lengths.push(length);
                total_length += length;
            }
        }

        let bounding_box = Rect::new(
            geo::Coord { x: min_x, y: min_y },
            geo::Coord { x: max_x, y: max_y },
        );

        (segment_lengths, cumulative_offsets, total_length, bounding_box)
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn direction(&self) -> &str {
        &self.direction
    }

    #[inline]
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    #[inline]
    pub fn pk_start(&self) -> f64 {
        self.pk_start
    }

    #[inline]
    pub fn pk_end(&self) -> f64 {
        self.pk_end
    }

    /// Number of segments (always at least one)
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segment_lengths.len()
    }

    /// Get a segment's endpoints by index
    #[inline]
    pub fn segment(&self, index: usize) -> Option<(GeoPoint, GeoPoint)> {
        Some((*self.vertices.get(index)?, *self.vertices.get(index + 1)?))
    }

    /// Great-circle length of a segment in meters
    #[inline]
    pub fn segment_length(&self, index: usize) -> Option<f64> {
        self.segment_lengths.get(index).copied()
    }

    /// Distance along the line from the first vertex to the start of a segment, in meters
    #[inline]
    pub fn offset_of_segment(&self, index: usize) -> Option<f64> {
        self.cumulative_offsets.get(index).copied()
    }

    /// Total geometric length in meters
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    /// Bounding box in degrees
    #[inline]
    pub fn bounding_box(&self) -> Rect<f64> {
        self.bounding_box
    }

    /// Check whether a kilometric value lies inside the declared range
    #[inline]
    pub fn contains_pk(&self, pk: f64) -> bool {
        (self.pk_start..=self.pk_end).contains(&pk)
    }

    /// Convert a distance along the line (meters from the first vertex) into a PK
    ///
    /// The result is clamped to the declared range.
    #[inline]
    pub fn pk_at_offset(&self, offset_meters: f64) -> f64 {
        (self.pk_start + offset_meters / 1000.0).clamp(self.pk_start, self.pk_end)
    }

    /// Registration record equivalent to this line
    pub fn to_record(&self) -> RailLineRecord {
        RailLineRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            vertices: self.vertices.clone(),
            pk_start: self.pk_start,
            pk_end: self.pk_end,
            direction: self.direction.clone(),
        }
    }
}

impl Identified for RailLine {
    fn id(&self) -> &str {
        &self.id
    }
}

impl TryFrom<RailLineRecord> for RailLine {
    type Error = LocatorError;

    fn try_from(record: RailLineRecord) -> Result<Self> {
        RailLine::new(record)
    }
}

impl From<RailLine> for RailLineRecord {
    fn from(line: RailLine) -> Self {
        line.to_record()
    }
}
