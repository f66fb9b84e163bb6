//! NetworkModel - registry of named rail corridors
//!
//! Lines live in a [`Repository`]; the geometry code in the projector and interpolator
//! only ever sees snapshots of it, so the backing store can change freely.

use crate::repository::{MemoryRepository, Repository, RepositoryError, Snapshot, WriteMode};
use crate::{LocatorError, RailLine, RailLineRecord, Result};

use geo::Rect;
use rayon::prelude::*;
use std::sync::Arc;

/// Overview of a registered line
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSummary {
    pub id: String,
    pub name: String,
    pub pk_start: f64,
    pub pk_end: f64,
    pub direction: String,
    pub segments: usize,
    /// Geometric length in meters
    pub length_meters: f64,
    /// Bounding box in degrees
    pub bounding_box: Rect<f64>,
}

impl From<&RailLine> for LineSummary {
    fn from(line: &RailLine) -> Self {
        Self {
            id: line.id().to_string(),
            name: line.name().to_string(),
            pk_start: line.pk_start(),
            pk_end: line.pk_end(),
            direction: line.direction().to_string(),
            segments: line.segment_count(),
            length_meters: line.total_length(),
            bounding_box: line.bounding_box(),
        }
    }
}

/// Registry of rail lines
pub struct NetworkModel<R = MemoryRepository<RailLine>> {
    repository: R,
}

impl Default for NetworkModel {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkModel {
    /// Create an empty network backed by an in-memory repository
    pub fn new() -> Self {
        Self::with_repository(MemoryRepository::new())
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<R: Repository<RailLine>> NetworkModel<R> {
    /// Create a network over an existing repository
    pub fn with_repository(repository: R) -> Self {
        Self { repository }
    }

    /// Register a new line
    ///
    /// Fails with `DuplicateLineId` if a line with the same id exists.
    pub fn register_line(&self, line: RailLine) -> Result<()> {
        let id = line.id().to_string();
        self.repository
            .put(line, WriteMode::Insert)
            .map_err(|err| match err {
                RepositoryError::AlreadyExists(_) => LocatorError::DuplicateLineId(id.clone()),
                RepositoryError::NotFound(_) => LocatorError::LineNotFound(id.clone()),
            })?;

        tracing::info!("Registered rail line {}", id);
        Ok(())
    }

    /// Replace the line registered under `id`
    ///
    /// Fails with `LineNotFound` if absent. The new line must carry the same id.
    pub fn replace_line(&self, id: &str, line: RailLine) -> Result<()> {
        if line.id() != id {
            return Err(LocatorError::InvalidLine {
                line_id: line.id().to_string(),
                reason: format!("replacement must keep the id {}", id),
            });
        }

        self.repository
            .put(line, WriteMode::Replace)
            .map_err(|_| LocatorError::LineNotFound(id.to_string()))?;

        tracing::info!("Replaced rail line {}", id);
        Ok(())
    }

    /// Validate and register many line records
    ///
    /// Records are validated in parallel; registration stops at the first error.
    pub fn load_records(&self, records: Vec<RailLineRecord>) -> Result<usize> {
        #[cfg(feature = "profiling")]
        profiling::scope!("network::load_records");

        let lines: Result<Vec<RailLine>> = records.into_par_iter().map(RailLine::new).collect();
        let lines = lines?;
        let count = lines.len();

        for line in lines {
            self.register_line(line)?;
        }

        Ok(count)
    }

    /// Get a line by id
    #[inline]
    pub fn get_line(&self, id: &str) -> Option<Arc<RailLine>> {
        self.repository.get(id)
    }

    /// All lines in id order
    #[inline]
    pub fn list_lines(&self) -> Vec<Arc<RailLine>> {
        self.repository.list()
    }

    /// Summaries of all lines in id order
    pub fn summaries(&self) -> Vec<LineSummary> {
        self.snapshot()
            .values()
            .map(|line| LineSummary::from(line.as_ref()))
            .collect()
    }

    /// Immutable view of all lines, for a single query
    #[inline]
    pub fn snapshot(&self) -> Snapshot<RailLine> {
        self.repository.snapshot()
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.repository.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.repository.is_empty()
    }
}
