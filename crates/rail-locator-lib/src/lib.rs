//! Rail Locator Library - Linear Referencing and Access Facility Search
//!
//! This library converts raw GPS fixes into kilometric positions (PK) along named rail
//! corridors, performs the inverse mapping from a PK back to a coordinate, and finds the
//! nearest categorized access facility to a point.
//!
//! # Architecture
//!
//! - **[`utils`]**: Great-circle distance and the local tangent-plane segment projection
//! - **[`RailLine`]**: Immutable corridor geometry with precomputed segment lengths
//! - **[`NetworkModel`]**: Registry of rail lines backed by a [`Repository`]
//! - **[`ProjectionOutcome`]**: Result of projecting a point onto the network
//! - **[`FacilityIndex`]**: Registry of access facilities with nearest-neighbour search
//! - **[`Locator`]**: High-level façade combining both into emergency reports
//!
//! # Concurrency
//!
//! Registries are copy-on-write: every query reads one immutable snapshot, and writers
//! publish a new snapshot atomically. Queries never block on writers.
//!
//! # Accuracy
//!
//! Distances to segments use a local flat-Earth approximation per segment, which is
//! accurate for segments up to a few kilometres long. Point-to-point distances use the
//! haversine formula on a spherical Earth.

mod facility;
mod interpolator;
mod line;
mod locator;
mod network;
mod pk;
mod point;
mod projector;
mod repository;
pub mod utils;

// Public API exports
pub use facility::{
    Facility, FacilityIndex, FacilitySearch, FacilitySearchResult, FacilityStats, FacilityUpdate,
    INSPECTION_INTERVAL_DAYS, MaintenanceDue, MaintenancePriority,
};
pub use line::{RailLine, RailLineRecord};
pub use locator::{
    Config, ContactSource, Dataset, EmergencyContacts, EmergencyReport, FacilityRecord, Locator,
    PositionRecord, SubQuery,
};
pub use network::{LineSummary, NetworkModel};
pub use pk::{Pk, format_pk};
pub use point::GeoPoint;
pub use projector::{ConfidenceTier, ProjectionOutcome, ProjectionResult};
pub use repository::{Identified, MemoryRepository, Repository, RepositoryError, Snapshot, WriteMode};

/// Error types for the locator engine
///
/// These are validation failures: they are fatal to the single call and retrying the
/// same call cannot change the outcome. "Nothing nearby" is not an error, see
/// [`ProjectionOutcome::NoMatch`] and [`FacilitySearch::NoFacility`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocatorError {
    #[error("Invalid coordinate: longitude {longitude}, latitude {latitude}")]
    InvalidCoordinate { longitude: f64, latitude: f64 },

    #[error("PK {pk} out of range [{pk_start}, {pk_end}] on line {line_id}")]
    PkOutOfRange {
        line_id: String,
        pk: f64,
        pk_start: f64,
        pk_end: f64,
    },

    #[error("Duplicate line id: {0}")]
    DuplicateLineId(String),

    #[error("Duplicate facility id: {0}")]
    DuplicateFacilityId(String),

    #[error("Line not found: {0}")]
    LineNotFound(String),

    #[error("Facility not found: {0}")]
    FacilityNotFound(String),

    #[error("Invalid line {line_id}: {reason}")]
    InvalidLine { line_id: String, reason: String },

    #[error("Invalid PK text: {0}")]
    InvalidPk(String),
}

pub type Result<T> = std::result::Result<T, LocatorError>;
