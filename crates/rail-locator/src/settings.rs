use clap::{Parser, Subcommand};
use rail_locator_lib::Config;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Rail Locator - Kilometric positions and nearest access facilities from GPS fixes
pub struct Settings {
    /// JSON dataset with lines, facilities and configuration to load on startup
    #[clap(short, long, value_name = "FILE")]
    pub dataset: Option<PathBuf>,

    /// Projection search radius in meters (overrides the dataset)
    #[clap(long, value_name = "METERS")]
    pub max_projection_distance: Option<f64>,

    /// Facility search radius in meters (overrides the dataset)
    #[clap(long, value_name = "METERS")]
    pub max_facility_distance: Option<f64>,

    /// Facility category searched by reports (overrides the dataset)
    #[clap(long, value_name = "CATEGORY")]
    pub default_category: Option<String>,

    /// Timeout of each concurrent report sub-query (overrides the dataset)
    #[clap(long, value_name = "MS")]
    pub sub_query_timeout_ms: Option<u64>,

    /// Pretty-print the JSON output
    #[clap(long, default_value = "false")]
    pub pretty: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the registered lines
    Lines,

    /// Project a coordinate onto the nearest line
    Project {
        #[clap(allow_negative_numbers = true)]
        longitude: f64,
        #[clap(allow_negative_numbers = true)]
        latitude: f64,
    },

    /// Coordinate at a kilometric position, given as `12.5` or `PK12+500`
    Coordinate { line_id: String, pk: String },

    /// Nearest access facility to a coordinate
    Nearest {
        #[clap(allow_negative_numbers = true)]
        longitude: f64,
        #[clap(allow_negative_numbers = true)]
        latitude: f64,

        /// Restrict the search to one category
        #[clap(short, long)]
        category: Option<String>,

        /// Report the nearest facility even outside the search radius
        #[clap(long, default_value = "false")]
        best_guess: bool,
    },

    /// Facility counts by category, status, kind and line
    Stats,

    /// Facilities whose next inspection is due soon
    Maintenance {
        /// Horizon in days, overdue inspections are always included
        #[clap(long, default_value = "7")]
        within_days: i64,
    },

    /// Emergency report: position, nearest access facility and contacts
    Report {
        #[clap(allow_negative_numbers = true)]
        longitude: f64,
        #[clap(allow_negative_numbers = true)]
        latitude: f64,
    },
}

impl Settings {
    /// Overwrite `config` with every option given on the command line
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(meters) = self.max_projection_distance {
            config.max_projection_distance_meters = meters;
        }
        if let Some(meters) = self.max_facility_distance {
            config.max_facility_distance_meters = meters;
        }
        if let Some(category) = &self.default_category {
            config.default_facility_category = category.clone();
        }
        if let Some(ms) = self.sub_query_timeout_ms {
            config.sub_query_timeout_ms = ms;
        }
    }
}
