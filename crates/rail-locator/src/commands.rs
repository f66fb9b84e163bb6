//! Subcommand execution, every command yields a JSON value

use crate::settings::Command;
use anyhow::Context;
use rail_locator_lib::{FacilitySearch, GeoPoint, Locator, Pk, ProjectionOutcome, format_pk};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct CoordinateOutput<'a> {
    line_id: &'a str,
    pk: f64,
    pk_text: String,
    location: GeoPoint,
}

/// Parse a kilometric position given either as kilometers or as `PK<km>+<meters>`
pub fn parse_pk(text: &str) -> anyhow::Result<f64> {
    if let Ok(km) = text.trim().parse::<f64>() {
        return Ok(km);
    }
    let pk: Pk = text.parse()?;
    Ok(pk.km())
}

pub async fn run(command: &Command, locator: &Locator) -> anyhow::Result<Value> {
    let config = locator.config();

    let value = match command {
        Command::Lines => serde_json::to_value(locator.network().summaries())?,

        Command::Project {
            longitude,
            latitude,
        } => {
            let point = GeoPoint::new(*longitude, *latitude)?;
            let outcome = locator
                .network()
                .project(point, config.max_projection_distance_meters);
            if let ProjectionOutcome::NoMatch = outcome {
                tracing::warn!(
                    "No line within {} m of {}",
                    config.max_projection_distance_meters,
                    point
                );
            }
            serde_json::to_value(outcome)?
        }

        Command::Coordinate { line_id, pk } => {
            let pk = parse_pk(pk).with_context(|| format!("Invalid PK {:?}", pk))?;
            let location = locator.network().coordinate_at_pk(line_id, pk)?;
            serde_json::to_value(CoordinateOutput {
                line_id,
                pk,
                pk_text: format_pk(pk),
                location,
            })?
        }

        Command::Nearest {
            longitude,
            latitude,
            category,
            best_guess,
        } => {
            let point = GeoPoint::new(*longitude, *latitude)?;
            let facilities = locator.facilities();
            let search = if *best_guess {
                facilities.best_guess(
                    point,
                    category.as_deref(),
                    config.max_facility_distance_meters,
                )
            } else {
                facilities.find_nearest(
                    point,
                    category.as_deref(),
                    config.max_facility_distance_meters,
                )
            };
            if let FacilitySearch::NoFacility = search {
                tracing::warn!(
                    "No facility within {} m of {}",
                    config.max_facility_distance_meters,
                    point
                );
            }
            serde_json::to_value(search)?
        }

        Command::Stats => serde_json::to_value(locator.facilities().stats())?,

        Command::Maintenance { within_days } => {
            let due = locator.facilities().due_for_maintenance(*within_days);
            tracing::info!("{} facilities due within {} days", due.len(), within_days);
            serde_json::to_value(due)?
        }

        Command::Report {
            longitude,
            latitude,
        } => {
            let point = GeoPoint::new(*longitude, *latitude)?;
            let report = locator.emergency_report(point).await;
            if report.is_degraded() {
                tracing::warn!("Report degraded: {:?}", report.degraded);
            }
            serde_json::to_value(report)?
        }
    };

    Ok(value)
}
