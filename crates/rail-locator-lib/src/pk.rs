//! Kilometric position text format: `PK<km>+<meters>`

use crate::{LocatorError, Result};
use std::fmt;
use std::str::FromStr;

/// A kilometric position along a line, in kilometers
///
/// Displays in the canonical `PK123+500` form. Meters are rounded to the nearest whole
/// meter, carrying into the kilometer when needed (`12.9996` displays as `PK13+000`).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pk(pub f64);

impl Pk {
    #[inline]
    pub fn km(&self) -> f64 {
        self.0
    }
}

/// Format a kilometric value as `PK<km>+<meters>`
pub fn format_pk(pk: f64) -> String {
    Pk(pk).to_string()
}

impl fmt::Display for Pk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_meters = (self.0 * 1000.0).round();
        let sign = if total_meters < 0.0 { "-" } else { "" };
        let total_meters = total_meters.abs() as u64;
        write!(
            f,
            "PK{}{}+{:03}",
            sign,
            total_meters / 1000,
            total_meters % 1000
        )
    }
}

impl FromStr for Pk {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LocatorError::InvalidPk(s.to_string());

        let body = s
            .trim()
            .strip_prefix("PK")
            .or_else(|| s.trim().strip_prefix("pk"))
            .ok_or_else(invalid)?;
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (km, meters) = body.split_once('+').ok_or_else(invalid)?;

        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(km) || !all_digits(meters) || meters.len() > 3 {
            return Err(invalid());
        }

        let km: u64 = km.parse().map_err(|_| invalid())?;
        let meters: u64 = meters.parse().map_err(|_| invalid())?;
        let value = km as f64 + meters as f64 / 1000.0;

        Ok(Pk(if negative { -value } else { value }))
    }
}
