//! LinearInterpolator - inverse of the projector: PK to coordinate

use crate::repository::Repository;
use crate::{GeoPoint, LocatorError, NetworkModel, RailLine, Result, utils};

/// Coordinate at a kilometric value along a line
///
/// Offsets past the end of the geometry (when the declared range is longer than the
/// polyline) map to the last vertex.
pub(crate) fn coordinate_on_line(line: &RailLine, pk: f64) -> Result<GeoPoint> {
    if !line.contains_pk(pk) {
        return Err(LocatorError::PkOutOfRange {
            line_id: line.id().to_string(),
            pk,
            pk_start: line.pk_start(),
            pk_end: line.pk_end(),
        });
    }

    let offset = (pk - line.pk_start()) * 1000.0;

    for segment_index in 0..line.segment_count() {
        let (Some((start, end)), Some(length), Some(segment_offset)) = (
            line.segment(segment_index),
            line.segment_length(segment_index),
            line.offset_of_segment(segment_index),
        ) else {
            break;
        };

        if segment_offset + length >= offset {
            let t = if length > 0.0 {
                (offset - segment_offset) / length
            } else {
                0.0
            };
            return Ok(utils::interpolate(start, end, t));
        }
    }

    // A validated line has at least two vertices, so the last one always exists
    Ok(line.vertices()[line.segment_count()])
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<R: Repository<RailLine>> NetworkModel<R> {
    /// Coordinate at `pk` kilometers along `line_id`
    ///
    /// Fails with `LineNotFound` for an unknown id and `PkOutOfRange` when `pk` lies
    /// outside `[pk_start, pk_end]`.
    pub fn coordinate_at_pk(&self, line_id: &str, pk: f64) -> Result<GeoPoint> {
        let line = self
            .get_line(line_id)
            .ok_or_else(|| LocatorError::LineNotFound(line_id.to_string()))?;
        coordinate_on_line(&line, pk)
    }
}
