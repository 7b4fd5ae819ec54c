//! Resolving a partially specified (segment, time) request into a concrete point.
use tracing::debug;

use crate::error::{Result, WaqError};
use crate::grid::GridIndex;
use crate::map::MapStore;
use crate::reduce::nan_argmax;

/// Which coordinates the caller fixed. The rest are found by searching for the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointRequest {
    /// Search every active cell at every time.
    Unspecified,
    /// Segment fixed, search its time series.
    Segment(usize),
    /// Time fixed, search the active cells at that time.
    Time(usize),
    Both { segment: usize, time: usize },
}

impl PointRequest {
    /// Builds a request from optional raw indices, `None` meaning "search".
    pub fn from_indices(segment: Option<i64>, time: Option<i64>) -> Result<Self> {
        let check = |what: &str, v: Option<i64>| -> Result<Option<usize>> {
            match v {
                Some(v) if v < 0 => Err(WaqError::InvalidCoordinate(format!("{what} index {v} is negative"))),
                Some(v) => Ok(Some(v as usize)),
                None => Ok(None),
            }
        };
        Ok(match (check("segment", segment)?, check("time", time)?) {
            (None, None) => PointRequest::Unspecified,
            (Some(segment), None) => PointRequest::Segment(segment),
            (None, Some(time)) => PointRequest::Time(time),
            (Some(segment), Some(time)) => PointRequest::Both { segment, time },
        })
    }
}

/// A fully resolved point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub segment: usize,
    pub time: usize,
    pub variable: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    segment: usize,
    time: usize,
    value: f32,
}

/// Strictly greater replaces, so the first of equal maxima is kept. NaN never wins.
fn consider(best: &mut Option<Candidate>, cand: Candidate) {
    if cand.value.is_nan() {
        return;
    }
    match *best {
        Some(b) if cand.value <= b.value => {}
        _ => *best = Some(cand),
    }
}

/// Best active cell at time `t`, scanning the grid in row-major order.
fn scan_time(
    store: &MapStore,
    grid: &GridIndex,
    variable: usize,
    t: usize,
    best: &mut Option<Candidate>,
) -> Result<()> {
    let values = store.at_variable_time(variable, t)?;
    for cell in grid.active_cells() {
        let value = values.try_value(cell.segment)?;
        consider(best, Candidate { segment: cell.segment, time: t, value });
    }
    Ok(())
}

/// Resolves `request` for variable `variable`.
///
/// When both coordinates are open, times are visited in order and cells in row-major order
/// within each time; the first strictly greatest value wins. Inactive cells and NaN values are
/// never selected, but negative values are.
///
/// # Parameters
///
/// - `store`: the map file contents.
/// - `grid`: topology giving the active cells and their segments.
/// - `variable`: 0-based variable index, see [`MapStore::variable_index`].
/// - `request`: the coordinates fixed by the caller. Fixed coordinates are only bounds checked.
///
/// # Example
///
/// ```
/// use ndarray::{Array2, Array3, array};
/// use waq_map::{GridIndex, MapStore, PointRequest, select};
///
/// let grid = GridIndex::from_parts(
///     array![[1, 0], [0, 2]],
///     Array2::zeros((2, 2)),
///     Array2::zeros((2, 2)),
/// ).expect("Failed to create grid");
/// let values = Array3::from_shape_vec((2, 2, 1), vec![1.0, 5.0, 2.0, 6.0]).expect("Failed to shape values");
/// let store = MapStore::new(Default::default(), vec!["A".into()], vec![0.0, 3600.0], values)
///     .expect("Failed to create store");
///
/// let peak = select::resolve(&store, &grid, 0, PointRequest::Time(0)).expect("Failed to resolve");
/// assert_eq!((peak.segment, peak.time), (2, 0));
///
/// let peak = select::resolve(&store, &grid, 0, PointRequest::Segment(1)).expect("Failed to resolve");
/// assert_eq!((peak.segment, peak.time), (1, 1));
/// ```
pub fn resolve(
    store: &MapStore,
    grid: &GridIndex,
    variable: usize,
    request: PointRequest,
) -> Result<Selection> {
    store.check_variable(variable)?;
    let selection = match request {
        PointRequest::Both { segment, time } => {
            store.check_segment(segment)?;
            store.check_time(time)?;
            Selection { segment, time, variable }
        }
        PointRequest::Segment(segment) => {
            let series = store.series(segment, variable)?;
            let time = nan_argmax(series.iter().copied()).ok_or_else(|| {
                WaqError::Selection(format!("segment {segment} has no finite value for variable {variable}"))
            })?;
            Selection { segment, time, variable }
        }
        PointRequest::Time(time) => {
            grid.check_coverage(store.nseg())?;
            let mut best = None;
            scan_time(store, grid, variable, time, &mut best)?;
            let b = best.ok_or_else(|| {
                WaqError::Selection(format!("no active cell has a finite value at time {time}"))
            })?;
            Selection { segment: b.segment, time, variable }
        }
        PointRequest::Unspecified => {
            grid.check_coverage(store.nseg())?;
            let mut best = None;
            for t in 0..store.ntime() {
                scan_time(store, grid, variable, t, &mut best)?;
            }
            let b = best.ok_or_else(|| {
                WaqError::Selection("no active cell has a finite value at any time".to_string())
            })?;
            Selection { segment: b.segment, time: b.time, variable }
        }
    };
    debug!(?request, segment = selection.segment, time = selection.time, "resolved point");
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_indices() {
        assert_eq!(PointRequest::from_indices(None, None).unwrap(), PointRequest::Unspecified);
        assert_eq!(PointRequest::from_indices(Some(3), None).unwrap(), PointRequest::Segment(3));
        assert_eq!(PointRequest::from_indices(None, Some(0)).unwrap(), PointRequest::Time(0));
        assert_eq!(
            PointRequest::from_indices(Some(1), Some(2)).unwrap(),
            PointRequest::Both { segment: 1, time: 2 }
        );
    }

    #[test]
    fn test_negative_is_invalid() {
        assert!(matches!(
            PointRequest::from_indices(Some(-9999), None),
            Err(WaqError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            PointRequest::from_indices(None, Some(-1)),
            Err(WaqError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_consider_keeps_first_tie() {
        let mut best = None;
        consider(&mut best, Candidate { segment: 4, time: 0, value: 2.0 });
        consider(&mut best, Candidate { segment: 1, time: 0, value: 2.0 });
        consider(&mut best, Candidate { segment: 9, time: 1, value: f32::NAN });
        assert_eq!(best.map(|b| b.segment), Some(4));
    }
}
