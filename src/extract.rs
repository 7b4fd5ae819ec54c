//! The two views exported for a resolved point and their summary.
use ndarray::{Array1, Array2};

use crate::error::{Result, WaqError};
use crate::grid::GridIndex;
use crate::map::MapStore;
use crate::reduce::{nan_max, nan_mean};
use crate::select::Selection;

/// Objective values of one extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Mean of the finite field values.
    pub mean_of_field: f64,
    /// Maximum of the finite series values.
    pub max_of_series: f64,
    pub segment: usize,
    pub time: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedViews {
    /// The selected variable at the selected segment, one value per time.
    pub series: Array1<f32>,
    /// The selected variable at the selected time laid out on the grid, NaN where inactive.
    pub field: Array2<f32>,
    pub summary: Summary,
}

impl ExtractedViews {
    /// Copy of `field` with NaN cells replaced by `fill`.
    pub fn field_filled(&self, fill: f32) -> Array2<f32> {
        self.field.mapv(|v| if v.is_nan() { fill } else { v })
    }
}

/// Extracts the time series at `selection.segment` and the field at `selection.time`.
///
/// The field has the grid's `(rows, cols)` shape with NaN in inactive cells. The summary holds the
/// NaN-skipping mean of the field and maximum of the series, and fails with
/// [`WaqError::EmptyReduction`](crate::WaqError::EmptyReduction) when either has no finite value.
///
/// # Parameters
///
/// - `store`: the map file contents.
/// - `grid`: topology used to lay the field out. Every active segment must exist in `store`.
/// - `selection`: a point from [`select::resolve`](crate::select::resolve).
///
/// # Example
///
/// ```
/// use ndarray::{Array2, Array3, array};
/// use waq_map::{GridIndex, MapStore, Selection, extract};
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
/// let views = extract::build(&store, &grid, &Selection { segment: 1, time: 0, variable: 0 })
///     .expect("Failed to extract");
/// assert_eq!(views.series, array![1.0, 2.0]);
/// assert_eq!(views.field_filled(0.0), array![[1.0, 0.0], [0.0, 5.0]]);
/// assert_eq!(views.summary.mean_of_field, 3.0);
/// assert_eq!(views.summary.max_of_series, 2.0);
/// ```
pub fn build(store: &MapStore, grid: &GridIndex, selection: &Selection) -> Result<ExtractedViews> {
    store.check_variable(selection.variable)?;
    let series = store.at_segment(selection.segment)?.row(selection.variable).to_owned();

    let values = store.at_variable_time(selection.variable, selection.time)?;
    let mut field = Array2::<f32>::from_elem(grid.dimensions(), f32::NAN);
    for cell in grid.active_cells() {
        field[[cell.row, cell.column]] = values.try_value(cell.segment)?;
    }

    let mean_of_field = nan_mean(field.iter().copied()).ok_or(WaqError::EmptyReduction("field"))?;
    let max_of_series = nan_max(series.iter().copied()).ok_or(WaqError::EmptyReduction("series"))? as f64;

    Ok(ExtractedViews {
        series,
        field,
        summary: Summary {
            mean_of_field,
            max_of_series,
            segment: selection.segment,
            time: selection.time,
        },
    })
}
