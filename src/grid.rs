//! Grid topology: the row/column lattice and the map segment behind each cell.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndarray::Array2;
use tracing::{debug, warn};

use crate::error::{MapAxis, Result, WaqError};

/// Largest lattice a topology file may describe.
pub const MAX_CELLS: usize = 1 << 28;

/// Column layout of a topology file.
///
/// Lines that are blank or start with `#` or `*` are skipped in addition to the first
/// `header_lines` lines.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub row_column: usize,
    pub col_column: usize,
    pub segment_column: usize,
    pub x_column: usize,
    pub y_column: usize,
    /// `None` splits on any run of whitespace.
    pub delimiter: Option<char>,
    pub header_lines: usize,
    /// Row and column indices in the file start at 1.
    pub one_based: bool,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            row_column: 0,
            col_column: 1,
            segment_column: 2,
            x_column: 3,
            y_column: 4,
            delimiter: None,
            header_lines: 0,
            one_based: true,
        }
    }
}

/// A cell of the lattice that carries a map segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCell {
    pub row: usize,
    pub column: usize,
    pub segment: usize,
}

/// Maps the rectangular lattice onto 1-based map segments.
///
/// A cell whose id is zero or negative is inactive and has no sample in the map file.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIndex {
    ids: Array2<i64>,
    x: Array2<f64>,
    y: Array2<f64>,
}

impl GridIndex {
    /// Builds an index from arrays of equal shape.
    pub fn from_parts(ids: Array2<i64>, x: Array2<f64>, y: Array2<f64>) -> Result<Self> {
        if ids.dim() != x.dim() || ids.dim() != y.dim() {
            return Err(WaqError::format(
                "grid",
                format!("shape mismatch: ids {:?}, x {:?}, y {:?}", ids.dim(), x.dim(), y.dim()),
            ));
        }
        let mut seen: HashMap<i64, (usize, usize)> = HashMap::new();
        for ((row, col), &id) in ids.indexed_iter() {
            if id <= 0 {
                continue;
            }
            if let Some((r0, c0)) = seen.insert(id, (row, col)) {
                return Err(WaqError::format(
                    "grid",
                    format!("segment {id} is used by cells ({r0}, {c0}) and ({row}, {col})"),
                ));
            }
        }
        Ok(Self { ids, x, y })
    }

    /// Reads a topology file laid out as described by `layout`.
    pub fn load(path: &Path, layout: &GridLayout) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let grid = Self::parse_named(&text, layout, &path.display().to_string())?;
        debug!(path = %path.display(), rows = grid.rows(), cols = grid.cols(),
            active = grid.active_count(), "loaded grid topology");
        Ok(grid)
    }

    pub fn parse(text: &str, layout: &GridLayout) -> Result<Self> {
        Self::parse_named(text, layout, "grid topology")
    }

    fn parse_named(text: &str, layout: &GridLayout, name: &str) -> Result<Self> {
        let needed = [
            layout.row_column,
            layout.col_column,
            layout.segment_column,
            layout.x_column,
            layout.y_column,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1;
        let base: i64 = if layout.one_based { 1 } else { 0 };

        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate().skip(layout.header_lines) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('*') {
                continue;
            }
            let fields: Vec<&str> = match layout.delimiter {
                Some(d) => trimmed.split(d).map(str::trim).collect(),
                None => trimmed.split_whitespace().collect(),
            };
            if fields.len() < needed {
                return Err(WaqError::format(
                    name,
                    format!("line {}: expected at least {needed} fields, found {}", lineno + 1, fields.len()),
                ));
            }
            let int = |col: usize| -> Result<i64> {
                fields[col].parse::<i64>().map_err(|e| {
                    WaqError::format(name, format!("line {}: field {} {:?}: {e}", lineno + 1, col + 1, fields[col]))
                })
            };
            let float = |col: usize| -> Result<f64> {
                fields[col].parse::<f64>().map_err(|e| {
                    WaqError::format(name, format!("line {}: field {} {:?}: {e}", lineno + 1, col + 1, fields[col]))
                })
            };
            let row = int(layout.row_column)? - base;
            let col = int(layout.col_column)? - base;
            if row < 0 || col < 0 {
                return Err(WaqError::format(
                    name,
                    format!("line {}: cell ({row}, {col}) lies before the first row or column", lineno + 1),
                ));
            }
            entries.push((
                lineno + 1,
                row as usize,
                col as usize,
                int(layout.segment_column)?,
                float(layout.x_column)?,
                float(layout.y_column)?,
            ));
        }

        let rows = entries.iter().map(|e| e.1 + 1).max().unwrap_or(0);
        let cols = entries.iter().map(|e| e.2 + 1).max().unwrap_or(0);
        match rows.checked_mul(cols) {
            Some(cells) if cells <= MAX_CELLS => {}
            _ => {
                return Err(WaqError::format(
                    name,
                    format!("lattice of {rows} x {cols} cells exceeds the limit of {MAX_CELLS}"),
                ));
            }
        }
        let mut ids = Array2::<i64>::zeros((rows, cols));
        let mut x = Array2::<f64>::from_elem((rows, cols), f64::NAN);
        let mut y = Array2::<f64>::from_elem((rows, cols), f64::NAN);
        let mut listed = Array2::<bool>::from_elem((rows, cols), false);
        for (lineno, row, col, id, cx, cy) in entries {
            if listed[[row, col]] {
                return Err(WaqError::format(
                    name,
                    format!("line {lineno}: cell ({row}, {col}) is listed twice"),
                ));
            }
            listed[[row, col]] = true;
            ids[[row, col]] = id;
            x[[row, col]] = cx;
            y[[row, col]] = cy;
        }

        Self::from_parts(ids, x, y).map_err(|e| match e {
            WaqError::Format { reason, .. } => WaqError::format(name, reason),
            other => other,
        })
    }

    pub fn rows(&self) -> usize {
        self.ids.nrows()
    }

    pub fn cols(&self) -> usize {
        self.ids.ncols()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.ids.dim()
    }

    /// Raw id of a cell, `None` outside the lattice.
    pub fn segment_id_of(&self, row: usize, col: usize) -> Option<i64> {
        self.ids.get([row, col]).copied()
    }

    /// Lattice coordinates in grid units.
    pub fn coordinates_of(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        Some((*self.x.get([row, col])?, *self.y.get([row, col])?))
    }

    /// Active cells in row-major order.
    pub fn active_cells(&self) -> impl Iterator<Item = ActiveCell> + '_ {
        self.ids.indexed_iter().filter_map(|((row, column), &id)| {
            (id > 0).then_some(ActiveCell { row, column, segment: id as usize })
        })
    }

    pub fn active_count(&self) -> usize {
        self.ids.iter().filter(|&&id| id > 0).count()
    }

    /// Checks that every active cell refers to a segment in `1..=nseg`.
    pub fn check_coverage(&self, nseg: usize) -> Result<()> {
        if let Some(cell) = self.active_cells().find(|c| c.segment > nseg) {
            return Err(WaqError::Index {
                axis: MapAxis::Segment,
                value: cell.segment,
                start: 1,
                end: nseg + 1,
            });
        }
        let uncovered = nseg.saturating_sub(self.active_count());
        if uncovered > 0 {
            warn!(uncovered, nseg, "segments without a grid cell");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_parts_rejects_duplicate_segment() {
        let ids = array![[1, 2], [0, 2]];
        let xy = Array2::<f64>::zeros((2, 2));
        assert!(matches!(
            GridIndex::from_parts(ids, xy.clone(), xy),
            Err(WaqError::Format { .. })
        ));
    }

    #[test]
    fn test_active_cells_row_major() {
        let ids = array![[0, 3], [1, -1]];
        let xy = Array2::<f64>::zeros((2, 2));
        let grid = GridIndex::from_parts(ids, xy.clone(), xy).unwrap();
        let cells: Vec<_> = grid.active_cells().map(|c| (c.row, c.column, c.segment)).collect();
        assert_eq!(cells, vec![(0, 1, 3), (1, 0, 1)]);
    }
}
