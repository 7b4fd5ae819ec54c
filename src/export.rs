//! Writing extracted views to files.
//!
//! Each artifact has an `encode_*` function that renders it in memory and a `write_*` function
//! that puts it on disk. [`Artifacts::render`] encodes everything for a case up front, so a
//! failure while encoding leaves nothing on disk.
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;
use tracing::{debug, info};

use crate::error::Result;
use crate::extract::{ExtractedViews, Summary};
use crate::grid::GridIndex;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GDAL_NODATA: u16 = 42113;

/// Points of the spatial field, as consumed by the web map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapJson {
    pub legend: String,
    pub iseg: usize,
    pub itime: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f32>,
    pub z_min: f64,
    pub z_max: f64,
}

impl MapJson {
    /// Collects the active cells in row-major order, with their raw lattice coordinates.
    pub fn new(legend: &str, grid: &GridIndex, views: &ExtractedViews, z_range: (f64, f64)) -> Self {
        let mut doc = MapJson {
            legend: legend.to_string(),
            iseg: views.summary.segment,
            itime: views.summary.time,
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            z_min: z_range.0,
            z_max: z_range.1,
        };
        for cell in grid.active_cells() {
            let (x, y) = grid.coordinates_of(cell.row, cell.column).unwrap_or((f64::NAN, f64::NAN));
            doc.x.push(x);
            doc.y.push(y);
            doc.z.push(views.field[[cell.row, cell.column]]);
        }
        doc
    }
}

/// Renders `doc` as JSON indented by four spaces.
pub fn encode_map_json(doc: &MapJson) -> Result<Vec<u8>> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(Vec::new(), formatter);
    doc.serialize(&mut ser)?;
    Ok(ser.into_inner())
}

pub fn write_map_json(path: &Path, doc: &MapJson) -> Result<()> {
    std::fs::write(path, encode_map_json(doc)?)?;
    debug!(path = %path.display(), points = doc.z.len(), "wrote map json");
    Ok(())
}

/// `mean<TAB>max<TAB>segment<TAB>time`, six decimals for the objectives.
pub fn objective_record(summary: &Summary) -> String {
    format!(
        "{:.6}\t{:.6}\t{}\t{}\n",
        summary.mean_of_field, summary.max_of_series, summary.segment, summary.time
    )
}

/// Writes the objective record. An existing file is kept unless `overwrite` is set.
///
/// Returns whether the file was written.
pub fn write_objective(path: &Path, summary: &Summary, overwrite: bool) -> Result<bool> {
    write_record(path, &objective_record(summary), overwrite)
}

fn write_record(path: &Path, record: &str, overwrite: bool) -> Result<bool> {
    if path.exists() && !overwrite {
        info!(path = %path.display(), "objective file exists, leaving it");
        return Ok(false);
    }
    std::fs::write(path, record)?;
    Ok(true)
}

/// Placement of the field raster in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Georeference {
    /// Model units per pixel along x and y.
    pub cell_size: (f64, f64),
    /// GeoTIFF tie point `[i, j, k, x, y, z]`: raster pixel `(i, j)` sits at model `(x, y)`.
    pub tie_point: [f64; 6],
}

impl Georeference {
    /// Ties the pixel of the first active cell (row-major) with finite coordinates to those
    /// coordinates scaled by `cell_size`.
    ///
    /// Lattice coordinates are in grid units, one unit per cell. When no active cell has finite
    /// coordinates, pixel (0, 0) is tied to model (0, 0).
    pub fn from_grid(grid: &GridIndex, cell_size: (f64, f64)) -> Self {
        let tie_point = grid
            .active_cells()
            .find_map(|cell| {
                let (x, y) = grid.coordinates_of(cell.row, cell.column)?;
                (x.is_finite() && y.is_finite()).then_some([
                    cell.column as f64,
                    cell.row as f64,
                    0.0,
                    x * cell_size.0,
                    y * cell_size.1,
                    0.0,
                ])
            })
            .unwrap_or([0.0; 6]);
        Self { cell_size, tie_point }
    }
}

/// Renders `field` as a single band `f32` GeoTIFF.
///
/// NaN cells are written as `nodata`. Row 0 of the field is the first raster row.
///
/// # Parameters
///
/// - `field`: `(rows, cols)` values as produced by [`extract::build`](crate::extract::build)
/// - `nodata`: value stored for NaN cells and in the GDAL nodata tag
/// - `georef`: pixel scale and tie point written to the GeoTIFF tags
pub fn encode_field_raster(field: &Array2<f32>, nodata: f32, georef: &Georeference) -> Result<Vec<u8>> {
    let (rows, cols) = field.dim();
    let data: Vec<f32> = field.iter().map(|&v| if v.is_nan() { nodata } else { v }).collect();

    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out)?;
        let mut image = encoder.new_image::<colortype::Gray32Float>(cols as u32, rows as u32)?;
        image
            .encoder()
            .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &[georef.cell_size.0, georef.cell_size.1, 0.0][..])?;
        image.encoder().write_tag(Tag::Unknown(MODEL_TIEPOINT), &georef.tie_point[..])?;
        image.encoder().write_tag(Tag::Unknown(GDAL_NODATA), nodata.to_string().as_str())?;
        image.write_data(&data)?;
    }
    Ok(out.into_inner())
}

/// Writes `field` as a single band `f32` GeoTIFF.
///
/// # Parameters
///
/// - `path`: file to create or replace
/// - `field`: `(rows, cols)` values, NaN for inactive cells
/// - `nodata`: value written in place of NaN
/// - `georef`: pixel scale and tie point, usually [`Georeference::from_grid`]
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use waq_map::export::{self, Georeference};
/// use waq_map::{GridIndex, GridLayout, MapStore, PointRequest, extract, select};
///
/// let grid = GridIndex::load(Path::new("delcoupl/couplnef.txt"), &GridLayout::default())?;
/// let store = MapStore::load(Path::new("s00000000/taihu.map"))?;
/// let variable = store.variable_index("Chlfa")?;
/// let selection = select::resolve(&store, &grid, variable, PointRequest::Unspecified)?;
/// let views = extract::build(&store, &grid, &selection)?;
///
/// let georef = Georeference::from_grid(&grid, (500.0, 500.0));
/// export::write_field_raster(Path::new("field.tif"), &views.field, -9999.0, &georef)?;
/// # Ok::<(), waq_map::WaqError>(())
/// ```
pub fn write_field_raster(path: &Path, field: &Array2<f32>, nodata: f32, georef: &Georeference) -> Result<()> {
    std::fs::write(path, encode_field_raster(field, nodata, georef)?)?;
    debug!(path = %path.display(), rows = field.nrows(), cols = field.ncols(), "wrote field raster");
    Ok(())
}

/// Renders the time series as `day<TAB>value` lines under a header.
pub fn encode_series_table(days: &[f64], series: &[f32]) -> Result<Vec<u8>> {
    let mut w = Vec::new();
    writeln!(w, "day\tvalue")?;
    for (d, v) in days.iter().zip(series) {
        writeln!(w, "{d}\t{v}")?;
    }
    Ok(w)
}

pub fn write_series_table(path: &Path, days: &[f64], series: &[f32]) -> Result<()> {
    std::fs::write(path, encode_series_table(days, series)?)?;
    Ok(())
}

/// Output locations of one case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub series: PathBuf,
    pub map_json: PathBuf,
    pub raster: PathBuf,
    pub objective: PathBuf,
}

impl ArtifactPaths {
    pub fn new(case_dir: &Path, variable: &str, summary: &Summary) -> Self {
        Self {
            series: case_dir.join(format!("his_{variable}_s{}.tsv", summary.segment)),
            map_json: case_dir.join(format!("map_{variable}_t{}.json", summary.time)),
            raster: case_dir.join(format!("map_{variable}_t{}.tif", summary.time)),
            objective: case_dir.join("taihu_objfun.txt"),
        }
    }
}

/// Rendering settings shared by all cases of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub z_range: (f64, f64),
    pub nodata: f32,
    pub cell_size: (f64, f64),
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { z_range: (0.0, 3.5), nodata: -9999.0, cell_size: (500.0, 500.0) }
    }
}

/// The four encoded artifacts of one case.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub series: Vec<u8>,
    pub map_json: Vec<u8>,
    pub raster: Vec<u8>,
    pub objective: String,
}

impl Artifacts {
    /// Encodes every artifact without touching the filesystem.
    pub fn render(
        variable: &str,
        grid: &GridIndex,
        views: &ExtractedViews,
        days: &[f64],
        options: &ExportOptions,
    ) -> Result<Self> {
        let doc = MapJson::new(variable, grid, views, options.z_range);
        let georef = Georeference::from_grid(grid, options.cell_size);
        Ok(Self {
            series: encode_series_table(days, &views.series.to_vec())?,
            map_json: encode_map_json(&doc)?,
            raster: encode_field_raster(&views.field, options.nodata, &georef)?,
            objective: objective_record(&views.summary),
        })
    }

    /// Writes the encoded artifacts. The objective file follows [`write_objective`].
    ///
    /// Returns whether the objective file was written.
    pub fn write(&self, paths: &ArtifactPaths, overwrite: bool) -> Result<bool> {
        std::fs::write(&paths.series, &self.series)?;
        std::fs::write(&paths.map_json, &self.map_json)?;
        std::fs::write(&paths.raster, &self.raster)?;
        let wrote = write_record(&paths.objective, &self.objective, overwrite)?;
        debug!(dir = %paths.series.parent().unwrap_or(Path::new(".")).display(), "wrote artifacts");
        Ok(wrote)
    }
}
