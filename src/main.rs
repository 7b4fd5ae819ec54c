//! `waq-extract`: finds the peak of a variable in Delft3D-WAQ map output and writes the time
//! series, the spatial field and the objective record for one or more cases.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use waq_map::export::{ArtifactPaths, Artifacts, ExportOptions};
use waq_map::{GridIndex, GridLayout, MapStore, PointRequest, Summary, extract, select};

#[derive(Parser, Debug)]
#[command(name = "waq-extract", version, about = "Extract the peak time series and spatial field from Delft3D-WAQ map files")]
struct Args {
    /// Base directory holding the grid directory and one directory per case
    #[arg(short, long, env = "WAQ_DIR")]
    dir: PathBuf,

    /// Case directories to process, comma separated or repeated
    #[arg(short, long = "case", env = "WAQ_CASE", value_delimiter = ',', required = true)]
    cases: Vec<String>,

    /// Name of the variable to extract
    #[arg(short, long, env = "WAQ_VARIABLE")]
    variable: String,

    /// Segment id, 1-based; the segment holding the maximum is used when omitted
    #[arg(short = 'p', long, env = "WAQ_SEGMENT", allow_negative_numbers = true)]
    segment: Option<i64>,

    /// Time index; the time of the maximum is used when omitted
    #[arg(short, long, env = "WAQ_TIME", allow_negative_numbers = true)]
    time: Option<i64>,

    /// Topology file, relative to the base directory
    #[arg(long, env = "WAQ_GRID_FILE", default_value = "delcoupl/couplnef.txt")]
    grid_file: PathBuf,

    /// Header lines to skip in the topology file
    #[arg(long, env = "WAQ_GRID_HEADER_LINES", default_value_t = 0)]
    grid_header_lines: usize,

    /// Topology rows and columns start at 0 instead of 1
    #[arg(long)]
    zero_based: bool,

    /// Map file name inside each case directory
    #[arg(long, env = "WAQ_MAP_FILE", default_value = "taihu.map")]
    map_file: String,

    /// Cell size in metres, used for the raster georeference
    #[arg(long, env = "WAQ_CELL_SIZE", default_value_t = 500.0)]
    cell_size: f64,

    /// Lower end of the colour range stored in the JSON map
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    z_min: f64,

    /// Upper end of the colour range stored in the JSON map
    #[arg(long, default_value_t = 3.5, allow_negative_numbers = true)]
    z_max: f64,

    /// Value written to the raster for inactive cells
    #[arg(long, default_value_t = -9999.0, allow_negative_numbers = true)]
    nodata: f32,

    /// Write 0 instead of the nodata value for inactive raster cells
    #[arg(long)]
    zero_inactive: bool,

    /// Replace an existing objective file
    #[arg(long)]
    overwrite: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run_case(args: &Args, grid: &GridIndex, case: &str) -> Result<Summary> {
    let case_dir = args.dir.join(case);
    let map_path = case_dir.join(&args.map_file);
    let store = MapStore::load(&map_path)
        .with_context(|| format!("reading map file {}", map_path.display()))?;
    info!(case, nseg = store.nseg(), nvar = store.nvar(), ntime = store.ntime(), "map file loaded");

    let variable = store.variable_index(&args.variable)?;
    let request = PointRequest::from_indices(args.segment, args.time)?;
    let selection = select::resolve(&store, grid, variable, request)
        .with_context(|| format!("resolving {request:?} for {} in case {case}", args.variable))?;
    let views = extract::build(&store, grid, &selection)?;
    let summary = views.summary;

    let options = ExportOptions {
        z_range: (args.z_min, args.z_max),
        nodata: if args.zero_inactive { 0.0 } else { args.nodata },
        cell_size: (args.cell_size, args.cell_size),
    };
    let artifacts = Artifacts::render(&args.variable, grid, &views, &store.times_in_days(), &options)?;
    let paths = ArtifactPaths::new(&case_dir, &args.variable, &summary);
    artifacts
        .write(&paths, args.overwrite)
        .with_context(|| format!("writing artifacts to {}", case_dir.display()))?;

    Ok(summary)
}

fn load_grid(args: &Args) -> Result<GridIndex> {
    let layout = GridLayout {
        header_lines: args.grid_header_lines,
        one_based: !args.zero_based,
        ..GridLayout::default()
    };
    let path = args.dir.join(&args.grid_file);
    GridIndex::load(&path, &layout)
        .with_context(|| format!("reading grid topology {}", path.display()))
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let grid = match load_grid(&args) {
        Ok(grid) => grid,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let results: Vec<(&String, Result<Summary>)> = args
        .cases
        .par_iter()
        .map(|case| (case, run_case(&args, &grid, case)))
        .collect();

    let mut failed = 0;
    for (case, result) in results {
        match result {
            Ok(s) => info!(
                case = %case,
                segment = s.segment,
                time = s.time,
                mean = s.mean_of_field,
                max = s.max_of_series,
                "case done"
            ),
            Err(e) => {
                failed += 1;
                error!(case = %case, "{e:#}");
            }
        }
    }

    if failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
