//! # waq-map
//!
//! `waq-map` reads the map output of a Delft3D-WAQ water quality run (the grid topology and the
//! binary segment/variable/time map file), finds the point where a variable peaks, and extracts
//! the time series at that segment and the spatial field at that time.
//!
//! ## Example
//!
//! ```
//! use ndarray::{Array2, Array3, array};
//! use waq_map::{GridIndex, MapStore, PointRequest, extract, select};
//!
//! // two active cells on a 2x2 lattice
//! let grid = GridIndex::from_parts(
//!     array![[1, 0], [0, 2]],
//!     Array2::zeros((2, 2)),
//!     Array2::zeros((2, 2)),
//! ).expect("Failed to create grid");
//!
//! // values indexed [time, segment - 1, variable]
//! let values = Array3::from_shape_vec((2, 2, 1), vec![1.0, 5.0, 2.0, 6.0]).expect("Failed to shape values");
//! let title = ["run".to_string(), String::new(), String::new(), String::new()];
//! let store = MapStore::new(title, vec!["A".into()], vec![0.0, 3600.0], values).expect("Failed to create store");
//!
//! let selection = select::resolve(&store, &grid, 0, PointRequest::Unspecified).unwrap();
//! assert_eq!((selection.segment, selection.time), (2, 1));
//!
//! let views = extract::build(&store, &grid, &selection).unwrap();
//! assert_eq!(views.summary.mean_of_field, 4.0);
//! ```
pub mod error;
pub mod export;
pub mod extract;
pub mod grid;
pub mod map;
pub mod reduce;
pub mod select;

pub use error::{MapAxis, Result, WaqError};
pub use extract::{ExtractedViews, Summary};
pub use grid::{ActiveCell, GridIndex, GridLayout};
pub use map::{BySegment, MapStore, seconds_to_days};
pub use select::{PointRequest, Selection};
