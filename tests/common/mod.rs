#![allow(dead_code)]
use std::path::{Path, PathBuf};

use ndarray::Array3;
use waq_map::{GridIndex, GridLayout, MapStore};

pub fn title() -> [String; 4] {
    ["test run".to_string(), "taihu".to_string(), String::new(), String::new()]
}

/// Two segments, variables A and B, two times one hour apart.
///
/// seg1: A = [1, 2], B = [3, 4]; seg2: A = [5, 6], B = [7, 8].
pub fn two_by_two_store() -> MapStore {
    let values = Array3::from_shape_vec(
        (2, 2, 2),
        vec![
            1.0, 3.0, 5.0, 7.0,
            2.0, 4.0, 6.0, 8.0,
        ],
    ).expect("Failed to shape values");
    MapStore::new(title(), vec!["A".into(), "B".into()], vec![0.0, 3600.0], values)
        .expect("Failed to create store")
}

/// 2x2 lattice, (0,0) -> segment 1 and (1,1) -> segment 2, 1-based rows and columns.
pub const TWO_BY_TWO_GRID: &str = "\
# row col seg x y
1 1 1 0.0 0.0
2 2 2 1.0 1.0
";

pub fn two_by_two_grid() -> GridIndex {
    GridIndex::parse(TWO_BY_TWO_GRID, &GridLayout::default()).expect("Failed to parse grid")
}

/// Lays out `<dir>/delcoupl/couplnef.txt` and `<dir>/<case>/taihu.map`.
pub fn write_case(dir: &Path, case: &str, grid: &str, store: &MapStore) -> (PathBuf, PathBuf) {
    let grid_path = dir.join("delcoupl").join("couplnef.txt");
    std::fs::create_dir_all(grid_path.parent().unwrap()).unwrap();
    std::fs::write(&grid_path, grid).unwrap();
    let map_path = dir.join(case).join("taihu.map");
    std::fs::create_dir_all(map_path.parent().unwrap()).unwrap();
    store.save(&map_path).unwrap();
    (grid_path, map_path)
}
