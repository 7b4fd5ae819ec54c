mod common;

#[cfg(test)]
mod tests {
    use crate::common::{TWO_BY_TWO_GRID, two_by_two_store, write_case};
    use std::path::Path;
    use std::process::{Command, Output};
    use tempfile::tempdir;

    fn waq_extract(dir: &Path, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_waq-extract"));
        for var in [
            "WAQ_DIR", "WAQ_CASE", "WAQ_VARIABLE", "WAQ_SEGMENT", "WAQ_TIME", "WAQ_GRID_FILE",
            "WAQ_GRID_HEADER_LINES", "WAQ_MAP_FILE", "WAQ_CELL_SIZE",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("RUST_LOG", "error").arg("--dir").arg(dir).args(args);
        cmd.output().expect("Failed to run waq-extract")
    }

    fn case_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_peak_case_writes_four_artifacts() {
        let dir = tempdir().unwrap();
        write_case(dir.path(), "s0", TWO_BY_TWO_GRID, &two_by_two_store());

        let out = waq_extract(dir.path(), &["-c", "s0", "-v", "A"]);
        assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

        let case_dir = dir.path().join("s0");
        assert_eq!(
            case_files(&case_dir),
            vec!["his_A_s2.tsv", "map_A_t1.json", "map_A_t1.tif", "taihu.map", "taihu_objfun.txt"]
        );
        assert_eq!(
            std::fs::read_to_string(case_dir.join("taihu_objfun.txt")).unwrap(),
            "4.000000\t6.000000\t2\t1\n"
        );
    }

    #[test]
    fn test_fixed_point_case() {
        let dir = tempdir().unwrap();
        write_case(dir.path(), "s0", TWO_BY_TWO_GRID, &two_by_two_store());

        let out = waq_extract(dir.path(), &["-c", "s0", "-v", "B", "-p", "1", "-t", "0"]);
        assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
        let case_dir = dir.path().join("s0");
        assert!(case_dir.join("his_B_s1.tsv").exists());
        assert!(case_dir.join("map_B_t0.tif").exists());
        assert_eq!(
            std::fs::read_to_string(case_dir.join("taihu_objfun.txt")).unwrap(),
            "5.000000\t4.000000\t1\t0\n"
        );
    }

    #[test]
    fn test_unknown_variable_fails_without_artifacts() {
        let dir = tempdir().unwrap();
        write_case(dir.path(), "s0", TWO_BY_TWO_GRID, &two_by_two_store());

        let out = waq_extract(dir.path(), &["-c", "s0", "-v", "ZZZ"]);
        assert_eq!(out.status.code(), Some(1));
        assert_eq!(case_files(&dir.path().join("s0")), vec!["taihu.map"]);
    }

    #[test]
    fn test_segment_above_nseg_fails_without_artifacts() {
        let dir = tempdir().unwrap();
        write_case(dir.path(), "s0", TWO_BY_TWO_GRID, &two_by_two_store());

        let out = waq_extract(dir.path(), &["-c", "s0", "-v", "A", "-p", "3"]);
        assert_eq!(out.status.code(), Some(1));
        assert_eq!(case_files(&dir.path().join("s0")), vec!["taihu.map"]);

        let out = waq_extract(dir.path(), &["-c", "s0", "-v", "A", "-p", "-1"]);
        assert_eq!(out.status.code(), Some(1));
        assert_eq!(case_files(&dir.path().join("s0")), vec!["taihu.map"]);
    }

    #[test]
    fn test_one_bad_case_fails_the_run() {
        let dir = tempdir().unwrap();
        write_case(dir.path(), "good", TWO_BY_TWO_GRID, &two_by_two_store());
        let bad = dir.path().join("bad");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("taihu.map"), [0u8; 10]).unwrap();

        let out = waq_extract(dir.path(), &["-c", "good,bad", "-v", "A"]);
        assert_eq!(out.status.code(), Some(1));
        assert!(dir.path().join("good").join("taihu_objfun.txt").exists());
        assert_eq!(case_files(&bad), vec!["taihu.map"]);
    }

    #[test]
    fn test_missing_grid_fails() {
        let dir = tempdir().unwrap();
        let out = waq_extract(dir.path(), &["-c", "s0", "-v", "A"]);
        assert_eq!(out.status.code(), Some(1));
    }
}
