//! Domain-specific assertion helpers for benchres harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear which output file broke which expectation.

use std::path::Path;

/// Header and data rows of a CSV file.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path)
        .unwrap_or_else(|err| panic!("cannot open {}: {err}", path.display()));
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

/// Names of the `*.csv` files in `dir`, sorted.
pub fn csv_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".csv"))
        .collect();
    names.sort();
    names
}

/// Assert that a CSV file has exactly the given header.
///
/// ```rust
/// assert_csv_header!(path, ["run_group", "engine", …]);
/// ```
#[macro_export]
macro_rules! assert_csv_header {
    ($path:expr, $expected:expr) => {{
        let path: &std::path::Path = $path.as_ref();
        let (header, _) = $crate::common::read_csv(path);
        let expected: Vec<String> = $expected.iter().map(|c| c.to_string()).collect();
        pretty_assertions::assert_eq!(
            header,
            expected,
            "assert_csv_header! failed for {}",
            path.display()
        );
    }};
}

/// Assert that every data row of a CSV file has the same value in `column`.
///
/// ```rust
/// assert_column_constant!(path, "engine");
/// ```
#[macro_export]
macro_rules! assert_column_constant {
    ($path:expr, $column:expr) => {{
        let path: &std::path::Path = $path.as_ref();
        let column: &str = $column;
        let (header, rows) = $crate::common::read_csv(path);
        let idx = header.iter().position(|h| h == column).unwrap_or_else(|| {
            panic!(
                "assert_column_constant! failed: {} has no column {:?}.\n  Header: {:?}",
                path.display(),
                column,
                header
            )
        });
        let mut values: Vec<&str> = rows.iter().map(|r| r[idx].as_str()).collect();
        values.dedup();
        if values.len() > 1 {
            panic!(
                "assert_column_constant! failed: column {:?} of {} takes values {:?}",
                column,
                path.display(),
                values
            );
        }
    }};
}
