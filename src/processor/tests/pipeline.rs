//! End-to-end pipeline tests over the in-memory store

use super::{TestTree, csv_rows, event, events};
use crate::models::OutputMode;
use polars::prelude::{ParquetReader, SerReader};
use std::fs;

const ANGLES: &[(&str, &str)] = &[("I", "Seconds"), ("F", "Theta"), ("F", "Phi")];

#[test]
fn test_single_day_single_file_csv() {
    let mut tree = TestTree::new();
    tree.add_file(
        "ALPHA",
        "2020-01-01",
        "ALPHA_run001_dst.parquet",
        events(100, 5),
        Some(1000.0),
    );

    let request = tree.request(OutputMode::Csv, "ALPHA", "2020-01-01", "2020-01-01", "(1)", ANGLES);
    let stats = tree.run(request).unwrap();

    assert_eq!(stats.days_scanned, 1);
    assert_eq!(stats.files_found, 1);
    assert_eq!(stats.files_visited, 1);
    assert_eq!(stats.rows_written, 5);
    assert!(stats.output_path.is_absolute());
    assert_eq!(
        stats.output_path,
        tree.config.output_dir.join("ALPHAfrom2020-01-01to2020-01-01.csv")
    );

    let text = fs::read_to_string(&stats.output_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "Seconds,Theta,Phi");
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), 3);
        assert!(!line.ends_with(','));
    }
    // acos(0.8) = 36.869898 deg, atan2(0, 0.6) = 0
    assert_eq!(lines[1], "100,36.869898,0.000000");
    assert_eq!(lines[5], "104,36.869898,0.000000");
}

#[test]
fn test_days_and_files_in_order() {
    let mut tree = TestTree::new();
    tree.add_file("ALPHA", "2020-01-02", "ALPHA_b_dst.parquet", events(30, 1), Some(1.0));
    tree.add_file("ALPHA", "2020-01-02", "ALPHA_a_dst.parquet", events(20, 1), Some(1.0));
    tree.add_file("ALPHA", "2020-01-01", "ALPHA_z_dst.parquet", events(10, 1), Some(1.0));
    tree.add_file("ALPHA", "2020-01-05", "ALPHA_a_dst.parquet", events(50, 1), Some(1.0));
    // Outside the range and other stations
    tree.add_file("ALPHA", "2020-01-06", "ALPHA_a_dst.parquet", events(60, 1), Some(1.0));
    tree.add_file("ALPHA", "2020-01-01", "BETA_a_dst.parquet", events(70, 1), Some(1.0));

    let request = tree.request(
        OutputMode::Csv,
        "ALPHA",
        "2020-01-01",
        "2020-01-05",
        "",
        &[("I", "Seconds")],
    );
    let stats = tree.run(request).unwrap();

    assert_eq!(stats.days_scanned, 3);
    assert_eq!(stats.files_found, 4);
    let seconds: Vec<String> = csv_rows(&stats.output_path)
        .into_iter()
        .map(|row| row[0].clone())
        .collect();
    assert_eq!(seconds, vec!["10", "20", "30", "50"]);
}

#[test]
fn test_filter_and_base_filter() {
    let mut tree = TestTree::new();
    let rows = vec![
        event(1, 0, 1.0),  // theta 0
        event(2, 0, 0.5),  // theta 60
        event(3, 4, 1.0),  // bad status
        event(4, 0, 0.95), // theta ~18
    ];
    tree.add_file("ALPHA", "2020-03-01", "ALPHA_dst.parquet", rows, Some(1.0));

    let request = tree.request(
        OutputMode::Csv,
        "ALPHA",
        "2020-03-01",
        "2020-03-01",
        "Theta < 30",
        &[("I", "Seconds"), ("F", "Energy")],
    );
    let stats = tree.run(request).unwrap();
    let rows = csv_rows(&stats.output_path);
    assert_eq!(rows, vec![vec!["1", "1.500000"], vec!["4", "6.000000"]]);

    // Without the base filter the bad-status event passes too
    let config = tree.config.clone().with_base_filter("");
    let mut request = tree.request(
        OutputMode::Csv,
        "ALPHA",
        "2020-03-01",
        "2020-03-01",
        "",
        &[("I", "Seconds")],
    );
    request.filter = crate::filter::FilterExpr::for_run("Theta < 30", "").unwrap();
    let stats = tree.run_with(request, config).unwrap();
    assert_eq!(stats.rows_written, 3);
}

#[test]
fn test_integer_columns_truncate() {
    let mut tree = TestTree::new();
    tree.add_file(
        "ALPHA",
        "2020-01-01",
        "ALPHA_dst.parquet",
        events(7, 2),
        Some(1013.5),
    );

    // Energy = 10.5 and 12.0; Pressure as float, Energy as truncated integer
    let request = tree.request(
        OutputMode::Csv,
        "ALPHA",
        "2020-01-01",
        "2020-01-01",
        "",
        &[("F", "Pressure"), ("I", "Energy")],
    );
    let stats = tree.run(request).unwrap();
    assert_eq!(
        csv_rows(&stats.output_path),
        vec![vec!["1013.500000", "10"], vec!["1013.500000", "12"]]
    );
}

#[test]
fn test_columnar_output() {
    let mut tree = TestTree::new();
    tree.add_file(
        "ALPHA",
        "2020-01-01",
        "ALPHA_run001_dst.parquet",
        events(100, 3),
        Some(990.0),
    );
    tree.add_file(
        "ALPHA",
        "2020-01-02",
        "ALPHA_run001_dst.parquet",
        events(200, 2),
        Some(995.0),
    );

    let request = tree.request(
        OutputMode::Root,
        "ALPHA",
        "2020-01-01",
        "2020-01-02",
        "",
        &[("I", "Seconds"), ("F", "Pressure"), ("F", "Theta")],
    );
    let stats = tree.run(request).unwrap();
    assert_eq!(
        stats.output_path,
        tree.config.output_dir.join("ALPHAfrom2020-01-01to2020-01-02.parquet")
    );

    let df = ParquetReader::new(fs::File::open(&stats.output_path).unwrap())
        .finish()
        .unwrap();
    assert_eq!(df.height(), 5);
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(names, vec!["Seconds", "Pressure", "Theta"]);

    let pressure: Vec<Option<f64>> = df
        .column("Pressure")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(
        pressure,
        vec![Some(990.0), Some(990.0), Some(990.0), Some(995.0), Some(995.0)]
    );
}

#[test]
fn test_simulation_tree() {
    let mut tree = TestTree::new();
    tree.add_simulated_file("ALPHA", "MONT-01_sim_dst.parquet", events(1, 2));
    tree.add_simulated_file("ALPHA", "ALPHA_sim_dst.parquet", events(50, 9));

    let mut request = tree.request(
        OutputMode::Csv,
        "ALPHA",
        "2017-10-01",
        "2017-10-01",
        "",
        &[("I", "Seconds"), ("F", "Pressure")],
    );
    request.is_simulation = true;
    let stats = tree.run(request).unwrap();

    assert_eq!(stats.files_found, 1);
    assert_eq!(
        csv_rows(&stats.output_path),
        vec![vec!["1", "950.000000"], vec!["2", "950.000000"]]
    );
}
