mod common;

use common::{batch, standard_engine};
use std::fs;
use vfm_engine::application::vfm::BatchSummary;
use vfm_engine::domain::table::ColumnData;
use vfm_engine::domain::valuation::VfmWeights;
use vfm_engine::infrastructure::{read_table, write_table};

#[test]
fn test_report_written_and_read_back() {
    let dir = std::env::temp_dir().join(format!("vfm_csv_io_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let input = dir.join("units.csv");
    let output = dir.join("units_vfm.csv");

    write_table(&input, &batch(&[Some(1000.0), None], &[75.0, 20.0])).unwrap();
    let table = read_table(&input, &["grid_id"]).unwrap();
    assert_eq!(
        table.column("grid_id").unwrap().data,
        ColumnData::Text(vec!["02028".to_string(), "02029".to_string()])
    );
    assert_eq!(
        table.column("total_deposit_median").unwrap().data,
        ColumnData::Numeric(vec![Some(1000.0), None])
    );

    let engine = standard_engine(true, VfmWeights::default());
    let report = engine.calculate_vfm(&table, 12).unwrap();
    write_table(&output, &report.table).unwrap();

    let written = read_table(&output, &["grid_id"]).unwrap();
    assert_eq!(written.column_names(), report.table.column_names());
    let vfm = written.numeric_values("vfm_index", f64::NAN).unwrap().values;
    assert!((vfm[0] - 0.898).abs() < 1e-6);

    let summary = BatchSummary::from_report(&report, "grid_id").unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.unique_units, Some(2));

    let _ = fs::remove_dir_all(&dir);
}
