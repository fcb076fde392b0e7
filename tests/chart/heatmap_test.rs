//! Tests for the residents-by-stage heatmap.

use healthpanel::chart::heatmap::TOTAL_LABEL;
use healthpanel::chart::{heatmap_absolute, heatmap_matrix, HeatmapOptions, PercentOf, Totals};
use healthpanel::table::{ColumnSpec, DataType, ResultTable, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn stages(rows: &[(&str, i64, i64)]) -> ResultTable {
    ResultTable::new(
        vec![
            ColumnSpec::new("etapa", DataType::String),
            ColumnSpec::new("ano", DataType::Int),
            ColumnSpec::new("qtd", DataType::Int),
        ],
        rows.iter()
            .map(|(e, a, q)| vec![Value::from(*e), Value::Int(*a), Value::Int(*q)])
            .collect(),
    )
    .unwrap()
}

fn sample() -> ResultTable {
    stages(&[("R2", 2019, 10), ("R1", 2019, 30), ("R1", 2020, 20)])
}

#[test]
fn test_column_percentages_with_total_row() {
    let opts = HeatmapOptions::new("etapa", "ano", "qtd")
        .percent_of(PercentOf::Col)
        .totals(Totals::Col);
    let m = heatmap_matrix(&sample(), &opts).unwrap();

    assert_eq!(m.rows, vec!["R1", "R2", TOTAL_LABEL]);
    assert_eq!(m.cols, vec!["2019", "2020"]);
    assert_eq!(m.values, vec![vec![30.0, 20.0], vec![10.0, 0.0], vec![40.0, 20.0]]);
    assert_eq!(m.pct_at("R1", "2019"), Some(75.0));
    assert_eq!(m.pct_at("R2", "2019"), Some(25.0));
    assert_eq!(m.pct_at(TOTAL_LABEL, "2020"), Some(100.0));
}

#[test]
fn test_both_totals_share_the_grand_total_corner() {
    let opts = HeatmapOptions::new("etapa", "ano", "qtd")
        .percent_of(PercentOf::Total)
        .totals(Totals::Both);
    let m = heatmap_matrix(&sample(), &opts).unwrap();

    assert_eq!(m.cols.last().map(String::as_str), Some(TOTAL_LABEL));
    assert_eq!(m.get(TOTAL_LABEL, TOTAL_LABEL), Some(60.0));
    assert_eq!(m.pct_at(TOTAL_LABEL, TOTAL_LABEL), Some(100.0));
    assert_eq!(m.get("R1", TOTAL_LABEL), Some(50.0));
}

#[test]
fn test_numeric_keys_sort_numerically() {
    let table = stages(&[("R1", 10, 1), ("R1", 9, 1), ("R1", 100, 1)]);
    let m = heatmap_matrix(&table, &HeatmapOptions::new("etapa", "ano", "qtd")).unwrap();
    assert_eq!(m.cols, vec!["9", "10", "100"]);
}

#[test]
fn test_zero_cells_render_blank() {
    let opts = HeatmapOptions::new("etapa", "ano", "qtd").percent_of(PercentOf::Col);
    let fig = heatmap_absolute(&sample(), &opts).unwrap();
    let v = fig.to_value().unwrap();

    let trace = &v["data"][0];
    assert_eq!(trace["type"], "heatmap");
    assert_eq!(trace["z"], json!([[30.0, 20.0], [10.0, null]]));
    assert_eq!(trace["text"][0][0], "30<br>(75.0%)");
    assert_eq!(trace["text"][1][1], "");
}

#[test]
fn test_percentages_can_be_turned_off() {
    let opts = HeatmapOptions::new("etapa", "ano", "qtd")
        .percent_of(PercentOf::None)
        .zero_as_blank(false);
    let fig = heatmap_absolute(&sample(), &opts).unwrap();
    let v = fig.to_value().unwrap();
    assert_eq!(v["data"][0]["text"][1], json!(["10", "0"]));
}

#[test]
fn test_empty_table_gives_placeholder() {
    let fig = heatmap_absolute(&stages(&[]), &HeatmapOptions::new("etapa", "ano", "qtd")).unwrap();
    assert!(fig.is_placeholder());
}

#[test]
fn test_row_percentages_sum_to_100_and_zero_rows_are_blank() {
    let table = stages(&[("R1", 2019, 30), ("R1", 2020, 10), ("R2", 2019, 0)]);
    let opts = HeatmapOptions::new("etapa", "ano", "qtd")
        .percent_of(PercentOf::Row)
        .totals(Totals::Both);
    let m = heatmap_matrix(&table, &opts).unwrap();

    assert_eq!(m.rows, vec!["R1", "R2", TOTAL_LABEL]);
    assert_eq!(m.cols, vec!["2019", "2020", TOTAL_LABEL]);
    assert_eq!(m.pct[0], vec![Some(75.0), Some(25.0), Some(100.0)]);
    assert_eq!(m.pct[1], vec![None, None, None]);

    let data_cells: f64 = m.pct[0][..2].iter().flatten().sum();
    assert!((data_cells - 100.0).abs() < 1e-9);
    assert_eq!(m.pct_at(TOTAL_LABEL, TOTAL_LABEL), Some(100.0));
}
