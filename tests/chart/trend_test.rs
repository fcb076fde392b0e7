//! Tests for the year-over-year trend chart.

use healthpanel::chart::palette::{PRIMARY, SECONDARY};
use healthpanel::chart::{bar_yoy_trend, GapFill, TrendOptions};
use healthpanel::table::{ColumnSpec, DataType, ResultTable, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn per_year(rows: &[(Option<i64>, i64)]) -> ResultTable {
    ResultTable::new(
        vec![
            ColumnSpec::new("ano", DataType::Int),
            ColumnSpec::new("qtd", DataType::Int),
        ],
        rows.iter()
            .map(|(y, q)| vec![Value::from(*y), Value::Int(*q)])
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_bars_are_coloured_against_the_mean() {
    let table = per_year(&[(Some(2018), 100), (Some(2019), 150), (Some(2020), 120)]);
    let fig = bar_yoy_trend(&table, &TrendOptions::new("ano", "qtd").title("Por ano")).unwrap();
    let v = fig.to_value().unwrap();

    let bars = &v["data"][0];
    assert_eq!(bars["x"], json!([2018.0, 2019.0, 2020.0]));
    assert_eq!(bars["text"], json!(["100", "150", "120"]));
    assert_eq!(bars["marker"]["color"], json!([SECONDARY, PRIMARY, SECONDARY]));

    let names: Vec<_> = v["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Quantidade", "Média (123,3)", "Tendência linear"]);
}

#[test]
fn test_change_annotations_skip_the_first_year() {
    let table = per_year(&[(Some(2018), 100), (Some(2019), 150), (Some(2020), 120)]);
    let fig = bar_yoy_trend(&table, &TrendOptions::new("ano", "qtd")).unwrap();
    let texts: Vec<_> = fig
        .layout
        .annotations
        .iter()
        .map(|a| a.text.as_str())
        .collect();
    assert_eq!(texts, vec!["+50.0%", "-20.0%"]);
}

#[test]
fn test_zero_fill_and_rows_without_year() {
    let table = per_year(&[(Some(2017), 10), (None, 99), (Some(2019), 30)]);
    let fig = bar_yoy_trend(
        &table,
        &TrendOptions::new("ano", "qtd").gap_fill(Some(GapFill::Zero)),
    )
    .unwrap();
    let v = fig.to_value().unwrap();
    assert_eq!(v["data"][0]["x"], json!([2017.0, 2018.0, 2019.0]));
    assert_eq!(v["data"][0]["y"], json!([10.0, 0.0, 30.0]));
}

#[test]
fn test_implausible_year_span_is_not_filled() {
    let table = per_year(&[(Some(0), 1), (Some(2023), 5), (Some(2024), 7)]);
    let fig = bar_yoy_trend(
        &table,
        &TrendOptions::new("ano", "qtd").gap_fill(Some(GapFill::Zero)),
    )
    .unwrap();
    let v = fig.to_value().unwrap();
    assert_eq!(v["data"][0]["x"], json!([0.0, 2023.0, 2024.0]));
    assert_eq!(v["data"][0]["y"], json!([1.0, 5.0, 7.0]));
}

#[test]
fn test_moving_average_overlay_is_optional() {
    let table = per_year(&[(Some(2018), 1), (Some(2019), 2), (Some(2020), 3)]);
    let fig = bar_yoy_trend(&table, &TrendOptions::new("ano", "qtd").moving_average(2)).unwrap();
    let v = fig.to_value().unwrap();
    let ma = v["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "Média móvel (2 períodos)")
        .cloned()
        .unwrap();
    assert_eq!(ma["y"], json!([null, 1.5, 2.5]));
}

#[test]
fn test_no_rows_gives_placeholder() {
    let fig = bar_yoy_trend(&per_year(&[]), &TrendOptions::new("ano", "qtd").title("Vazio")).unwrap();
    assert!(fig.is_placeholder());
    assert_eq!(fig.title(), Some("Vazio"));
}
