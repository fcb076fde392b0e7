//! Tests for the horizontal Pareto chart.

use healthpanel::chart::{pareto_barh, ChartError, ParetoOptions};
use healthpanel::table::{ColumnSpec, DataType, ResultTable, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn regions() -> ResultTable {
    ResultTable::new(
        vec![
            ColumnSpec::new("regiao", DataType::String),
            ColumnSpec::new("total", DataType::Int),
        ],
        vec![
            vec!["Sul".into(), Value::Int(100)],
            vec!["Sudeste".into(), Value::Int(600)],
            vec!["Não identificado".into(), Value::Int(50)],
            vec!["Nordeste".into(), Value::Int(250)],
        ],
    )
    .unwrap()
}

#[test]
fn test_bars_are_ranked_with_count_and_share_labels() {
    let fig = pareto_barh(
        &regions(),
        &ParetoOptions::sum("regiao", "total").title("Certificados por região"),
    )
    .unwrap();
    let v = fig.to_value().unwrap();

    assert_eq!(v["data"][0]["type"], "bar");
    assert_eq!(
        v["data"][0]["y"],
        json!(["Sudeste", "Nordeste", "Sul", "Não identificado"])
    );
    assert_eq!(v["data"][0]["x"], json!([600.0, 250.0, 100.0, 50.0]));
    assert_eq!(v["data"][0]["text"][0], "600 (60.0%)");
    assert_eq!(v["layout"]["title"]["text"], "Certificados por região");
}

#[test]
fn test_cumulative_curve_rides_the_secondary_axis() {
    let fig = pareto_barh(&regions(), &ParetoOptions::sum("regiao", "total")).unwrap();
    let v = fig.to_value().unwrap();

    let curve = &v["data"][1];
    assert_eq!(curve["type"], "scatter");
    assert_eq!(curve["xaxis"], "x2");
    assert_eq!(curve["x"], json!([60.0, 85.0, 95.0, 100.0]));
    assert_eq!(curve["text"], json!(["60.0%", "85.0%", "95.0%", "100.0%"]));
    assert_eq!(v["layout"]["xaxis2"]["range"], json!([0.0, 100.0]));
    assert_eq!(v["layout"]["annotations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_unidentified_category_is_highlighted() {
    let fig = pareto_barh(&regions(), &ParetoOptions::sum("regiao", "total")).unwrap();
    let v = fig.to_value().unwrap();
    let colors = &v["data"][0]["marker"]["color"];
    assert_eq!(colors[0], json!(600.0));
    assert_eq!(colors[3], json!("crimson"));
}

#[test]
fn test_empty_table_gives_placeholder() {
    let empty = ResultTable::empty(vec![
        ColumnSpec::new("regiao", DataType::String),
        ColumnSpec::new("total", DataType::Int),
    ]);
    let fig = pareto_barh(&empty, &ParetoOptions::sum("regiao", "total")).unwrap();
    assert!(fig.is_placeholder());
}

#[test]
fn test_thresholds_are_validated() {
    let err = pareto_barh(
        &regions(),
        &ParetoOptions::sum("regiao", "total").thresholds(90.0, 80.0),
    )
    .unwrap_err();
    assert!(matches!(err, ChartError::InvalidThresholds { .. }));
}

#[test]
fn test_missing_category_column_is_reported() {
    let err = pareto_barh(&regions(), &ParetoOptions::rows("uf")).unwrap_err();
    assert!(err.to_string().contains("column 'uf' not found"));
}
