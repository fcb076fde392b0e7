//! Tests for the pie, top-N bar and entries/exits builders.

use healthpanel::chart::palette;
use healthpanel::chart::pie::OTHERS_LABEL;
use healthpanel::chart::{
    bar_total_by_group, entries_exits_by_year, pie_standard, ChartError, FlowOptions,
    GroupBarOptions, PieOptions,
};
use healthpanel::table::{ColumnSpec, DataType, ResultTable, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

fn counts(key: &str, rows: &[(&str, i64)]) -> ResultTable {
    ResultTable::new(
        vec![
            ColumnSpec::new(key, DataType::String),
            ColumnSpec::new("qtd", DataType::Int),
        ],
        rows.iter()
            .map(|(k, q)| vec![Value::from(*k), Value::Int(*q)])
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_sex_pie_folds_small_slices_and_maps_colours() {
    let table = counts(
        "sexo",
        &[
            ("feminino", 35),
            ("masculino", 60),
            ("(não informado)", 5),
            ("outro", 0),
        ],
    );
    let opts = PieOptions::new("sexo", "qtd")
        .top_n(2)
        .color_map(palette::SEX.iter().copied());
    let fig = pie_standard(&table, &opts).unwrap();
    let v = fig.to_value().unwrap();

    let pie = &v["data"][0];
    assert_eq!(pie["type"], "pie");
    assert_eq!(pie["labels"], json!(["masculino", "feminino", OTHERS_LABEL]));
    assert_eq!(pie["values"], json!([60.0, 35.0, 5.0]));
    assert_eq!(
        pie["marker"]["colors"],
        json!(["#60A5FA", "#F87171", palette::OTHERS])
    );
    assert_eq!(pie["hole"], json!(0.45));
}

#[test]
fn test_pie_rejects_full_hole() {
    let table = counts("sexo", &[("feminino", 1)]);
    let err = pie_standard(&table, &PieOptions::new("sexo", "qtd").hole(1.0)).unwrap_err();
    assert!(matches!(err, ChartError::InvalidOption(_)));
}

#[test]
fn test_pie_with_only_zero_slices_is_placeholder() {
    let table = counts("sexo", &[("feminino", 0)]);
    let fig = pie_standard(&table, &PieOptions::new("sexo", "qtd")).unwrap();
    assert!(fig.is_placeholder());
}

#[test]
fn test_top_bars_share_is_of_the_grand_total() {
    let table = counts(
        "programa",
        &[("Pediatria", 30), ("Clínica Médica", 50), ("Cirurgia Geral", 20)],
    );
    let fig = bar_total_by_group(
        &table,
        &GroupBarOptions::new("programa", "qtd").top_n(2).title("Top programas"),
    )
    .unwrap();
    let v = fig.to_value().unwrap();

    assert_eq!(v["data"][0]["y"], json!(["Clínica Médica", "Pediatria"]));
    assert_eq!(v["data"][0]["text"], json!(["50 (50.0%)", "30 (30.0%)"]));
    assert_eq!(v["layout"]["height"], json!(216));
}

#[test]
fn test_empty_group_bars_give_placeholder() {
    let table = counts("instituicao", &[]);
    let fig = bar_total_by_group(
        &table,
        &GroupBarOptions::new("instituicao", "qtd").title("Top instituições"),
    )
    .unwrap();
    assert!(fig.is_placeholder());
    assert_eq!(fig.title(), Some("Top instituições"));
}

#[test]
fn test_flow_mirrors_exits_and_fills_years() {
    let table = ResultTable::new(
        vec![
            ColumnSpec::new("ano", DataType::Int),
            ColumnSpec::new("entradas", DataType::Int),
            ColumnSpec::new("saidas", DataType::Int),
        ],
        vec![
            vec![Value::Int(2020), Value::Int(5), Value::Int(8)],
            vec![Value::Int(2018), Value::Int(10), Value::Int(2)],
            vec![Value::Null, Value::Int(99), Value::Int(99)],
        ],
    )
    .unwrap();
    let fig = entries_exits_by_year(
        &table,
        &FlowOptions::new("ano", "entradas", "saidas").show_net(true),
    )
    .unwrap();
    let v = fig.to_value().unwrap();

    assert_eq!(v["data"][0]["x"], json!([2018.0, 2019.0, 2020.0]));
    assert_eq!(v["data"][0]["y"], json!([10.0, 0.0, 5.0]));
    assert_eq!(v["data"][1]["y"][0], json!(-2.0));
    assert_eq!(v["data"][1]["text"], json!(["2", "0", "8"]));
    assert_eq!(v["data"][2]["y"], json!([8.0, 0.0, -3.0]));
    assert_eq!(v["layout"]["barmode"], "relative");
}

#[test]
fn test_flow_skips_filling_an_implausible_span() {
    let table = ResultTable::new(
        vec![
            ColumnSpec::new("ano", DataType::Int),
            ColumnSpec::new("entradas", DataType::Int),
            ColumnSpec::new("saidas", DataType::Int),
        ],
        vec![
            vec![Value::Int(2024), Value::Int(4), Value::Int(1)],
            vec![Value::Int(0), Value::Int(1), Value::Int(0)],
        ],
    )
    .unwrap();
    let fig = entries_exits_by_year(&table, &FlowOptions::new("ano", "entradas", "saidas")).unwrap();
    let v = fig.to_value().unwrap();
    assert_eq!(v["data"][0]["x"], json!([0.0, 2024.0]));
    assert_eq!(v["data"][0]["y"], json!([1.0, 4.0]));
}

#[test]
fn test_flow_without_movement_is_placeholder() {
    let table = ResultTable::new(
        vec![
            ColumnSpec::new("ano", DataType::Int),
            ColumnSpec::new("entradas", DataType::Int),
            ColumnSpec::new("saidas", DataType::Int),
        ],
        vec![vec![Value::Int(2020), Value::Int(0), Value::Int(0)]],
    )
    .unwrap();
    let fig = entries_exits_by_year(&table, &FlowOptions::default()).unwrap();
    assert!(fig.is_placeholder());
}
