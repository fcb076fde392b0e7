//! Tests for the state and region choropleths.

use healthpanel::chart::{aggregate_states_to_regions, choropleth, ChartError, ChoroplethOptions, GeoLevel};
use healthpanel::geo::{Boundaries, GeoError};
use healthpanel::table::{ColumnSpec, DataType, ResultTable, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

const STATES_BY_NAME: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"NM_UF": "SÃO PAULO", "CD_UF": 35}, "geometry": null},
        {"type": "Feature", "properties": {"NM_UF": "BAHIA", "CD_UF": 29}, "geometry": null},
        {"type": "Feature", "properties": {"NM_UF": "PARÁ", "CD_UF": 15}, "geometry": null}
    ]
}"#;

const REGIONS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"NM_REGIAO": "CENTRO-OESTE"}, "geometry": null},
        {"type": "Feature", "properties": {"NM_REGIAO": "SUDESTE"}, "geometry": null}
    ]
}"#;

fn totals(key: &str, rows: &[(Option<&str>, i64)]) -> ResultTable {
    ResultTable::new(
        vec![
            ColumnSpec::new(key, DataType::String),
            ColumnSpec::new("total", DataType::Int),
        ],
        rows.iter()
            .map(|(k, t)| vec![Value::from(*k), Value::Int(*t)])
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_state_abbreviations_fall_back_to_names() {
    let boundaries = Boundaries::from_str(STATES_BY_NAME).unwrap();
    let table = totals("uf", &[(Some("SP"), 1200), (Some("ba"), 300), (None, 7)]);
    let fig = choropleth(
        &table,
        &boundaries,
        &ChoroplethOptions::new("uf", "total", GeoLevel::State).title("Por UF"),
    )
    .unwrap();
    let v = fig.to_value().unwrap();

    let trace = &v["data"][0];
    assert_eq!(trace["type"], "choropleth");
    assert_eq!(trace["featureidkey"], "properties.NM_UF");
    assert_eq!(trace["locations"], json!(["SÃO PAULO", "BAHIA"]));
    assert_eq!(trace["z"], json!([1200.0, 300.0]));
    assert_eq!(trace["text"][0], "São Paulo (SP): 1.200");
    assert_eq!(v["layout"]["geo"]["fitbounds"], "locations");
}

#[test]
fn test_region_names_are_canonicalised() {
    let boundaries = Boundaries::from_str(REGIONS).unwrap();
    let table = totals("regiao", &[(Some("centro oeste"), 4), (Some("Sudeste"), 9)]);
    let fig = choropleth(
        &table,
        &boundaries,
        &ChoroplethOptions::new("regiao", "total", GeoLevel::Region),
    )
    .unwrap();
    let v = fig.to_value().unwrap();
    assert_eq!(v["data"][0]["featureidkey"], "properties.NM_REGIAO");
    assert_eq!(v["data"][0]["locations"], json!(["CENTRO-OESTE", "SUDESTE"]));
}

#[test]
fn test_key_missing_from_the_boundaries_fails() {
    let boundaries = Boundaries::from_str(STATES_BY_NAME).unwrap();
    let table = totals("uf", &[(Some("SP"), 1), (Some("RS"), 1)]);
    let err = choropleth(
        &table,
        &boundaries,
        &ChoroplethOptions::new("uf", "total", GeoLevel::State),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ChartError::Geo(GeoError::UnmatchedKeys { .. })
    ));
}

#[test]
fn test_unknown_state_is_reported() {
    let boundaries = Boundaries::from_str(STATES_BY_NAME).unwrap();
    let table = totals("uf", &[(Some("XX"), 1)]);
    let err = choropleth(
        &table,
        &boundaries,
        &ChoroplethOptions::new("uf", "total", GeoLevel::State),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "unknown state abbreviation: XX");
}

#[test]
fn test_only_null_keys_gives_placeholder() {
    let boundaries = Boundaries::from_str(STATES_BY_NAME).unwrap();
    let table = totals("uf", &[(None, 5)]);
    let fig = choropleth(
        &table,
        &boundaries,
        &ChoroplethOptions::new("uf", "total", GeoLevel::State),
    )
    .unwrap();
    assert!(fig.is_placeholder());
}

#[test]
fn test_states_roll_up_to_regions_in_map_order() {
    let table = totals(
        "uf",
        &[(Some("SP"), 10), (Some("BA"), 3), (Some("RJ"), 5), (None, 2)],
    );
    let regions = aggregate_states_to_regions(&table, "uf", "total").unwrap();
    assert_eq!(regions.column_names(), vec!["regiao", "total"]);
    assert_eq!(
        regions.rows,
        vec![
            vec![Value::from("Nordeste"), Value::Float(3.0)],
            vec![Value::from("Sudeste"), Value::Float(15.0)],
        ]
    );
}

#[test]
fn test_boundaries_without_features_are_rejected() {
    let err = Boundaries::from_str(r#"{"type": "FeatureCollection"}"#).unwrap_err();
    assert!(matches!(err, GeoError::Malformed(_)));
}
