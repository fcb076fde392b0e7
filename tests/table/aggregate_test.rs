//! Tests for reading result tables and reshaping them for charts.

use healthpanel::stats::{pareto, AbcBand};
use healthpanel::table::{
    group_by, group_by2, total, Aggregation, CsvExport, DataType, ResultTable, Value,
    NOT_INFORMED,
};
use pretty_assertions::assert_eq;

const CERTIFICATES: &str = "\
regiao,uf,certificado_hash,ano
Sudeste,SP,h1,2019
Sudeste,SP,h2,2019
Sudeste,RJ,h3,2020
Nordeste,BA,h4,2020
Nordeste,BA,h4,2020
,AM,h5,
Sul,RS,h6,2021
";

fn certificates() -> ResultTable {
    ResultTable::from_csv_reader(CERTIFICATES.as_bytes()).unwrap()
}

#[test]
fn test_csv_types_are_inferred_and_blanks_are_null() {
    let table = certificates();
    assert_eq!(table.num_rows(), 7);
    let types: Vec<_> = table.columns.iter().map(|c| c.data_type).collect();
    assert_eq!(
        types,
        vec![
            DataType::String,
            DataType::String,
            DataType::String,
            DataType::Int
        ]
    );
    assert_eq!(table.rows[5][0], Value::Null);
    assert_eq!(table.int("ano").unwrap()[5], None);
}

#[test]
fn test_distinct_certificates_per_region() {
    let groups = group_by(
        &certificates(),
        "regiao",
        &Aggregation::CountDistinct("certificado_hash".into()),
    )
    .unwrap();
    let pairs: Vec<_> = groups.iter().map(|g| (g.key.as_str(), g.value)).collect();
    assert_eq!(
        pairs,
        vec![
            ("Sudeste", 3.0),
            ("Nordeste", 1.0),
            (NOT_INFORMED, 1.0),
            ("Sul", 1.0)
        ]
    );
    assert_eq!(total(&groups), 6.0);
}

#[test]
fn test_two_key_groups_keep_first_seen_order() {
    let cells = group_by2(&certificates(), "regiao", "ano", &Aggregation::Rows).unwrap();
    let keys: Vec<_> = cells
        .iter()
        .map(|c| (c.row.as_str(), c.col.as_str(), c.value))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("Sudeste", "2019", 2.0),
            ("Sudeste", "2020", 1.0),
            ("Nordeste", "2020", 2.0),
            (NOT_INFORMED, NOT_INFORMED, 1.0),
            ("Sul", "2021", 1.0),
        ]
    );
}

#[test]
fn test_pareto_bands_follow_cumulative_share() {
    let groups = group_by(&certificates(), "uf", &Aggregation::Rows).unwrap();
    let rows = pareto(groups, 80.0, 95.0);

    assert_eq!(rows[0].key, "SP");
    assert_eq!(rows[1].key, "BA");
    assert!((rows.last().unwrap().cum_pct - 100.0).abs() < 1e-9);
    assert_eq!(rows[0].band, AbcBand::A);
    assert_eq!(rows.last().unwrap().band, AbcBand::C);
    for pair in rows.windows(2) {
        assert!(pair[0].value >= pair[1].value);
    }
}

#[test]
fn test_unknown_measure_column_is_an_error() {
    let err = group_by(
        &certificates(),
        "regiao",
        &Aggregation::Sum("qtd".into()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("column 'qtd' not found"));
}

#[test]
fn test_export_writes_header_and_dated_filename() {
    let date = chrono::NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    let export = CsvExport::from_table(&certificates(), "cnrm_residentes_filtrado", date).unwrap();
    assert_eq!(export.filename, "cnrm_residentes_filtrado_2025-03-07.csv");
    let text = export.as_str().unwrap();
    assert!(text.starts_with("regiao,uf,certificado_hash,ano\n"));
    assert!(text.contains("\n,AM,h5,\n"));
}
