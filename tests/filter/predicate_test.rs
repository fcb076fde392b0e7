//! Tests for translating widget choices into WHERE clauses.

use healthpanel::dashboard::ResidencyFilters;
use healthpanel::filter::{FilterField, FilterSelection, FilterValue, Selection, YearRange};
use healthpanel::sql::{cast_int, col, lit_str, lower_trim, Dialect, ExprExt, ParamValue};
use pretty_assertions::assert_eq;

fn validated() -> healthpanel::sql::Expr {
    lower_trim(col("validacao_final")).eq(lit_str("sim"))
}

#[test]
fn test_all_sentinels_leave_only_the_base_predicate() {
    let mut sel = FilterSelection::new().with_base(validated());
    for (column, label) in [
        ("programa_padronizado", "(Todos)"),
        ("instituicao_padronizada", "(Todas)"),
        ("formacao_padronizada_entrada_direta", "(Ambos)"),
    ] {
        sel.push(
            FilterField::column(column),
            FilterValue::Choice(Selection::parse_choice(label)),
        );
    }

    let (clause, params) = sel.where_clause(Dialect::BigQuery).unwrap();
    assert_eq!(clause, "WHERE LOWER(TRIM(`validacao_final`)) = 'sim'");
    assert!(params.is_empty());
}

#[test]
fn test_mixed_selection_binds_in_order() {
    let sel = FilterSelection::new()
        .with_base(validated())
        .with(
            FilterField::column("regiao"),
            FilterValue::Choice(Selection::Only("Nordeste".into())),
        )
        .with(
            FilterField::new("formacao_inicio_ano", cast_int(col("formacao_inicio_ano"))),
            FilterValue::Range(YearRange::between(2010, 2022)),
        );

    let (clause, params) = sel.where_clause(Dialect::BigQuery).unwrap();
    assert_eq!(
        clause,
        "WHERE LOWER(TRIM(`validacao_final`)) = 'sim' AND `regiao` = @p0 \
         AND CAST(`formacao_inicio_ano` AS INT64) BETWEEN @p1 AND @p2"
    );
    let values: Vec<_> = params.iter().map(|p| p.value.clone()).collect();
    assert_eq!(
        values,
        vec![
            ParamValue::String("Nordeste".into()),
            ParamValue::Int64(2010),
            ParamValue::Int64(2022),
        ]
    );
}

#[test]
fn test_positional_placeholders_for_postgres() {
    let sel = FilterSelection::new()
        .with(
            FilterField::column("uf"),
            FilterValue::AnyOf(vec!["SP".into(), "RJ".into()]),
        )
        .with(
            FilterField::column("formacao_duracao_anos"),
            FilterValue::Range(YearRange::new(None, Some(3))),
        );

    let (clause, params) = sel.where_clause(Dialect::Postgres).unwrap();
    assert_eq!(
        clause,
        "WHERE \"uf\" IN ($1, $2) AND \"formacao_duracao_anos\" <= $3"
    );
    assert_eq!(params.len(), 3);
    assert_eq!(params[2].position, 3);
}

#[test]
fn test_empty_any_of_imposes_nothing() {
    let sel = FilterSelection::new().with(FilterField::column("uf"), FilterValue::AnyOf(vec![]));
    let (clause, params) = sel.where_clause(Dialect::DuckDb).unwrap();
    assert_eq!(clause, "");
    assert!(params.is_empty());
}

#[test]
fn test_residency_filters_round_trip_through_json() {
    let json = r#"{
        "uf": {"only": "MG"},
        "sex": {"only": "Feminino"},
        "start_year": {"start": 2010, "end": 2020}
    }"#;
    let filters: ResidencyFilters = serde_json::from_str(json).unwrap();
    assert_eq!(filters.uf, Selection::Only("MG".into()));
    assert!(filters.program.is_all());
    assert_eq!(filters.start_year, YearRange::between(2010, 2020));

    let (clause, params) = filters.selection().where_clause(Dialect::BigQuery).unwrap();
    insta::assert_snapshot!(
        clause,
        @"WHERE LOWER(TRIM(`validacao_final`)) = 'sim' AND UPPER(`uf`) = @p0 AND LOWER(TRIM(`medico_sexo_inferido`)) = @p1 AND CAST(`formacao_inicio_ano` AS INT64) BETWEEN @p2 AND @p3"
    );
    assert_eq!(params[1].value, ParamValue::String("feminino".into()));
}

#[test]
fn test_fingerprint_ignores_binding_but_not_values() {
    let a = ResidencyFilters {
        region: Selection::Only("Sul".into()),
        ..Default::default()
    };
    let b = ResidencyFilters {
        region: Selection::Only("Sudeste".into()),
        ..Default::default()
    };
    let fa = a.selection().fingerprint().unwrap();
    assert_eq!(fa, a.clone().selection().fingerprint().unwrap());
    assert_ne!(fa, b.selection().fingerprint().unwrap());
    assert_eq!(fa.len(), 64);
}
