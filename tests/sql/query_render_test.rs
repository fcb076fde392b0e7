//! Tests for the SQL the residency page sends to the warehouse.

use healthpanel::dashboard::{ResidencyFilters, ResidencyPage};
use healthpanel::filter::{Selection, YearRange};
use healthpanel::sql::{Dialect, ParamValue};
use healthpanel::warehouse::{CachedWarehouse, MemoryWarehouse};
use pretty_assertions::assert_eq;

const TABLE: &str = "escolap2p.base_siscnrm.residentes_applications";

fn page(dialect: Dialect) -> ResidencyPage<MemoryWarehouse> {
    ResidencyPage::new(CachedWarehouse::uncached(MemoryWarehouse::new()), TABLE).with_dialect(dialect)
}

#[test]
fn test_per_year_query_bigquery() {
    let q = page(Dialect::BigQuery)
        .per_year_query(&ResidencyFilters::default())
        .unwrap();
    insta::assert_snapshot!(q.sql, @r"
    SELECT
      CAST(`certificado_emissao_ano` AS INT64) AS `ano`,
      COUNT(DISTINCT `certificado_hash`) AS `qtd`
    FROM `escolap2p.base_siscnrm.residentes_applications`
    WHERE LOWER(TRIM(`validacao_final`)) = 'sim'
    GROUP BY CAST(`certificado_emissao_ano` AS INT64)
    HAVING CAST(`certificado_emissao_ano` AS INT64) IS NOT NULL
    ORDER BY `ano` ASC
    ");
    assert!(q.params.is_empty());
}

#[test]
fn test_user_values_never_reach_sql_text() {
    let hostile = "Hospital X'; DROP TABLE t; --";
    let filters = ResidencyFilters {
        institution: Selection::Only(hostile.into()),
        ..Default::default()
    };
    let page = page(Dialect::BigQuery);
    for (name, q) in page.queries(&filters).unwrap() {
        assert!(!q.sql.contains("DROP TABLE"), "{} leaked the value", name);
        assert_eq!(
            q.param("p0"),
            Some(&ParamValue::String(hostile.into())),
            "{}",
            name
        );
    }
}

#[test]
fn test_postgres_has_no_safe_divide() {
    let q = page(Dialect::Postgres)
        .big_numbers_query(&ResidencyFilters::default())
        .unwrap();
    assert!(!q.sql.contains("SAFE_DIVIDE"));
    assert!(q.sql.contains("NULLIF("));
    assert!(q.sql.contains("FROM \"escolap2p\".\"base_siscnrm\".\"residentes_applications\""));

    let bq = page(Dialect::BigQuery)
        .big_numbers_query(&ResidencyFilters::default())
        .unwrap();
    assert!(bq.sql.contains("SAFE_DIVIDE("));
}

#[test]
fn test_big_numbers_ranges_keep_unknown_years() {
    let filters = ResidencyFilters {
        end_year: YearRange::between(2010, 2024),
        ..Default::default()
    };
    let q = page(Dialect::BigQuery).big_numbers_query(&filters).unwrap();
    assert!(q.sql.contains(
        "WHERE (CAST(`formacao_termino_ano` AS INT64) BETWEEN @p0 AND @p1 \
         OR CAST(`formacao_termino_ano` AS INT64) IS NULL)"
    ));
    assert!(q
        .sql
        .contains("COUNT(DISTINCT CASE WHEN LOWER(TRIM(`validacao_final`)) = 'sim' THEN `certificado_hash` END) AS `cert_validos`"));
}

#[test]
fn test_entries_exits_binds_base_filters_once() {
    let filters = ResidencyFilters {
        uf: Selection::Only("ba".into()),
        start_year: YearRange::between(2015, 2020),
        ..Default::default()
    };
    let q = page(Dialect::DuckDb).entries_exits_query(&filters).unwrap();
    assert_eq!(q.params.len(), 3);
    assert_eq!(q.params[0].value, ParamValue::String("BA".into()));
    assert!(q.sql.contains("WHERE \"medico_nome_hash\" IS NOT NULL AND UPPER(\"uf\") = $1"));
    assert!(q.sql.contains("COALESCE(\"e\".\"qtd\", 0) AS \"entradas\""));
    assert!(q.sql.ends_with("ORDER BY \"ano\" ASC"));
}

#[test]
fn test_sex_query_labels_missing_values() {
    let q = page(Dialect::BigQuery)
        .by_sex_query(&ResidencyFilters::default())
        .unwrap();
    assert!(q
        .sql
        .contains("COALESCE(LOWER(TRIM(`medico_sexo_inferido`)), '(não informado)') AS `sexo`"));
    assert!(q.sql.ends_with("ORDER BY `qtd` DESC"));
}

#[test]
fn test_options_and_bounds_queries() {
    let page = page(Dialect::BigQuery);
    let bounds = page.bounds_query();
    assert!(bounds.sql.contains("MIN(CAST(`formacao_inicio_ano` AS INT64)) AS `ini_min`"));
    assert!(bounds.sql.contains("MAX(CAST(`certificado_emissao_ano` AS INT64)) AS `emissao_max`"));

    let dict = page.dictionary_query();
    assert!(dict.sql.ends_with("LIMIT 0"));
}

#[test]
fn test_baseline_query_ignores_filters() {
    let q = page(Dialect::BigQuery).baseline_query();
    insta::assert_snapshot!(q.sql, @r"
    WITH `por_hash` AS (
    SELECT
      `certificado_hash`,
      MAX(CASE WHEN LOWER(TRIM(`validacao_final`)) = 'sim' THEN 1 ELSE 0 END) AS `is_valid`
    FROM `escolap2p.base_siscnrm.residentes_applications`
    GROUP BY `certificado_hash`
    )
    SELECT
      SUM(CASE WHEN `is_valid` = 1 THEN 1 ELSE 0 END) AS `certificados_validos`,
      SUM(CASE WHEN `is_valid` = 0 THEN 1 ELSE 0 END) AS `certificados_invalidos`
    FROM `por_hash`
    ");
    assert!(q.params.is_empty());
}
