//! End-to-end renders of the residency page against canned results.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use healthpanel::cache::ResultCache;
use healthpanel::dashboard::residency::{DURATION_FALLBACK, YEAR_FALLBACK};
use healthpanel::dashboard::{
    AssetDir, BaselineCounts, DashboardError, PanelContent, ResidencyFilters, ResidencyPage,
};
use healthpanel::filter::YearRange;
use healthpanel::sql::ParamValue;
use healthpanel::table::{ColumnSpec, DataType, ResultTable, Value};
use healthpanel::warehouse::{CachedWarehouse, MemoryWarehouse};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const TABLE: &str = "escolap2p.base_siscnrm.residentes_applications";

const PANEL_IDS: [&str; 10] = [
    "big_numbers",
    "certificates_per_year",
    "certificates_by_region",
    "certificates_by_uf",
    "certificates_uf_map",
    "top_programs",
    "top_institutions",
    "certificates_by_sex",
    "entries_exits",
    "residents_by_stage",
];

const STATES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"SIGLA_UF": "SP"}, "geometry": null},
        {"type": "Feature", "properties": {"SIGLA_UF": "BA"}, "geometry": null}
    ]
}"#;

fn table(columns: &[(&str, DataType)], rows: Vec<Vec<Value>>) -> ResultTable {
    ResultTable::new(
        columns
            .iter()
            .map(|(name, ty)| ColumnSpec::new(name, *ty))
            .collect(),
        rows,
    )
    .unwrap()
}

fn options() -> ResultTable {
    table(
        &[("valor", DataType::String)],
        vec![vec!["Sul".into()], vec!["  ".into()], vec![Value::Null]],
    )
}

fn bounds(values: [Option<i64>; 8]) -> ResultTable {
    let names = [
        "ini_min",
        "ini_max",
        "fim_min",
        "fim_max",
        "dur_min",
        "dur_max",
        "emissao_min",
        "emissao_max",
    ];
    let columns: Vec<_> = names.iter().map(|n| (*n, DataType::Int)).collect();
    table(&columns, vec![values.iter().map(|v| Value::from(*v)).collect()])
}

fn summary() -> ResultTable {
    let ints = [
        "cert_validos",
        "instituicoes_validas",
        "programas_validos",
        "regioes_validas",
        "ufs_validas",
        "medicos_formados_validos",
    ];
    let mut columns: Vec<_> = ints.iter().map(|n| (*n, DataType::Int)).collect();
    columns.push(("media_cert_por_medico", DataType::Float));
    columns.push(("media_duracao_anos", DataType::Float));
    table(
        &columns,
        vec![vec![
            Value::Int(12345),
            Value::Int(310),
            Value::Int(52),
            Value::Int(5),
            Value::Int(27),
            Value::Int(11000),
            Value::Float(1.12227),
            Value::Null,
        ]],
    )
}

fn keyed(key: &str, measure: &str, rows: &[(&str, i64)]) -> ResultTable {
    table(
        &[(key, DataType::String), (measure, DataType::Int)],
        rows.iter()
            .map(|(k, v)| vec![Value::from(*k), Value::Int(*v)])
            .collect(),
    )
}

/// Routes are matched in order; the more specific fragments come first.
fn warehouse() -> MemoryWarehouse {
    MemoryWarehouse::new()
        .with_table("AS `valor`", options())
        .with_table(
            "AS `ini_min`",
            bounds([
                Some(2000),
                Some(2020),
                Some(2003),
                Some(2024),
                Some(1),
                Some(5),
                Some(2003),
                Some(2024),
            ]),
        )
        .with_table("AS `cert_validos`", summary())
        .with_table(
            "WITH `base`",
            table(
                &[
                    ("ano", DataType::Int),
                    ("entradas", DataType::Int),
                    ("saidas", DataType::Int),
                ],
                vec![vec![Value::Int(2019), Value::Int(5), Value::Int(2)]],
            ),
        )
        .with_table(
            "AS `etapa`",
            table(
                &[
                    ("ano", DataType::Int),
                    ("etapa", DataType::String),
                    ("qtd", DataType::Int),
                ],
                vec![vec![Value::Int(2019), "R1".into(), Value::Int(3)]],
            ),
        )
        .with_table(
            "ORDER BY `ano` ASC",
            table(
                &[("ano", DataType::Int), ("qtd", DataType::Int)],
                vec![
                    vec![Value::Int(2019), Value::Int(10)],
                    vec![Value::Int(2020), Value::Int(12)],
                ],
            ),
        )
        .with_table(
            "AS `regiao`",
            keyed("regiao", "total", &[("Sudeste", 1200), ("Nordeste", 300)]),
        )
        .with_table("AS `uf`", keyed("uf", "total", &[("SP", 1200), ("BA", 300)]))
        .with_table("AS `programa`", keyed("programa", "qtd", &[]))
        .with_table(
            "AS `instituicao`",
            keyed("instituicao", "qtd", &[("Hospital das Clínicas", 40)]),
        )
        .with_table(
            "AS `sexo`",
            keyed("sexo", "qtd", &[("masculino", 60), ("feminino", 40)]),
        )
        .with_table(
            "AS `qtd_certificados`",
            table(
                &[
                    ("regiao", DataType::String),
                    ("uf", DataType::String),
                    ("qtd_certificados", DataType::Int),
                ],
                vec![vec!["Sudeste".into(), "SP".into(), Value::Int(7)]],
            ),
        )
        .with_table("AS `total_validos`", keyed("x", "total_validos", &[("", 42)]))
        .with_table(
            "LIMIT 0",
            table(
                &[
                    ("certificado_hash", DataType::String),
                    ("formacao_inicio_ano", DataType::Int),
                ],
                vec![],
            ),
        )
}

fn assets_with_states() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("br_states.json"), STATES).unwrap();
    dir
}

fn page(wh: MemoryWarehouse, assets: &TempDir) -> ResidencyPage<MemoryWarehouse> {
    ResidencyPage::new(CachedWarehouse::uncached(wh), TABLE)
        .with_assets(AssetDir::new(assets.path()), "br_states.json")
}

#[tokio::test]
async fn test_render_answers_every_question_in_order() {
    let assets = assets_with_states();
    let panels = page(warehouse(), &assets)
        .render(&ResidencyFilters::default())
        .await
        .unwrap();

    let ids: Vec<_> = panels.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, PANEL_IDS);
    assert!(panels[1..].iter().all(|p| p.figure().is_some()));

    let map = panels[4].figure().unwrap().to_value().unwrap();
    assert_eq!(map["data"][0]["featureidkey"], "properties.SIGLA_UF");
    assert_eq!(map["data"][0]["locations"], serde_json::json!(["SP", "BA"]));
}

#[tokio::test]
async fn test_big_numbers_are_formatted_for_display() {
    let assets = assets_with_states();
    let panels = page(warehouse(), &assets)
        .render(&ResidencyFilters::default())
        .await
        .unwrap();

    let PanelContent::Metrics(metrics) = &panels[0].content else {
        panic!("big numbers should be metric tiles");
    };
    let values: Vec<_> = metrics.iter().map(|m| m.value.as_str()).collect();
    assert_eq!(
        values,
        vec!["12.345", "310", "52", "5", "27", "11.000", "1,12", "0,00"]
    );
}

#[tokio::test]
async fn test_empty_panel_result_is_a_placeholder() {
    let assets = assets_with_states();
    let panels = page(warehouse(), &assets)
        .render(&ResidencyFilters::default())
        .await
        .unwrap();
    let programs = panels.iter().find(|p| p.id == "top_programs").unwrap();
    assert!(programs.figure().unwrap().is_placeholder());
}

#[tokio::test]
async fn test_missing_boundary_file_becomes_a_warning() {
    let empty = TempDir::new().unwrap();
    let panels = page(warehouse(), &empty)
        .render(&ResidencyFilters::default())
        .await
        .unwrap();

    let map = panels.iter().find(|p| p.id == "certificates_uf_map").unwrap();
    assert!(map.is_warning());
    let PanelContent::Warning(text) = &map.content else {
        unreachable!()
    };
    assert!(text.contains("br_states.json"));
    assert_eq!(panels.len(), PANEL_IDS.len());
}

#[tokio::test]
async fn test_ranges_are_clamped_before_querying() {
    let assets = assets_with_states();
    let page = page(warehouse(), &assets);
    let filters = ResidencyFilters {
        start_year: YearRange::between(1990, 2030),
        ..Default::default()
    };
    page.render(&filters).await.unwrap();

    let executed = page.warehouse().inner().executed().await;
    let per_year = executed
        .iter()
        .find(|q| q.sql.contains("ORDER BY `ano` ASC") && !q.sql.contains("WITH"))
        .unwrap();
    let values: Vec<_> = per_year.params.iter().map(|p| p.value.clone()).collect();
    assert_eq!(values, vec![ParamValue::Int64(2000), ParamValue::Int64(2020)]);
}

#[tokio::test]
async fn test_options_drop_blanks_and_bounds_fall_back() {
    let wh = MemoryWarehouse::new()
        .with_table("AS `valor`", options())
        .with_table("AS `ini_min`", bounds([None; 8]));
    let assets = assets_with_states();
    let options = page(wh, &assets).load_options().await.unwrap();

    assert_eq!(options.ufs, vec!["Sul"]);
    assert_eq!(options.start_years, YEAR_FALLBACK);
    assert_eq!(options.durations, DURATION_FALLBACK);
}

#[tokio::test]
async fn test_warehouse_failure_fails_the_render() {
    let wh = MemoryWarehouse::new()
        .with_error("AS `sexo`", "INVALID_QUERY", "Unrecognized name: medico_sexo_inferido")
        .with_table("AS `valor`", options())
        .with_table("AS `ini_min`", bounds([None; 8]))
        .with_fallback(keyed("k", "v", &[]));
    let assets = assets_with_states();
    let err = page(wh, &assets)
        .render(&ResidencyFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::Warehouse(_)));
}

#[tokio::test]
async fn test_second_render_is_served_from_cache() {
    let cache = Arc::new(ResultCache::open_in_memory().unwrap());
    let wh = CachedWarehouse::new(
        warehouse(),
        cache,
        Duration::from_secs(900),
        Duration::from_secs(3600),
    );
    let assets = assets_with_states();
    let page = ResidencyPage::new(wh, TABLE)
        .with_assets(AssetDir::new(assets.path()), "br_states.json");

    let first = page.render(&ResidencyFilters::default()).await.unwrap();
    let hits_after_first = page.warehouse().inner().executions();
    assert_eq!(hits_after_first, 18);

    let second = page.render(&ResidencyFilters::default()).await.unwrap();
    assert_eq!(page.warehouse().inner().executions(), hits_after_first);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_downloads_are_dated_csv_files() {
    let assets = assets_with_states();
    let page = page(warehouse(), &assets);
    let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    let filters = ResidencyFilters::default();

    let csv = page.download(&filters, date).await.unwrap();
    assert_eq!(csv.filename, "cnrm_residentes_filtrado_2025-03-07.csv");
    assert_eq!(csv.content_type, "text/csv");
    assert_eq!(
        csv.as_str().unwrap(),
        "regiao,uf,qtd_certificados\nSudeste,SP,7\n"
    );

    assert_eq!(page.download_total(&filters).await.unwrap(), 42);

    let dict = page.dictionary(date).await.unwrap();
    assert_eq!(dict.filename, "crnm_dicionario_2025-03-07.csv");
    assert_eq!(
        dict.as_str().unwrap(),
        "column,type,mode\ncertificado_hash,STRING,NULLABLE\nformacao_inicio_ano,INT64,NULLABLE\n"
    );
}

#[tokio::test]
async fn test_baseline_counts_are_unfiltered_and_cached() {
    let wh = warehouse().with_table(
        "WITH `por_hash`",
        table(
            &[
                ("certificados_validos", DataType::Int),
                ("certificados_invalidos", DataType::Int),
            ],
            vec![vec![Value::Int(12345), Value::Null]],
        ),
    );
    let cache = Arc::new(ResultCache::open_in_memory().unwrap());
    let cached = CachedWarehouse::new(
        wh,
        cache,
        Duration::from_secs(900),
        Duration::from_secs(3600),
    );
    let page = ResidencyPage::new(cached, TABLE);

    let counts = page.baseline_counts().await.unwrap();
    assert_eq!(counts, BaselineCounts { valid: 12345, invalid: 0 });

    let panel = page.baseline_panel().await.unwrap();
    assert_eq!(panel.id, "baseline_counts");
    let PanelContent::Metrics(metrics) = &panel.content else {
        panic!("expected metric tiles, got {:?}", panel.content);
    };
    let values: Vec<_> = metrics.iter().map(|m| m.value.as_str()).collect();
    assert_eq!(values, vec!["12.345", "0"]);

    assert_eq!(page.warehouse().inner().executions(), 1);
    let executed = page.warehouse().inner().executed().await;
    assert!(executed[0].params.is_empty());
}
