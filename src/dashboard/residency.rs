//! Medical residency certificates page.
//!
//! Every panel queries the certificates table through the same filter
//! selection, so one set of widget choices drives the whole page. Queries
//! run concurrently and go through the result cache; the options lists use
//! the longer options window.

use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::assets::{AssetDir, AssetLookup};
use super::{DashboardResult, Metric, Panel, PanelContent};
use crate::chart::{
    bar_total_by_group, bar_yoy_trend, choropleth, entries_exits_by_year, heatmap_absolute,
    palette, pareto_barh, pie_standard, ChoroplethOptions, FlowOptions, GeoLevel,
    GroupBarOptions, HeatmapOptions, LegendPosition, ParetoOptions, PercentOf, PieOptions,
    Totals, TrendOptions,
};
use crate::config::Settings;
use crate::filter::{FilterField, FilterSelection, FilterValue, Selection, YearRange};
use crate::format;
use crate::geo::Boundaries;
use crate::sql::{
    avg, case_when, case_when_else, cast_int, coalesce, col, count_distinct, count_if_distinct,
    lit_int, lit_str, lower_trim, max, min, safe_divide, sum, table_col, upper, BoundQuery, Cte, Dialect, Expr, ExprExt,
    OrderByExpr, ParamBinder, Query, TableRef,
};
use crate::table::{CsvExport, ResultTable, NOT_INFORMED};
use crate::warehouse::{CachedWarehouse, Warehouse};

/// Column names of the certificates table.
pub mod columns {
    pub const VALIDATION: &str = "validacao_final";
    pub const CERTIFICATE: &str = "certificado_hash";
    pub const DOCTOR: &str = "medico_nome_hash";
    pub const PROGRAM: &str = "programa_padronizado";
    pub const INSTITUTION: &str = "instituicao_padronizada";
    pub const REGION: &str = "regiao";
    pub const UF: &str = "uf";
    pub const SEX: &str = "medico_sexo_inferido";
    pub const TRAINING_TYPE: &str = "formacao_padronizada_tipo";
    pub const BASIC_SPECIALTY: &str = "formacao_padronizada_especialidade_basica";
    pub const DIRECT_ENTRY: &str = "formacao_padronizada_entrada_direta";
    pub const DURATION: &str = "formacao_duracao_anos";
    pub const START_YEAR: &str = "formacao_inicio_ano";
    pub const END_YEAR: &str = "formacao_termino_ano";
    pub const ISSUE_YEAR: &str = "certificado_emissao_ano";
    pub const RESIDENCY_YEAR: &str = "formacao_ano_residencia";
    pub const STAGE: &str = "formacao_etapa_residencia";
}

use columns as c;

/// Year bounds used when the table reports none.
pub const YEAR_FALLBACK: (i64, i64) = (1980, 2026);
/// Duration bounds used when the table reports none.
pub const DURATION_FALLBACK: (i64, i64) = (1, 6);

/// File name stem of the filtered download.
pub const DOWNLOAD_STEM: &str = "cnrm_residentes_filtrado";
/// File name stem of the column dictionary.
pub const DICTIONARY_STEM: &str = "crnm";

const Y_CERTIFICATES: &str = "Certificados (distintos)";

/// `LOWER(TRIM(validacao_final)) = 'sim'`
pub fn validated() -> Expr {
    lower_trim(col(c::VALIDATION)).eq(lit_str("sim"))
}

// ============================================================================
// Filters
// ============================================================================

/// The page's widget choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidencyFilters {
    pub program: Selection<String>,
    pub institution: Selection<String>,
    pub region: Selection<String>,
    pub uf: Selection<String>,
    pub sex: Selection<String>,
    pub training_type: Selection<String>,
    pub basic_specialty: Selection<String>,
    pub direct_entry: Selection<String>,
    pub duration: YearRange,
    pub start_year: YearRange,
    pub end_year: YearRange,
    pub issue_year: YearRange,
}

impl ResidencyFilters {
    /// Restrictions over validated certificates, used by the chart panels.
    pub fn selection(&self) -> FilterSelection {
        self.restrictions(false).with_base(validated())
    }

    /// The same restrictions without the validation predicate.
    pub fn raw_selection(&self) -> FilterSelection {
        self.restrictions(false)
    }

    /// Restrictions for the metric tiles: ranges keep rows whose year is
    /// unknown, and validity is decided inside each aggregate.
    pub fn summary_selection(&self) -> FilterSelection {
        self.restrictions(true)
    }

    fn restrictions(&self, keep_null_ranges: bool) -> FilterSelection {
        let uf = match &self.uf {
            Selection::Only(v) => Selection::Only(v.trim().to_uppercase()),
            Selection::All => Selection::All,
        };
        let range = |name: &str| {
            let field = FilterField::new(name, cast_int(col(name)));
            if keep_null_ranges {
                field.include_nulls()
            } else {
                field
            }
        };

        FilterSelection::new()
            .with(
                FilterField::column(c::PROGRAM),
                FilterValue::Choice(self.program.clone()),
            )
            .with(
                FilterField::column(c::INSTITUTION),
                FilterValue::Choice(self.institution.clone()),
            )
            .with(
                FilterField::column(c::REGION),
                FilterValue::Choice(self.region.clone()),
            )
            .with(
                FilterField::new(c::UF, upper(col(c::UF))),
                FilterValue::Choice(uf),
            )
            .with(
                FilterField::column(c::SEX).case_insensitive(),
                FilterValue::Choice(self.sex.clone()),
            )
            .with(
                FilterField::column(c::TRAINING_TYPE),
                FilterValue::Choice(self.training_type.clone()),
            )
            .with(
                FilterField::column(c::BASIC_SPECIALTY).case_insensitive(),
                FilterValue::Choice(self.basic_specialty.clone()),
            )
            .with(
                FilterField::column(c::DIRECT_ENTRY).case_insensitive(),
                FilterValue::Choice(self.direct_entry.clone()),
            )
            .with(range(c::DURATION), FilterValue::Range(self.duration))
            .with(range(c::START_YEAR), FilterValue::Range(self.start_year))
            .with(range(c::END_YEAR), FilterValue::Range(self.end_year))
            .with(range(c::ISSUE_YEAR), FilterValue::Range(self.issue_year))
    }

    /// Repair every range against the bounds observed in the table.
    pub fn clamped(&self, options: &FilterOptions) -> Self {
        Self {
            duration: self.duration.clamp_to(options.durations),
            start_year: self.start_year.clamp_to(options.start_years),
            end_year: self.end_year.clamp_to(options.end_years),
            issue_year: self.issue_year.clamp_to(options.issue_years),
            ..self.clone()
        }
    }
}

/// Values offered by the filter widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub programs: Vec<String>,
    pub institutions: Vec<String>,
    pub regions: Vec<String>,
    pub ufs: Vec<String>,
    pub sexes: Vec<String>,
    pub training_types: Vec<String>,
    pub basic_specialty: Vec<String>,
    pub direct_entry: Vec<String>,
    pub start_years: (i64, i64),
    pub end_years: (i64, i64),
    pub durations: (i64, i64),
    pub issue_years: (i64, i64),
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            programs: Vec::new(),
            institutions: Vec::new(),
            regions: Vec::new(),
            ufs: Vec::new(),
            sexes: Vec::new(),
            training_types: Vec::new(),
            basic_specialty: Vec::new(),
            direct_entry: Vec::new(),
            start_years: YEAR_FALLBACK,
            end_years: YEAR_FALLBACK,
            durations: DURATION_FALLBACK,
            issue_years: YEAR_FALLBACK,
        }
    }
}

impl FilterOptions {
    /// Fill in the year and duration bounds from a bounds query result.
    fn with_bounds(mut self, table: &ResultTable) -> DashboardResult<Self> {
        let pair = |lo: &str, hi: &str, fallback: (i64, i64)| -> DashboardResult<(i64, i64)> {
            let lo = table.int(lo)?.first().copied().flatten();
            let hi = table.int(hi)?.first().copied().flatten();
            Ok(match (lo, hi) {
                (Some(lo), Some(hi)) => (lo, hi),
                _ => fallback,
            })
        };
        self.start_years = pair("ini_min", "ini_max", YEAR_FALLBACK)?;
        self.end_years = pair("fim_min", "fim_max", YEAR_FALLBACK)?;
        self.durations = pair("dur_min", "dur_max", DURATION_FALLBACK)?;
        self.issue_years = pair("emissao_min", "emissao_max", YEAR_FALLBACK)?;
        Ok(self)
    }
}

/// Initial widget state: no categorical restriction and the usual year
/// windows, intersected with what the table holds.
pub fn default_filters(options: &FilterOptions) -> ResidencyFilters {
    ResidencyFilters {
        duration: YearRange::default_window(options.durations, (1, 6)),
        start_year: YearRange::default_window(options.start_years, (2010, 2022)),
        end_year: YearRange::default_window(options.end_years, (2010, 2024)),
        issue_year: YearRange::default_window(options.issue_years, (2012, 2024)),
        ..Default::default()
    }
}

/// Option lists the page loads, keyed by the name used in the cache.
fn option_columns() -> Vec<(&'static str, Expr)> {
    vec![
        ("programa", col(c::PROGRAM)),
        ("instituicao", col(c::INSTITUTION)),
        ("regiao", col(c::REGION)),
        ("uf", upper(col(c::UF))),
        ("sexo", lower_trim(col(c::SEX))),
        ("tipo_formacao", col(c::TRAINING_TYPE)),
        ("especialidade_basica", col(c::BASIC_SPECIALTY)),
        ("entrada_direta", col(c::DIRECT_ENTRY)),
    ]
}

// ============================================================================
// Page
// ============================================================================

/// The residency page over one certificates table.
pub struct ResidencyPage<W> {
    warehouse: CachedWarehouse<W>,
    table: String,
    dialect: Dialect,
    assets: AssetDir,
    states_boundaries: String,
}

impl<W: Warehouse> ResidencyPage<W> {
    pub fn new(warehouse: CachedWarehouse<W>, table: &str) -> Self {
        Self {
            warehouse,
            table: table.to_string(),
            dialect: Dialect::BigQuery,
            assets: AssetDir::default(),
            states_boundaries: "br_states.json".to_string(),
        }
    }

    pub fn from_settings(warehouse: CachedWarehouse<W>, settings: &Settings) -> DashboardResult<Self> {
        Ok(Self::new(warehouse, &settings.warehouse.table)
            .with_dialect(settings.warehouse.dialect)
            .with_assets(
                AssetDir::from_settings(&settings.assets)?,
                &settings.assets.boundaries_states,
            ))
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Read assets from `assets`, with state boundaries in `states_file`.
    pub fn with_assets(mut self, assets: AssetDir, states_file: &str) -> Self {
        self.assets = assets;
        self.states_boundaries = states_file.to_string();
        self
    }

    pub fn warehouse(&self) -> &CachedWarehouse<W> {
        &self.warehouse
    }

    pub fn logo(&self) -> AssetLookup {
        self.assets.logo()
    }

    fn table_ref(&self) -> TableRef {
        TableRef::path(&self.table)
    }

    fn bind(&self, query: &Query, binder: ParamBinder) -> BoundQuery {
        BoundQuery::new(query, binder, self.dialect)
    }

    /// Read from the table and apply `selection`.
    fn scoped(
        &self,
        query: Query,
        selection: &FilterSelection,
        binder: &mut ParamBinder,
    ) -> DashboardResult<Query> {
        let query = query.from(self.table_ref());
        Ok(match selection.predicate(binder)? {
            Some(predicate) => query.filter(predicate),
            None => query,
        })
    }

    /// Distinct certificates per `key`, dropping the NULL group.
    fn certificates_by(
        &self,
        key: Expr,
        alias: &str,
        measure: &str,
        filters: &ResidencyFilters,
    ) -> DashboardResult<(Query, ParamBinder)> {
        let mut binder = ParamBinder::new();
        let query = Query::new().select(vec![
            key.clone().alias(alias),
            count_distinct(col(c::CERTIFICATE)).alias(measure),
        ]);
        let query = self
            .scoped(query, &filters.selection(), &mut binder)?
            .group_by(vec![key.clone()])
            .having(key.is_not_null());
        Ok((query, binder))
    }

    fn bound_certificates_by(
        &self,
        key: Expr,
        alias: &str,
        measure: &str,
        filters: &ResidencyFilters,
    ) -> DashboardResult<BoundQuery> {
        let (query, binder) = self.certificates_by(key, alias, measure, filters)?;
        Ok(self.bind(&query, binder))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Distinct non-null values of one option column over validated rows.
    pub fn options_query(&self, expr: Expr) -> BoundQuery {
        let query = Query::new()
            .select(vec![expr.clone().alias("valor")])
            .distinct()
            .from(self.table_ref())
            .filter(validated())
            .filter(expr.is_not_null())
            .order_by(vec![OrderByExpr::asc(col("valor"))]);
        self.bind(&query, ParamBinder::new())
    }

    /// Observed minimum and maximum of each range column.
    pub fn bounds_query(&self) -> BoundQuery {
        let mut select = Vec::new();
        for (prefix, column) in [
            ("ini", c::START_YEAR),
            ("fim", c::END_YEAR),
            ("dur", c::DURATION),
            ("emissao", c::ISSUE_YEAR),
        ] {
            select.push(min(cast_int(col(column))).alias(&format!("{}_min", prefix)));
            select.push(max(cast_int(col(column))).alias(&format!("{}_max", prefix)));
        }
        let query = Query::new()
            .select(select)
            .from(self.table_ref())
            .filter(validated());
        self.bind(&query, ParamBinder::new())
    }

    pub fn big_numbers_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        let valid_count = |expr: Expr| count_if_distinct(validated(), expr);
        let mut binder = ParamBinder::new();
        let query = Query::new().select(vec![
            valid_count(col(c::CERTIFICATE)).alias("cert_validos"),
            valid_count(col(c::INSTITUTION)).alias("instituicoes_validas"),
            valid_count(col(c::PROGRAM)).alias("programas_validos"),
            valid_count(col(c::REGION)).alias("regioes_validas"),
            valid_count(upper(col(c::UF))).alias("ufs_validas"),
            valid_count(col(c::DOCTOR)).alias("medicos_formados_validos"),
            safe_divide(valid_count(col(c::CERTIFICATE)), valid_count(col(c::DOCTOR)))
                .alias("media_cert_por_medico"),
            avg(case_when(validated(), col(c::DURATION))).alias("media_duracao_anos"),
        ]);
        let query = self.scoped(query, &filters.summary_selection(), &mut binder)?;
        Ok(self.bind(&query, binder))
    }

    pub fn per_year_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        let (query, binder) =
            self.certificates_by(cast_int(col(c::ISSUE_YEAR)), "ano", "qtd", filters)?;
        let query = query.order_by(vec![OrderByExpr::asc(col("ano"))]);
        Ok(self.bind(&query, binder))
    }

    pub fn by_region_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        self.bound_certificates_by(col(c::REGION), "regiao", "total", filters)
    }

    pub fn by_uf_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        self.bound_certificates_by(upper(col(c::UF)), "uf", "total", filters)
    }

    pub fn programs_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        self.bound_certificates_by(col(c::PROGRAM), "programa", "qtd", filters)
    }

    pub fn institutions_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        self.bound_certificates_by(col(c::INSTITUTION), "instituicao", "qtd", filters)
    }

    pub fn by_sex_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        let key = coalesce(vec![lower_trim(col(c::SEX)), lit_str(NOT_INFORMED)]);
        let mut binder = ParamBinder::new();
        let query = Query::new().select(vec![
            key.clone().alias("sexo"),
            count_distinct(col(c::CERTIFICATE)).alias("qtd"),
        ]);
        let query = self
            .scoped(query, &filters.selection(), &mut binder)?
            .group_by(vec![key])
            .order_by(vec![OrderByExpr::desc(col("qtd"))]);
        Ok(self.bind(&query, binder))
    }

    /// Distinct doctors entering (residency year = start year) and leaving
    /// (residency year = end year) per residency year, reconciled with a
    /// full outer join so years with only one side still appear.
    pub fn entries_exits_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        let mut binder = ParamBinder::new();
        let base = Query::new()
            .select(vec![
                cast_int(col(c::RESIDENCY_YEAR)).alias("ano_res"),
                cast_int(col(c::START_YEAR)).alias("ano_inicio"),
                cast_int(col(c::END_YEAR)).alias("ano_termino"),
                col(c::DOCTOR).alias("medico_hash"),
            ])
            .filter(col(c::DOCTOR).is_not_null());
        let base = self.scoped(base, &filters.raw_selection(), &mut binder)?;

        let moves = |bound: &str| {
            Query::new()
                .select(vec![
                    col("ano_res").alias("ano"),
                    count_distinct(col("medico_hash")).alias("qtd"),
                ])
                .from(TableRef::cte("base"))
                .filter(col(bound).is_not_null())
                .filter(col("ano_res").eq(col(bound)))
                .group_by(vec![col("ano_res")])
        };

        let query = Query::new()
            .with_cte(Cte::new("base", base))
            .with_cte(Cte::new("entradas", moves("ano_inicio")))
            .with_cte(Cte::new("saidas", moves("ano_termino")))
            .select(vec![
                coalesce(vec![table_col("e", "ano"), table_col("s", "ano")]).alias("ano"),
                coalesce(vec![table_col("e", "qtd"), lit_int(0)]).alias("entradas"),
                coalesce(vec![table_col("s", "qtd"), lit_int(0)]).alias("saidas"),
            ])
            .from(TableRef::cte("entradas").with_alias("e"))
            .full_join(
                TableRef::cte("saidas").with_alias("s"),
                table_col("e", "ano").eq(table_col("s", "ano")),
            )
            .order_by(vec![OrderByExpr::asc(col("ano"))]);
        Ok(self.bind(&query, binder))
    }

    /// Distinct validated residents per stage and residency year.
    pub fn stages_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        let year = cast_int(col(c::RESIDENCY_YEAR));
        let mut binder = ParamBinder::new();
        let query = Query::new().select(vec![
            year.clone().alias("ano"),
            col(c::STAGE).alias("etapa"),
            count_if_distinct(validated(), col(c::DOCTOR)).alias("qtd"),
        ]);
        let query = self
            .scoped(query, &filters.selection(), &mut binder)?
            .group_by(vec![year.clone(), col(c::STAGE)])
            .having(year.is_not_null())
            .order_by(vec![OrderByExpr::asc(col("etapa")), OrderByExpr::asc(col("ano"))]);
        Ok(self.bind(&query, binder))
    }

    fn download_dimensions() -> Vec<Expr> {
        [
            c::REGION,
            c::UF,
            c::INSTITUTION,
            c::PROGRAM,
            c::START_YEAR,
            c::END_YEAR,
        ]
        .iter()
        .map(|name| col(name))
        .collect()
    }

    /// Certificates per location, institution, program and period.
    pub fn download_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        let dims = Self::download_dimensions();
        let mut select: Vec<crate::sql::SelectExpr> = dims.iter().cloned().map(Into::into).collect();
        select.push(count_distinct(col(c::CERTIFICATE)).alias("qtd_certificados"));

        let mut binder = ParamBinder::new();
        let query = self
            .scoped(Query::new().select(select), &filters.selection(), &mut binder)?
            .group_by(dims)
            .order_by(vec![OrderByExpr::desc(col("qtd_certificados"))]);
        Ok(self.bind(&query, binder))
    }

    /// Distinct certificates under the download filters. Summing the
    /// download rows would count a certificate once per group.
    pub fn download_total_query(&self, filters: &ResidencyFilters) -> DashboardResult<BoundQuery> {
        let mut binder = ParamBinder::new();
        let query = Query::new().select(vec![count_distinct(col(c::CERTIFICATE)).alias("total_validos")]);
        let query = self.scoped(query, &filters.selection(), &mut binder)?;
        Ok(self.bind(&query, binder))
    }

    /// Valid and invalid certificates over the whole table, ignoring
    /// filters. A certificate is valid when any of its rows is validated.
    pub fn baseline_query(&self) -> BoundQuery {
        let per_certificate = Query::new()
            .select(vec![
                crate::sql::SelectExpr::from(col(c::CERTIFICATE)),
                max(case_when_else(validated(), lit_int(1), lit_int(0))).alias("is_valid"),
            ])
            .from(self.table_ref())
            .group_by(vec![col(c::CERTIFICATE)]);
        let tally = |flag: i64| {
            sum(case_when_else(
                col("is_valid").eq(lit_int(flag)),
                lit_int(1),
                lit_int(0),
            ))
        };
        let query = Query::new()
            .with_cte(Cte::new("por_hash", per_certificate))
            .select(vec![
                tally(1).alias("certificados_validos"),
                tally(0).alias("certificados_invalidos"),
            ])
            .from(TableRef::cte("por_hash"));
        self.bind(&query, ParamBinder::new())
    }

    /// Zero rows, all columns: enough for the column dictionary.
    pub fn dictionary_query(&self) -> BoundQuery {
        let query = Query::new().select_star().from(self.table_ref()).limit(0);
        self.bind(&query, ParamBinder::new())
    }

    /// Every query a render issues, by panel name.
    pub fn queries(&self, filters: &ResidencyFilters) -> DashboardResult<Vec<(&'static str, BoundQuery)>> {
        Ok(vec![
            ("big_numbers", self.big_numbers_query(filters)?),
            ("certificates_per_year", self.per_year_query(filters)?),
            ("certificates_by_region", self.by_region_query(filters)?),
            ("certificates_by_uf", self.by_uf_query(filters)?),
            ("top_programs", self.programs_query(filters)?),
            ("top_institutions", self.institutions_query(filters)?),
            ("certificates_by_sex", self.by_sex_query(filters)?),
            ("entries_exits", self.entries_exits_query(filters)?),
            ("residents_by_stage", self.stages_query(filters)?),
            ("download", self.download_query(filters)?),
        ])
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    async fn run(&self, namespace: &str, query: BoundQuery, fingerprint: &str) -> DashboardResult<ResultTable> {
        let snapshot = self.warehouse.fetch(namespace, &query, fingerprint).await?;
        tracing::debug!(
            namespace,
            rows = snapshot.table.num_rows(),
            from_cache = snapshot.from_cache,
            fetched_at = %snapshot.fetched_at,
            "panel data ready"
        );
        Ok(snapshot.table)
    }

    /// Option lists and observed bounds, with fallbacks when the table
    /// reports none.
    pub async fn load_options(&self) -> DashboardResult<FilterOptions> {
        let mut lists = Vec::new();
        for (name, expr) in option_columns() {
            let query = self.options_query(expr);
            let table = self.warehouse.fetch_options(name, &query).await?.table;
            let values: Vec<String> = table
                .text("valor")?
                .into_iter()
                .flatten()
                .filter(|v| !v.trim().is_empty())
                .collect();
            lists.push(values);
        }
        let bounds = self.warehouse.fetch_options("bounds", &self.bounds_query()).await?.table;

        let mut lists = lists.into_iter();
        let mut next = || lists.next().unwrap_or_default();
        let options = FilterOptions {
            programs: next(),
            institutions: next(),
            regions: next(),
            ufs: next(),
            sexes: next(),
            training_types: next(),
            basic_specialty: next(),
            direct_entry: next(),
            ..Default::default()
        };
        options.with_bounds(&bounds)
    }

    /// Render every panel for `filters`.
    ///
    /// Ranges are clamped to the observed bounds first. A warehouse error
    /// fails the render; an empty result yields the no-data placeholder; a
    /// missing boundary file replaces the map with a warning.
    pub async fn render(&self, filters: &ResidencyFilters) -> DashboardResult<Vec<Panel>> {
        let started = Instant::now();
        let options = self.load_options().await?;
        let filters = filters.clamped(&options);
        let fp = filters.selection().fingerprint()?;

        let queries = (
            self.big_numbers_query(&filters)?,
            self.per_year_query(&filters)?,
            self.by_region_query(&filters)?,
            self.by_uf_query(&filters)?,
            self.programs_query(&filters)?,
            self.institutions_query(&filters)?,
            self.by_sex_query(&filters)?,
            self.entries_exits_query(&filters)?,
            self.stages_query(&filters)?,
        );
        let (summary, per_year, regions, ufs, programs, institutions, sex, flow, stages) = tokio::try_join!(
            self.run("big_numbers", queries.0, &fp),
            self.run("certificates_per_year", queries.1, &fp),
            self.run("certificates_by_region", queries.2, &fp),
            self.run("certificates_by_uf", queries.3, &fp),
            self.run("top_programs", queries.4, &fp),
            self.run("top_institutions", queries.5, &fp),
            self.run("certificates_by_sex", queries.6, &fp),
            self.run("entries_exits", queries.7, &fp),
            self.run("residents_by_stage", queries.8, &fp),
        )?;

        let mut panels = vec![Panel::new(
            "big_numbers",
            "Grandes números",
            PanelContent::Metrics(big_numbers(&summary)?),
        )];

        panels.push(Panel::chart(
            "certificates_per_year",
            "Quantos certificados foram emitidos por ano?",
            bar_yoy_trend(
                &per_year,
                &TrendOptions::new("ano", "qtd")
                    .title("Quantidade de certificados (válidos) emitidos por ano")
                    .y_label(Y_CERTIFICATES),
            )?,
        ));

        panels.push(Panel::chart(
            "certificates_by_region",
            "Quantos certificados foram emitidos por Regiões do País?",
            pareto_barh(
                &regions,
                &ParetoOptions::sum("regiao", "total")
                    .title("Gráfico de Pareto dos Certificados Emitidos por Região")
                    .colorbar_title("Certificados"),
            )?,
        ));

        panels.push(Panel::chart(
            "certificates_by_uf",
            "Quantos certificados foram emitidos por UF do País?",
            pareto_barh(
                &ufs,
                &ParetoOptions::sum("uf", "total")
                    .title("Gráfico de Pareto dos Certificados Emitidos por UF")
                    .colorbar_title("Certificados"),
            )?,
        ));

        panels.push(self.uf_map(&ufs)?);

        panels.push(Panel::chart(
            "top_programs",
            "Quais foram os programas que mais emitiram certificados (Top 10)?",
            bar_total_by_group(
                &programs,
                &GroupBarOptions::new("programa", "qtd")
                    .title("Programas Top 10 com mais certificados (válidos)")
                    .top_n(10)
                    .labels(Y_CERTIFICATES, "Programa"),
            )?,
        ));

        panels.push(Panel::chart(
            "top_institutions",
            "Quais foram as Instituições que mais emitiram certificados (Top 10)?",
            bar_total_by_group(
                &institutions,
                &GroupBarOptions::new("instituicao", "qtd")
                    .title("Instituições Top 10 com mais certificados (válidos)")
                    .top_n(10)
                    .labels(Y_CERTIFICATES, "Instituição"),
            )?,
        ));

        panels.push(Panel::chart(
            "certificates_by_sex",
            "Quantos certificados foram emitidos por sexo do médico?",
            pie_standard(
                &sex,
                &PieOptions::new("sexo", "qtd")
                    .title("Quantidade de certificados (válidos) emitidos por sexo do médico")
                    .top_n(2)
                    .color_map(palette::SEX.iter().copied())
                    .legend(LegendPosition::BelowTitle),
            )?,
        ));

        panels.push(Panel::chart(
            "entries_exits",
            "Quantos médicos entraram e saíram por ano de residência?",
            entries_exits_by_year(
                &flow,
                &FlowOptions::new("ano", "entradas", "saidas")
                    .title("Entradas (+) vs Saídas (–) por ano (médicos distintos)"),
            )?,
        ));

        panels.push(Panel::chart(
            "residents_by_stage",
            "Qual a quantidade de Residentes por momento do Ciclo de Formação e por Ano?",
            heatmap_absolute(
                &stages,
                &HeatmapOptions::new("etapa", "ano", "qtd")
                    .title("Total de residentes por ciclo da formação e ano (absoluto + % no ano)")
                    .percent_of(PercentOf::Col)
                    .totals(Totals::Col)
                    .zero_as_blank(true)
                    .decimals(1),
            )?,
        ));

        tracing::info!(
            panels = panels.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rendered residency page"
        );
        Ok(panels)
    }

    fn uf_map(&self, ufs: &ResultTable) -> DashboardResult<Panel> {
        const ID: &str = "certificates_uf_map";
        const QUESTION: &str = "Como os certificados se distribuem pelas UFs no mapa?";

        let path = match self
            .assets
            .lookup("Mapa das UFs", &[self.states_boundaries.as_str()])
        {
            AssetLookup::Found(path) => path,
            AssetLookup::Missing { warning } => {
                return Ok(Panel::new(ID, QUESTION, PanelContent::Warning(warning)))
            }
        };
        let boundaries = Boundaries::from_file(&path)?;
        let figure = choropleth(
            ufs,
            &boundaries,
            &ChoroplethOptions::new("uf", "total", GeoLevel::State)
                .title("Certificados (válidos) por UF")
                .colorbar_title("Certificados"),
        )?;
        Ok(Panel::chart(ID, QUESTION, figure))
    }

    /// The aggregated download table as CSV.
    pub async fn download(&self, filters: &ResidencyFilters, date: NaiveDate) -> DashboardResult<CsvExport> {
        let fp = filters.selection().fingerprint()?;
        let table = self.run("download", self.download_query(filters)?, &fp).await?;
        tracing::info!(rows = table.num_rows(), "prepared download");
        Ok(CsvExport::from_table(&table, DOWNLOAD_STEM, date)?)
    }

    /// Distinct validated certificates under `filters`.
    pub async fn download_total(&self, filters: &ResidencyFilters) -> DashboardResult<i64> {
        let fp = filters.selection().fingerprint()?;
        let table = self
            .run("download_total", self.download_total_query(filters)?, &fp)
            .await?;
        Ok(table.int("total_validos")?.first().copied().flatten().unwrap_or(0))
    }

    /// Table-wide certificate counts, cached like the option lists.
    pub async fn baseline_counts(&self) -> DashboardResult<BaselineCounts> {
        let table = self
            .warehouse
            .fetch_options("baseline", &self.baseline_query())
            .await?
            .table;
        let first = |column: &str| -> DashboardResult<i64> {
            Ok(table.int(column)?.first().copied().flatten().unwrap_or(0))
        };
        Ok(BaselineCounts {
            valid: first("certificados_validos")?,
            invalid: first("certificados_invalidos")?,
        })
    }

    /// The methodology tiles.
    pub async fn baseline_panel(&self) -> DashboardResult<Panel> {
        let counts = self.baseline_counts().await?;
        Ok(Panel::new(
            "baseline_counts",
            "Quantos certificados a base contém?",
            PanelContent::Metrics(counts.metrics()),
        ))
    }

    /// Column dictionary of the certificates table.
    pub async fn dictionary(&self, date: NaiveDate) -> DashboardResult<CsvExport> {
        let table = self.run("dictionary", self.dictionary_query(), "").await?;
        Ok(CsvExport::schema_dictionary(&table, DICTIONARY_STEM, date)?)
    }
}

/// Distinct certificates in the whole table by validation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineCounts {
    pub valid: i64,
    pub invalid: i64,
}

impl BaselineCounts {
    pub fn metrics(&self) -> Vec<Metric> {
        vec![
            Metric::new(
                "Certificados válidos (distinct, base)",
                format::thousands(self.valid),
            ),
            Metric::new(
                "Certificados inválidos (distinct, base)",
                format::thousands(self.invalid),
            ),
        ]
    }
}

/// Metric tiles from the single-row summary. Missing values read as zero.
pub fn big_numbers(summary: &ResultTable) -> DashboardResult<Vec<Metric>> {
    let value = |column: &str| -> DashboardResult<f64> {
        Ok(summary
            .optional_numeric(column)?
            .first()
            .copied()
            .flatten()
            .unwrap_or(0.0))
    };
    let count = |label: &str, column: &str| -> DashboardResult<Metric> {
        Ok(Metric::new(label, format::thousands_f64(value(column)?)))
    };
    let average = |label: &str, column: &str| -> DashboardResult<Metric> {
        Ok(Metric::new(label, format::decimal_br(value(column)?, 2)))
    };

    Ok(vec![
        count("Certificados válidos", "cert_validos")?,
        count("Instituições (dist.)", "instituicoes_validas")?,
        count("Programas (dist.)", "programas_validos")?,
        count("Regiões (dist.)", "regioes_validas")?,
        count("UFs (dist.)", "ufs_validas")?,
        count("Médicos formados (dist.)", "medicos_formados_validos")?,
        average("Média de certificados por médico", "media_cert_por_medico")?,
        average("Média de duração (anos)", "media_duracao_anos")?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnSpec, DataType, Value};
    use crate::warehouse::MemoryWarehouse;

    fn page() -> ResidencyPage<MemoryWarehouse> {
        ResidencyPage::new(
            CachedWarehouse::uncached(MemoryWarehouse::new()),
            "escolap2p.base_siscnrm.residentes_applications",
        )
    }

    #[test]
    fn test_default_filters_clamp_to_observed() {
        let options = FilterOptions {
            start_years: (2015, 2020),
            durations: (2, 3),
            ..Default::default()
        };
        let filters = default_filters(&options);
        assert_eq!(filters.start_year, YearRange::between(2015, 2020));
        assert_eq!(filters.end_year, YearRange::between(2010, 2024));
        assert_eq!(filters.issue_year, YearRange::between(2012, 2024));
        assert_eq!(filters.duration, YearRange::between(2, 3));
        assert!(filters.program.is_all());
    }

    #[test]
    fn test_clamped_repairs_ranges() {
        let filters = ResidencyFilters {
            start_year: YearRange::between(2030, 1900),
            ..Default::default()
        };
        let clamped = filters.clamped(&FilterOptions::default());
        assert_eq!(clamped.start_year, YearRange::between(1980, 2026));
    }

    #[test]
    fn test_uf_choice_is_uppercased() {
        let filters = ResidencyFilters {
            uf: Selection::Only(" sp ".into()),
            ..Default::default()
        };
        let (clause, params) = filters.raw_selection().where_clause(Dialect::BigQuery).unwrap();
        assert_eq!(clause, "WHERE UPPER(`uf`) = @p0");
        assert_eq!(params[0].value, crate::sql::ParamValue::String("SP".into()));
    }

    #[test]
    fn test_summary_selection_keeps_null_years() {
        let filters = ResidencyFilters {
            issue_year: YearRange::between(2012, 2024),
            ..Default::default()
        };
        let (clause, _) = filters.summary_selection().where_clause(Dialect::BigQuery).unwrap();
        assert!(clause.contains("OR CAST(`certificado_emissao_ano` AS INT64) IS NULL"));
        assert!(!clause.contains("validacao_final"));
    }

    #[test]
    fn test_entries_exits_query_shape() {
        let q = page()
            .entries_exits_query(&ResidencyFilters {
                region: Selection::Only("Sul".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(q.sql.starts_with("WITH `base` AS ("));
        assert!(q.sql.contains("FULL OUTER JOIN `saidas` AS `s` ON `e`.`ano` = `s`.`ano`"));
        assert!(!q.sql.contains("validacao_final"));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn test_big_numbers_formatting() {
        let summary = ResultTable::new(
            vec![
                ColumnSpec::new("cert_validos", DataType::Int),
                ColumnSpec::new("media_cert_por_medico", DataType::Float),
                ColumnSpec::new("media_duracao_anos", DataType::Float),
            ],
            vec![vec![Value::Int(123456), Value::Float(1.256), Value::Null]],
        )
        .unwrap();
        let err = big_numbers(&summary);
        // Every tile column must be present
        assert!(err.is_err());

        let full = ResultTable::new(
            [
                "cert_validos",
                "instituicoes_validas",
                "programas_validos",
                "regioes_validas",
                "ufs_validas",
                "medicos_formados_validos",
                "media_cert_por_medico",
                "media_duracao_anos",
            ]
            .iter()
            .map(|n| ColumnSpec::new(n, DataType::Float))
            .collect(),
            vec![vec![
                Value::Int(123456),
                Value::Int(10),
                Value::Int(20),
                Value::Int(5),
                Value::Int(27),
                Value::Int(100000),
                Value::Float(1.23456),
                Value::Null,
            ]],
        )
        .unwrap();
        let metrics = big_numbers(&full).unwrap();
        assert_eq!(metrics[0], Metric::new("Certificados válidos", "123.456"));
        assert_eq!(metrics[6].value, "1,23");
        assert_eq!(metrics[7].value, "0,00");
    }
}
