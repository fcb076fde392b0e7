//! Healthpanel CLI - Inspect page queries, build charts, render pages
//!
//! Usage:
//!   healthpanel sql [--filters <filters.json>] [--dialect <dialect>]
//!   healthpanel chart <kind> --csv <file.csv> --x <col> --y <col> [--z <col>]
//!   healthpanel render [--filters <filters.json>]
//!   healthpanel cache <stats|clear|purge>
//!
//! Examples:
//!   healthpanel sql --filters filters.json --dialect duckdb
//!   healthpanel chart pareto --csv uf.csv --x uf --y total --title "Por UF"
//!   healthpanel chart choropleth --csv uf.csv --x uf --y total --boundaries assets/br_states.json
//!   healthpanel render --config healthpanel.toml > panels.json

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use healthpanel::cache::ResultCache;
use healthpanel::chart::{
    bar_total_by_group, bar_yoy_trend, choropleth, entries_exits_by_year, heatmap_absolute,
    pareto_barh, pie_standard, ChartKind, ChoroplethOptions, Figure, FlowOptions, GeoLevel,
    GroupBarOptions, HeatmapOptions, ParetoOptions, PieOptions, TrendOptions,
};
use healthpanel::config::{credentials, Settings};
use healthpanel::dashboard::residency::default_filters;
use healthpanel::dashboard::{AssetLookup, ResidencyFilters, ResidencyPage};
use healthpanel::geo::Boundaries;
use healthpanel::sql::Dialect;
use healthpanel::table::ResultTable;
use healthpanel::warehouse::{BridgeWarehouse, CachedWarehouse, MemoryWarehouse};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthpanel")]
#[command(about = "Healthpanel - Filtered warehouse queries and chart specifications")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to HEALTHPANEL_CONFIG, then ./healthpanel.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every page query with its parameters
    Sql {
        /// JSON file with the filter choices
        #[arg(short, long)]
        filters: Option<PathBuf>,

        /// SQL dialect to generate (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<DialectArg>,
    },

    /// Build one chart from a CSV file and print its figure JSON
    Chart {
        kind: ChartArg,

        /// Input CSV with a header row
        #[arg(long)]
        csv: PathBuf,

        /// Category, year, or row column
        #[arg(long)]
        x: String,

        /// Value column (entries column for `flow`)
        #[arg(long)]
        y: String,

        /// Heatmap value column, or exits column for `flow`
        #[arg(long)]
        z: Option<String>,

        #[arg(long, default_value = "")]
        title: String,

        /// GeoJSON boundary file for `choropleth`
        #[arg(long)]
        boundaries: Option<PathBuf>,

        /// Boundary level for `choropleth`
        #[arg(long, default_value = "state")]
        level: LevelArg,
    },

    /// Render the residency page through the warehouse bridge
    Render {
        /// JSON file with the filter choices (defaults to the initial widget state)
        #[arg(short, long)]
        filters: Option<PathBuf>,
    },

    /// Inspect or maintain the result cache
    Cache {
        action: CacheAction,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Bigquery,
    Duckdb,
    Postgres,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Bigquery => Dialect::BigQuery,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Postgres => Dialect::Postgres,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum ChartArg {
    Pareto,
    Trend,
    Pie,
    Bar,
    Heatmap,
    Flow,
    Choropleth,
}

impl From<ChartArg> for ChartKind {
    fn from(arg: ChartArg) -> Self {
        match arg {
            ChartArg::Pareto => ChartKind::Pareto,
            ChartArg::Trend => ChartKind::Trend,
            ChartArg::Pie => ChartKind::Pie,
            ChartArg::Bar => ChartKind::Bar,
            ChartArg::Heatmap => ChartKind::Heatmap,
            ChartArg::Flow => ChartKind::Flow,
            ChartArg::Choropleth => ChartKind::Choropleth,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum LevelArg {
    State,
    Region,
}

#[derive(Clone, ValueEnum)]
enum CacheAction {
    /// Entry count, size and age range
    Stats,
    /// Delete every entry
    Clear,
    /// Delete entries older than the configured TTL
    Purge,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Sql { filters, dialect } => cmd_sql(&settings, filters, dialect),
        Commands::Chart {
            kind,
            csv,
            x,
            y,
            z,
            title,
            boundaries,
            level,
        } => cmd_chart(
            kind.into(),
            &csv,
            ChartColumns { x, y, z },
            &title,
            boundaries.as_deref(),
            level,
        ),
        Commands::Render { filters } => cmd_render(&settings, filters),
        Commands::Cache { action } => cmd_cache(&settings, action),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, healthpanel::config::SettingsError> {
    match path {
        Some(p) => Settings::from_file(p),
        None => Settings::load(),
    }
}

fn read_filters(path: Option<PathBuf>) -> Result<Option<ResidencyFilters>, String> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = fs::read_to_string(&path)
        .map_err(|e| format!("Error reading filters '{}': {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| format!("Invalid filters in '{}': {}", path.display(), e))
}

fn cmd_sql(settings: &Settings, filters: Option<PathBuf>, dialect: Option<DialectArg>) -> ExitCode {
    let filters = match read_filters(filters) {
        Ok(f) => f.unwrap_or_default(),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let dialect = dialect.map(Dialect::from).unwrap_or(settings.warehouse.dialect);

    // Query building never touches the warehouse
    let page = ResidencyPage::new(
        CachedWarehouse::uncached(MemoryWarehouse::new()),
        &settings.warehouse.table,
    )
    .with_dialect(dialect);

    match page.queries(&filters) {
        Ok(queries) => {
            for (name, query) in queries {
                println!("-- {}", name);
                println!("{}", query);
            }
            println!("-- baseline");
            println!("{}", page.baseline_query());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error building queries: {}", e);
            ExitCode::FAILURE
        }
    }
}

struct ChartColumns {
    x: String,
    y: String,
    z: Option<String>,
}

fn cmd_chart(
    kind: ChartKind,
    csv: &Path,
    cols: ChartColumns,
    title: &str,
    boundaries: Option<&Path>,
    level: LevelArg,
) -> ExitCode {
    let table = match fs::File::open(csv)
        .map_err(|e| e.to_string())
        .and_then(|f| ResultTable::from_csv_reader(f).map_err(|e| e.to_string()))
    {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error reading CSV '{}': {}", csv.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match build_chart(kind, &table, &cols, title, boundaries, level) {
        Ok(figure) => match serde_json::to_string_pretty(&figure) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing figure: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Chart error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_chart(
    kind: ChartKind,
    table: &ResultTable,
    cols: &ChartColumns,
    title: &str,
    boundaries: Option<&Path>,
    level: LevelArg,
) -> Result<Figure, String> {
    let third = |what: &str| {
        cols.z
            .clone()
            .ok_or_else(|| format!("--z is required for {} charts", what))
    };
    let (x, y) = (cols.x.as_str(), cols.y.as_str());

    let figure = match kind {
        ChartKind::Pareto => pareto_barh(table, &ParetoOptions::sum(x, y).title(title)),
        ChartKind::Trend => bar_yoy_trend(table, &TrendOptions::new(x, y).title(title)),
        ChartKind::Pie => pie_standard(table, &PieOptions::new(x, y).title(title)),
        ChartKind::Bar => bar_total_by_group(table, &GroupBarOptions::new(x, y).title(title)),
        ChartKind::Heatmap => {
            heatmap_absolute(table, &HeatmapOptions::new(x, y, &third("heatmap")?).title(title))
        }
        ChartKind::Flow => {
            entries_exits_by_year(table, &FlowOptions::new(x, y, &third("flow")?).title(title))
        }
        ChartKind::Choropleth => {
            let path = boundaries.ok_or("--boundaries is required for choropleth charts")?;
            let boundaries = Boundaries::from_file(path).map_err(|e| e.to_string())?;
            let level = match level {
                LevelArg::State => GeoLevel::State,
                LevelArg::Region => GeoLevel::Region,
            };
            choropleth(table, &boundaries, &ChoroplethOptions::new(x, y, level).title(title))
        }
    };
    figure.map_err(|e| e.to_string())
}

fn open_cache(settings: &Settings) -> Result<ResultCache, String> {
    let path = settings.cache.resolved_path().map_err(|e| e.to_string())?;
    ResultCache::open(path.as_deref()).map_err(|e| e.to_string())
}

fn cmd_render(settings: &Settings, filters: Option<PathBuf>) -> ExitCode {
    let filters = match read_filters(filters) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(render(settings, filters)) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Render failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn render(settings: &Settings, filters: Option<ResidencyFilters>) -> Result<String, String> {
    if let Some(path) =
        credentials::materialize_from_settings(&settings.credentials).map_err(|e| e.to_string())?
    {
        tracing::info!(path = %path.display(), "using service account key file");
    }

    let bridge = BridgeWarehouse::spawn_with_settings(settings)
        .await
        .map_err(|e| e.to_string())?;
    let warehouse = if settings.cache.enabled {
        CachedWarehouse::new(
            bridge,
            Arc::new(open_cache(settings)?),
            settings.cache.ttl(),
            settings.cache.options_ttl(),
        )
    } else {
        CachedWarehouse::uncached(bridge)
    };
    let page = ResidencyPage::from_settings(warehouse, settings).map_err(|e| e.to_string())?;

    if let AssetLookup::Missing { warning } = page.logo() {
        eprintln!("{}", warning);
    }

    let filters = match filters {
        Some(f) => f,
        None => default_filters(&page.load_options().await.map_err(|e| e.to_string())?),
    };
    let panels = page.render(&filters).await.map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&panels).map_err(|e| e.to_string())
}

fn cmd_cache(settings: &Settings, action: CacheAction) -> ExitCode {
    let cache = match open_cache(settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error opening cache: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match action {
        CacheAction::Stats => cache.stats().map(|stats| {
            println!("Entries: {}", stats.entry_count);
            println!("Size:    {} bytes", stats.total_size_bytes);
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                println!("Oldest:  {}", oldest.to_rfc3339());
                println!("Newest:  {}", newest.to_rfc3339());
            }
        }),
        CacheAction::Clear => cache.clear().map(|n| println!("Removed {} entries", n)),
        CacheAction::Purge => cache
            .purge_expired(settings.cache.ttl())
            .map(|n| println!("Purged {} expired entries", n)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Cache error: {}", e);
            ExitCode::FAILURE
        }
    }
}
