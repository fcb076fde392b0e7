//! Choropleth maps by region or by state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::figure::{
    ChoroplethTrace, ColorBar, Figure, GeoLayout, Layout, Line, Margin, Marker, Title,
};
use super::ChartResult;
use crate::format;
use crate::geo::{brazil, Boundaries, GeoError};
use crate::table::{
    group_by, Aggregation, ColumnSpec, DataType, Group, ResultTable, Value, NOT_INFORMED,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoLevel {
    Region,
    State,
}

impl GeoLevel {
    /// Feature properties tried, in order, when none are configured.
    pub fn default_candidates(self) -> &'static [&'static str] {
        match self {
            GeoLevel::Region => &["NM_REGIAO", "regiao", "nome", "NOME", "name", "NAME"],
            GeoLevel::State => &[
                "SIGLA_UF", "sigla", "SIGLA", "UF", "uf", "abbrev", "NM_UF", "nome", "name",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethOptions {
    pub location_col: String,
    pub value_col: String,
    pub level: GeoLevel,
    pub title: String,
    pub colorscale: String,
    pub colorbar_title: String,
    /// Overrides [`GeoLevel::default_candidates`].
    pub candidates: Option<Vec<String>>,
    pub height: Option<u32>,
}

impl ChoroplethOptions {
    pub fn new(location_col: &str, value_col: &str, level: GeoLevel) -> Self {
        Self {
            location_col: location_col.into(),
            value_col: value_col.into(),
            level,
            title: String::new(),
            colorscale: "Blues".into(),
            colorbar_title: "Quantidade".into(),
            candidates: None,
            height: Some(620),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn colorbar_title(mut self, title: &str) -> Self {
        self.colorbar_title = title.into();
        self
    }

    pub fn candidates(mut self, candidates: &[&str]) -> Self {
        self.candidates = Some(candidates.iter().map(|c| c.to_string()).collect());
        self
    }
}

/// Sum per location, dropping rows without one.
fn located_groups(table: &ResultTable, opts: &ChoroplethOptions) -> ChartResult<Vec<Group>> {
    let groups = group_by(
        table,
        &opts.location_col,
        &Aggregation::Sum(opts.value_col.clone()),
    )?;
    Ok(groups.into_iter().filter(|g| g.key != NOT_INFORMED).collect())
}

/// Shade each boundary feature by the summed value of its key.
///
/// State keys may be abbreviations or names; they are matched against the
/// boundary file by abbreviation first and by name second. A key that no
/// candidate property can match fails the whole chart.
pub fn choropleth(
    table: &ResultTable,
    boundaries: &Boundaries,
    opts: &ChoroplethOptions,
) -> ChartResult<Figure> {
    let groups = located_groups(table, opts)?;
    if groups.is_empty() {
        return Ok(Figure::no_data(&opts.title));
    }

    let owned: Vec<&str>;
    let candidates: &[&str] = match &opts.candidates {
        Some(list) => {
            owned = list.iter().map(String::as_str).collect();
            &owned
        }
        None => opts.level.default_candidates(),
    };

    let (labels, key) = match opts.level {
        GeoLevel::State => {
            let states = groups
                .iter()
                .map(|g| brazil::normalize_uf(&g.key))
                .collect::<Result<Vec<_>, GeoError>>()?;
            let abbrevs: Vec<&str> = states.iter().map(|s| s.abbrev).collect();
            let names: Vec<&str> = states.iter().map(|s| s.name).collect();
            let key = boundaries
                .resolve_key(abbrevs.as_slice(), candidates)
                .or_else(|_| boundaries.resolve_key(names.as_slice(), candidates))?;
            let labels: Vec<String> = states
                .iter()
                .map(|s| format!("{} ({})", s.name, s.abbrev))
                .collect();
            (labels, key)
        }
        GeoLevel::Region => {
            let regions = groups
                .iter()
                .map(|g| brazil::normalize_region(&g.key))
                .collect::<Result<Vec<_>, GeoError>>()?;
            let key = boundaries.resolve_key(regions.as_slice(), candidates)?;
            (regions.iter().map(|r| r.to_string()).collect(), key)
        }
    };
    tracing::debug!(
        level = ?opts.level,
        property = %key.property,
        locations = key.locations.len(),
        "building choropleth"
    );

    let mut fig = Figure::new(&opts.title);
    fig.push(ChoroplethTrace {
        geojson: boundaries.document().clone(),
        featureidkey: key.featureidkey(),
        locations: key.locations,
        z: groups.iter().map(|g| g.value).collect(),
        text: Some(
            labels
                .iter()
                .zip(&groups)
                .map(|(l, g)| format!("{}: {}", l, format::thousands_f64(g.value)))
                .collect(),
        ),
        colorscale: Some(opts.colorscale.clone()),
        colorbar: Some(ColorBar {
            title: Some(opts.colorbar_title.clone()),
            ..Default::default()
        }),
        marker: Some(Marker {
            line: Some(Line::solid("white", 0.5)),
            ..Default::default()
        }),
        hovertemplate: Some("%{text}<extra></extra>".into()),
    });
    fig.layout = Layout {
        title: Some(Title::centered(&opts.title)),
        height: opts.height,
        margin: Some(Margin::new(0, 0, 60, 0)),
        geo: Some(GeoLayout {
            fitbounds: "locations".into(),
            visible: false,
        }),
        ..Default::default()
    };
    Ok(fig)
}

/// Roll per-state values up to macro-regions.
///
/// Output columns are `regiao` and `value_col`, in north-to-south region
/// order, with regions absent from the input omitted.
pub fn aggregate_states_to_regions(
    table: &ResultTable,
    uf_col: &str,
    value_col: &str,
) -> ChartResult<ResultTable> {
    let groups = group_by(table, uf_col, &Aggregation::Sum(value_col.to_string()))?;
    let mut sums: HashMap<&'static str, f64> = HashMap::new();
    for g in groups.iter().filter(|g| g.key != NOT_INFORMED) {
        *sums.entry(brazil::region_of(&g.key)?).or_insert(0.0) += g.value;
    }

    let rows = brazil::REGIONS
        .iter()
        .filter_map(|r| {
            sums.get(r)
                .map(|v| vec![Value::String(r.to_string()), Value::Float(*v)])
        })
        .collect();
    Ok(ResultTable::new(
        vec![
            ColumnSpec::new("regiao", DataType::String),
            ColumnSpec::new(value_col, DataType::Float),
        ],
        rows,
    )?)
}
