//! Plotly-compatible figure specification.
//!
//! Only the attributes the builders set are modelled. Every optional field
//! is omitted from the JSON when unset so the front end's defaults apply.

use serde::Serialize;

/// Message shown by the placeholder figure.
pub const NO_DATA_MESSAGE: &str = "Sem dados para os filtros atuais.";

/// A complete chart: traces plus layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(title: &str) -> Self {
        Self {
            data: Vec::new(),
            layout: Layout {
                title: Some(Title::centered(title)),
                ..Default::default()
            },
        }
    }

    /// Explicit "no data" placeholder: no traces, hidden axes, one
    /// centered annotation.
    pub fn no_data(title: &str) -> Self {
        let hidden = Axis {
            visible: Some(false),
            ..Default::default()
        };
        Self {
            data: Vec::new(),
            layout: Layout {
                title: Some(Title::centered(title)),
                xaxis: Some(hidden.clone()),
                yaxis: Some(hidden),
                annotations: vec![Annotation {
                    x: Coord::Num(0.5),
                    y: Coord::Num(0.5),
                    xref: Some("paper".into()),
                    yref: Some("paper".into()),
                    text: NO_DATA_MESSAGE.into(),
                    showarrow: false,
                    font: Some(Font::sized(16).with_color("#64748B")),
                    ..Default::default()
                }],
                ..Default::default()
            },
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.data.is_empty()
            && self
                .layout
                .annotations
                .iter()
                .any(|a| a.text == NO_DATA_MESSAGE)
    }

    pub fn push(&mut self, trace: impl Into<Trace>) {
        self.data.push(trace.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.layout.title.as_ref().map(|t| t.text.as_str())
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// =============================================================================
// Data arrays
// =============================================================================

/// An axis data array: numbers (missing as `null`) or category labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Numbers(Vec<Option<f64>>),
    Labels(Vec<String>),
}

impl Default for Series {
    fn default() -> Self {
        Series::Numbers(Vec::new())
    }
}

impl Series {
    pub fn numbers(values: impl IntoIterator<Item = f64>) -> Self {
        Series::Numbers(values.into_iter().map(Some).collect())
    }

    pub fn labels<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Series::Labels(values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Series::Numbers(v) => v.len(),
            Series::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One entry of a per-point colour array: a colour-scale position or a
/// CSS colour overriding the scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColorValue {
    Scale(f64),
    Css(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Color {
    Single(String),
    Each(Vec<ColorValue>),
}

/// A position that may be numeric or categorical.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coord {
    Num(f64),
    Cat(String),
}

impl Default for Coord {
    fn default() -> Self {
        Coord::Num(0.0)
    }
}

// =============================================================================
// Styling
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Font {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Font {
    pub fn sized(size: u32) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_family(mut self, family: &str) -> Self {
        self.family = Some(family.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
}

impl Line {
    pub fn solid(color: &str, width: f64) -> Self {
        Self {
            color: Some(color.into()),
            width: Some(width),
            ..Default::default()
        }
    }

    pub fn dashed(color: &str, width: f64) -> Self {
        Self {
            dash: Some("dash".into()),
            ..Self::solid(color, width)
        }
    }

    pub fn invisible() -> Self {
        Self {
            width: Some(0.0),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ColorBar {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xanchor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    /// Pie slice colours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<ColorBar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showscale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

// =============================================================================
// Traces
// =============================================================================

/// A single trace, tagged with its Plotly `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar(BarTrace),
    Scatter(ScatterTrace),
    Pie(PieTrace),
    Heatmap(HeatmapTrace),
    Choropleth(ChoroplethTrace),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BarTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Series,
    pub y: Series,
    /// `"h"` for horizontal bars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScatterTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Series,
    pub y: Series,
    /// e.g. `"lines"`, `"lines+markers+text"`
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<String>,
    /// Secondary axis reference, e.g. `"x2"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliponaxis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectgaps: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PieTrace {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textinfo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HeatmapTrace {
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub z: Vec<Vec<Option<f64>>>,
    pub text: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texttemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<ColorBar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xgap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ygap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChoroplethTrace {
    /// The boundary document the locations refer to.
    pub geojson: serde_json::Value,
    /// `properties.<name>`
    pub featureidkey: String,
    pub locations: Vec<String>,
    pub z: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorscale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colorbar: Option<ColorBar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<String>,
}

macro_rules! impl_into_trace {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Trace {
            fn from(t: $ty) -> Self {
                Trace::$variant(t)
            }
        })*
    };
}

impl_into_trace!(
    BarTrace => Bar,
    ScatterTrace => Scatter,
    PieTrace => Pie,
    HeatmapTrace => Heatmap,
    ChoroplethTrace => Choropleth,
);

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Title {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
}

impl Title {
    pub fn centered(text: &str) -> Self {
        Self {
            text: text.into(),
            x: Some(0.5),
            font: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AxisTitle {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
}

impl AxisTitle {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.into(),
            font: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<AxisTitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub axis_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    /// `"reversed"` for top-to-bottom category axes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtick: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticksuffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickfont: Option<Font>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showgrid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gridcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zeroline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickvals: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticktext: Option<Vec<String>>,
}

impl Axis {
    pub fn titled(text: &str) -> Self {
        Self {
            title: Some(AxisTitle::new(text)),
            ..Default::default()
        }
    }

    /// Integer year ticks with no thousands separators or halves.
    pub fn years(text: &str) -> Self {
        Self {
            axis_type: Some("linear".into()),
            dtick: Some(1.0),
            ..Self::titled(text)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

impl Margin {
    pub fn new(l: u32, r: u32, t: u32, b: u32) -> Self {
        Self { l, r, t, b }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Legend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xanchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yanchor: Option<String>,
}

/// Where a chart's legend sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendPosition {
    #[default]
    Right,
    Top,
    BelowTitle,
    Bottom,
}

impl LegendPosition {
    pub fn legend(self) -> Legend {
        let horizontal = |y: f64, yanchor: &str| Legend {
            orientation: Some("h".into()),
            x: Some(0.5),
            xanchor: Some("center".into()),
            y: Some(y),
            yanchor: Some(yanchor.into()),
        };
        match self {
            LegendPosition::Right => Legend {
                orientation: Some("v".into()),
                ..Default::default()
            },
            LegendPosition::Top => horizontal(1.12, "bottom"),
            LegendPosition::BelowTitle => horizontal(1.02, "bottom"),
            LegendPosition::Bottom => horizontal(-0.2, "top"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Shape {
    /// `"line"` or `"rect"`
    #[serde(rename = "type")]
    pub shape_type: String,
    pub xref: String,
    pub yref: String,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fillcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Annotation {
    pub x: Coord,
    pub y: Coord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yref: Option<String>,
    pub text: String,
    pub showarrow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xanchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yanchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yshift: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GeoLayout {
    pub fitbounds: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_bgcolor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis2: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bargap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showlegend: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoLayout>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<Shape>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder() {
        let fig = Figure::no_data("Certificados por ano");
        assert!(fig.is_placeholder());
        assert_eq!(fig.title(), Some("Certificados por ano"));

        let v = fig.to_value().unwrap();
        assert_eq!(v["data"], json!([]));
        assert_eq!(v["layout"]["xaxis"], json!({"visible": false}));
        assert_eq!(
            v["layout"]["annotations"][0]["text"],
            json!("Sem dados para os filtros atuais.")
        );
    }

    #[test]
    fn test_trace_type_tag_and_omitted_fields() {
        let mut fig = Figure::new("t");
        fig.push(BarTrace {
            x: Series::labels(["a", "b"]),
            y: Series::Numbers(vec![Some(1.0), None]),
            ..Default::default()
        });
        assert!(!fig.is_placeholder());
        let v = fig.to_value().unwrap();
        assert_eq!(
            v["data"][0],
            json!({"type": "bar", "x": ["a", "b"], "y": [1.0, null]})
        );
    }

    #[test]
    fn test_mixed_colour_array() {
        let color = Color::Each(vec![ColorValue::Scale(3.0), ColorValue::Css("crimson".into())]);
        assert_eq!(serde_json::to_value(color).unwrap(), json!([3.0, "crimson"]));
    }
}
