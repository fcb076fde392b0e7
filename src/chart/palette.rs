//! Colours shared by the builders.

pub const TITLE: &str = "#1f2c56";
pub const GRID: &str = "rgba(0,0,0,0.08)";
pub const BACKGROUND: &str = "white";

pub const PRIMARY: &str = "rgb(19, 93, 171)";
pub const SECONDARY: &str = "rgb(0, 176, 239)";
pub const ACCENT: &str = "rgb(0, 161, 178)";

pub const MEAN_LINE: &str = "#F59E0B";
pub const MOVING_AVERAGE: &str = "#10B981";
pub const TREND_LINE: &str = "#EF4444";
pub const NET_LINE: &str = "#111827";

pub const OTHERS: &str = "#CBD5E1";

/// Pareto ABC band fills.
pub const BAND_A: &str = "rgba(46, 204, 113, 0.18)";
pub const BAND_B: &str = "rgba(243, 156, 18, 0.18)";
pub const BAND_C: &str = "rgba(231, 76, 60, 0.16)";
pub const BAND_LABEL: &str = "rgba(0,0,0,0.6)";

/// Cycle for categorical traces without an explicit colour map.
pub const CATEGORICAL: &[&str] = &[
    "#2563EB", "#F97316", "#10B981", "#A855F7", "#EF4444", "#14B8A6", "#EAB308", "#64748B",
];

/// Colours for the inferred-sex breakdown.
pub const SEX: &[(&str, &str)] = &[
    ("masculino", "#60A5FA"),
    ("feminino", "#F87171"),
    ("(não informado)", "#94A3B8"),
];

pub fn categorical(i: usize) -> &'static str {
    CATEGORICAL[i % CATEGORICAL.len()]
}
