//! User-facing selection values: categorical choices and year ranges.

use serde::{Deserialize, Serialize};

/// Choice labels that mean "no restriction".
pub const ALL_SENTINELS: &[&str] = &["(Todos)", "(Todas)", "(Ambos)", "Todos", "Todas", "Ambos"];

/// A single categorical choice, or no restriction at all.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Selection<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v),
        }
    }
}

impl Selection<String> {
    /// Interpret a widget label. Sentinels and blank labels mean [`Selection::All`].
    pub fn parse_choice(label: &str) -> Self {
        let trimmed = label.trim();
        if trimmed.is_empty() || ALL_SENTINELS.contains(&trimmed) {
            Selection::All
        } else {
            Selection::Only(trimmed.to_string())
        }
    }
}

impl<T> From<Option<T>> for Selection<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Selection::Only(v),
            None => Selection::All,
        }
    }
}

/// Inclusive integer range with optional bounds (years, durations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct YearRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl YearRange {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }

    pub fn between(start: i64, end: i64) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// A range with no bounds: no restriction.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, value: i64) -> bool {
        self.start.map_or(true, |s| value >= s) && self.end.map_or(true, |e| value <= e)
    }

    /// Repair a range against the observed `(min, max)` of the data.
    ///
    /// Inverted bounds are swapped, then each bound is clamped into the
    /// observed interval. An inverted observed interval is swapped too.
    pub fn clamp_to(self, observed: (i64, i64)) -> Self {
        let (lo, hi) = ordered(observed.0, observed.1);
        let (start, end) = match (self.start, self.end) {
            (Some(s), Some(e)) if s > e => (Some(e), Some(s)),
            other => other,
        };
        let clamped = Self {
            start: start.map(|s| s.clamp(lo, hi)),
            end: end.map(|e| e.clamp(lo, hi)),
        };
        if clamped != self {
            tracing::debug!(
                from = ?self,
                to = ?clamped,
                observed_min = lo,
                observed_max = hi,
                "clamped filter range"
            );
        }
        clamped
    }

    /// Slider default: the preferred window intersected with the observed
    /// bounds. Falls back to the full observed range when they do not overlap.
    pub fn default_window(observed: (i64, i64), preferred: (i64, i64)) -> Self {
        let (lo, hi) = ordered(observed.0, observed.1);
        let (p_lo, p_hi) = ordered(preferred.0, preferred.1);
        let start = p_lo.max(lo);
        let end = p_hi.min(hi);
        if start > end {
            Self::between(lo, hi)
        } else {
            Self::between(start, end)
        }
    }
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
