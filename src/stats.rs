//! Descriptive statistics over short numeric series.
//!
//! Series are `Option<f64>` slices: `None` marks a missing period (a
//! gap-filled year, a null cell). Non-finite values are treated as missing.

use serde::{Deserialize, Serialize};

use crate::table::Group;

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|f| f.is_finite())
}

/// Arithmetic mean of the present values.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().filter_map(|v| finite(*v)).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Trailing moving average.
///
/// A point has a value only once `window` periods are available and none of
/// them is missing. A window of zero is treated as one.
pub fn moving_average(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mut sum = 0.0;
            for v in slice {
                sum += finite(*v)?;
            }
            Some(sum / window as f64)
        })
        .collect()
}

/// Ordinary-least-squares line over index positions.
///
/// Fitted on the present points and evaluated at every index. With fewer
/// than two present points the input is echoed unchanged.
pub fn linear_trend(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let points: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| finite(*v).map(|y| (i as f64, y)))
        .collect();
    if points.len() < 2 {
        return values.to_vec();
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    (0..values.len())
        .map(|i| Some(intercept + slope * i as f64))
        .collect()
}

/// Period-over-period percentage change.
///
/// The first period, and any period whose predecessor is missing or zero,
/// has no change.
pub fn pct_change(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let change = if i == 0 {
            None
        } else {
            match (finite(values[i - 1]), finite(values[i])) {
                (Some(prev), Some(cur)) if prev != 0.0 => Some((cur - prev) / prev * 100.0),
                _ => None,
            }
        };
        out.push(change);
    }
    out
}

/// Share of the total, in percent. Undefined when the total is zero.
pub fn percent_of_total(values: &[f64]) -> Vec<Option<f64>> {
    let total: f64 = values.iter().filter(|v| v.is_finite()).sum();
    values
        .iter()
        .map(|v| {
            if total == 0.0 || !v.is_finite() {
                None
            } else {
                Some(v / total * 100.0)
            }
        })
        .collect()
}

/// ABC classification by cumulative share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbcBand {
    A,
    B,
    C,
}

impl AbcBand {
    /// Band for a cumulative percentage given the A and B thresholds.
    pub fn classify(cum_pct: f64, threshold_a: f64, threshold_b: f64) -> Self {
        const EPS: f64 = 1e-9;
        if cum_pct <= threshold_a + EPS {
            AbcBand::A
        } else if cum_pct <= threshold_b + EPS {
            AbcBand::B
        } else {
            AbcBand::C
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AbcBand::A => "A",
            AbcBand::B => "B",
            AbcBand::C => "C",
        }
    }
}

/// One ranked category of a Pareto analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoRow {
    pub key: String,
    pub value: f64,
    pub pct: f64,
    pub cum_pct: f64,
    pub band: AbcBand,
}

/// Rank groups descending (ties keep input order) and compute shares,
/// cumulative shares and bands. A zero total gives zero shares.
pub fn pareto(mut groups: Vec<Group>, threshold_a: f64, threshold_b: f64) -> Vec<ParetoRow> {
    crate::table::sort_desc(&mut groups);
    let total: f64 = groups.iter().map(|g| g.value).sum();
    let mut cum = 0.0;
    groups
        .into_iter()
        .map(|g| {
            let pct = if total == 0.0 {
                0.0
            } else {
                g.value / total * 100.0
            };
            cum += pct;
            ParetoRow {
                band: AbcBand::classify(cum, threshold_a, threshold_b),
                key: g.key,
                value: g.value,
                pct,
                cum_pct: cum,
            }
        })
        .collect()
}
