//! Filter fields and WHERE-clause construction.

use serde::{Deserialize, Serialize};

use super::selection::{Selection, YearRange};
use super::{FilterError, FilterResult};
use crate::cache::compute_hash;
use crate::sql::{col, lower_trim, Dialect, Expr, ExprExt, ParamBinder, ParamValue, QueryParam};

/// How categorical values compare against the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Match {
    #[default]
    Exact,
    /// `LOWER(TRIM(column)) = lower(trim(value))`
    CaseInsensitive,
}

/// Whether rows with a NULL column survive a range restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    #[default]
    Exclude,
    Include,
}

/// One restrictable column.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterField {
    /// Stable name, used in the fingerprint and in error messages.
    pub name: String,
    pub column: Expr,
    pub matching: Match,
    pub nulls: NullPolicy,
}

impl FilterField {
    /// A field over the column of the same name.
    pub fn column(name: &str) -> Self {
        Self::new(name, col(name))
    }

    pub fn new(name: &str, column: Expr) -> Self {
        Self {
            name: name.to_string(),
            column,
            matching: Match::Exact,
            nulls: NullPolicy::Exclude,
        }
    }

    pub fn case_insensitive(mut self) -> Self {
        self.matching = Match::CaseInsensitive;
        self
    }

    pub fn include_nulls(mut self) -> Self {
        self.nulls = NullPolicy::Include;
        self
    }

    fn compared_column(&self) -> Expr {
        match self.matching {
            Match::Exact => self.column.clone(),
            Match::CaseInsensitive => lower_trim(self.column.clone()),
        }
    }

    fn compared_value(&self, value: &str) -> String {
        match self.matching {
            Match::Exact => value.to_string(),
            Match::CaseInsensitive => value.trim().to_lowercase(),
        }
    }
}

/// The value chosen for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    /// Single-select; `All` imposes nothing.
    Choice(Selection<String>),
    /// Multi-select; an empty list imposes nothing.
    AnyOf(Vec<String>),
    /// Inclusive range; missing bounds impose nothing on that side.
    Range(YearRange),
    /// Equality against a typed value.
    Equals(ParamValue),
}

/// An ordered set of restrictions plus constant base predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    base: Vec<Expr>,
    fields: Vec<(FilterField, FilterValue)>,
}

#[derive(Serialize)]
struct CanonicalField<'a> {
    name: &'a str,
    column: String,
    matching: Match,
    nulls: NullPolicy,
    value: &'a FilterValue,
}

#[derive(Serialize)]
struct CanonicalSelection<'a> {
    base: Vec<String>,
    fields: Vec<CanonicalField<'a>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant predicate that applies regardless of user choices.
    /// Base predicates must only contain trusted literals.
    pub fn with_base(mut self, predicate: Expr) -> Self {
        self.base.push(predicate);
        self
    }

    pub fn with(mut self, field: FilterField, value: FilterValue) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: FilterField, value: FilterValue) {
        self.fields.push((field, value));
    }

    pub fn fields(&self) -> &[(FilterField, FilterValue)] {
        &self.fields
    }

    /// Build the conjunctive predicate, registering values with `binder`.
    ///
    /// Returns `None` when nothing restricts the rows.
    pub fn predicate(&self, binder: &mut ParamBinder) -> FilterResult<Option<Expr>> {
        let mut parts: Vec<Expr> = self.base.clone();
        for (field, value) in &self.fields {
            if let Some(expr) = restriction(field, value, binder)? {
                parts.push(expr);
            }
        }
        Ok(Expr::conjunction(parts))
    }

    /// Render `WHERE …` (or an empty string) with its parameters.
    pub fn where_clause(&self, dialect: Dialect) -> FilterResult<(String, Vec<QueryParam>)> {
        let mut binder = ParamBinder::new();
        let clause = match self.predicate(&mut binder)? {
            Some(expr) => format!("WHERE {}", expr.to_sql(dialect)),
            None => String::new(),
        };
        Ok((clause, binder.into_params()))
    }

    /// SHA-256 of the canonical JSON of this selection. Equal selections
    /// produce equal fingerprints; it is the filter component of cache keys.
    pub fn fingerprint(&self) -> FilterResult<String> {
        let canonical = CanonicalSelection {
            base: self
                .base
                .iter()
                .map(|e| e.to_sql(Dialect::BigQuery))
                .collect(),
            fields: self
                .fields
                .iter()
                .map(|(f, v)| CanonicalField {
                    name: &f.name,
                    column: f.column.to_sql(Dialect::BigQuery),
                    matching: f.matching,
                    nulls: f.nulls,
                    value: v,
                })
                .collect(),
        };
        Ok(compute_hash(&canonical)?)
    }
}

fn restriction(
    field: &FilterField,
    value: &FilterValue,
    binder: &mut ParamBinder,
) -> FilterResult<Option<Expr>> {
    let expr = match value {
        FilterValue::Choice(Selection::All) => None,
        FilterValue::Choice(Selection::Only(v)) => {
            let p = binder.bind_str(&field.compared_value(v));
            Some(field.compared_column().eq(p))
        }
        FilterValue::AnyOf(values) if values.is_empty() => None,
        FilterValue::AnyOf(values) => {
            let params = values
                .iter()
                .map(|v| binder.bind_str(&field.compared_value(v)))
                .collect();
            Some(field.compared_column().in_list(params))
        }
        FilterValue::Range(range) => range_restriction(field, range, binder)?,
        FilterValue::Equals(v) => {
            if let ParamValue::Float64(f) = v {
                if !f.is_finite() {
                    return Err(FilterError::NonFinite {
                        field: field.name.clone(),
                    });
                }
            }
            let p = binder.bind(v.clone());
            Some(field.column.clone().eq(p))
        }
    };
    Ok(expr)
}

fn range_restriction(
    field: &FilterField,
    range: &YearRange,
    binder: &mut ParamBinder,
) -> FilterResult<Option<Expr>> {
    let column = field.column.clone();
    let cond = match (range.start, range.end) {
        (None, None) => return Ok(None),
        (Some(start), Some(end)) if start > end => {
            return Err(FilterError::InvertedRange {
                field: field.name.clone(),
                start,
                end,
            })
        }
        (Some(start), Some(end)) => {
            let lo = binder.bind_int(start);
            let hi = binder.bind_int(end);
            column.clone().between(lo, hi)
        }
        (Some(start), None) => column.clone().gte(binder.bind_int(start)),
        (None, Some(end)) => column.clone().lte(binder.bind_int(end)),
    };
    Ok(Some(match field.nulls {
        NullPolicy::Exclude => cond,
        NullPolicy::Include => cond.or(column.is_null()).paren(),
    }))
}
