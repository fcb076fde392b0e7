//! Bound query parameters.
//!
//! User-facing filter values never become SQL text. The filter translator
//! registers each value with a [`ParamBinder`], receives an [`Expr::Param`]
//! placeholder, and the warehouse receives the values alongside the SQL.

use serde::{Deserialize, Serialize};

use super::dialect::Dialect;
use super::expr::Expr;
use super::query::Query;

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParamValue {
    String(String),
    Int64(i64),
    Float64(f64),
    Bool(bool),
}

impl ParamValue {
    /// Type name as BigQuery's query-parameter API expects it.
    pub fn bigquery_type(&self) -> &'static str {
        match self {
            ParamValue::String(_) => "STRING",
            ParamValue::Int64(_) => "INT64",
            ParamValue::Float64(_) => "FLOAT64",
            ParamValue::Bool(_) => "BOOL",
        }
    }

    /// JSON representation sent over the bridge protocol.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::String(s) => serde_json::Value::String(s.clone()),
            ParamValue::Int64(n) => serde_json::Value::from(*n),
            ParamValue::Float64(f) => serde_json::Value::from(*f),
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

/// A named, positioned query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    /// 1-based position, used by positional-placeholder dialects.
    pub position: usize,
    pub value: ParamValue,
}

/// Hands out parameter names in binding order.
#[derive(Debug, Clone, Default)]
pub struct ParamBinder {
    params: Vec<QueryParam>,
}

impl ParamBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value and return the placeholder expression for it.
    pub fn bind(&mut self, value: ParamValue) -> Expr {
        let position = self.params.len() + 1;
        let name = format!("p{}", position - 1);
        self.params.push(QueryParam {
            name: name.clone(),
            position,
            value,
        });
        Expr::Param { name, position }
    }

    pub fn bind_str(&mut self, value: &str) -> Expr {
        self.bind(ParamValue::String(value.to_string()))
    }

    pub fn bind_int(&mut self, value: i64) -> Expr {
        self.bind(ParamValue::Int64(value))
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_params(self) -> Vec<QueryParam> {
        self.params
    }
}

/// SQL text plus the parameter values it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
    pub dialect: Dialect,
}

impl BoundQuery {
    /// Render a query built against `binder` for `dialect`.
    pub fn new(query: &Query, binder: ParamBinder, dialect: Dialect) -> Self {
        Self {
            sql: query.to_sql(dialect),
            params: binder.into_params(),
            dialect,
        }
    }

    /// Look up a parameter value by name.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

impl std::fmt::Display for BoundQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.sql)?;
        for p in &self.params {
            writeln!(
                f,
                "-- {} ({}) = {}",
                p.name,
                p.value.bigquery_type(),
                p.value.to_json()
            )?;
        }
        Ok(())
    }
}
