//! Protocol types for bridge communication.
//!
//! One JSON object per line in each direction. Requests carry an `id` the
//! bridge echoes back, so responses may arrive out of order.

use serde::{Deserialize, Serialize};

use crate::sql::{ParamValue, QueryParam};
use crate::table::WireColumn;

// ============================================================================
// Request/Response Envelope
// ============================================================================

/// Request envelope sent to the bridge.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    /// Method name (e.g., "query.execute").
    pub method: String,
    /// Method-specific parameters.
    pub params: serde_json::Value,
}

/// Response envelope received from the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to.
    pub id: String,
    /// Whether the request succeeded.
    pub success: bool,
    /// Result data (present if success = true).
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error information (present if success = false).
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Error information in a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

// ============================================================================
// query.execute
// ============================================================================

/// A query parameter in the shape BigQuery's API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireParam {
    pub name: String,
    /// `STRING`, `INT64`, `FLOAT64` or `BOOL`.
    #[serde(rename = "type")]
    pub param_type: &'static str,
    pub value: serde_json::Value,
}

impl From<&QueryParam> for WireParam {
    fn from(p: &QueryParam) -> Self {
        Self {
            name: p.name.clone(),
            param_type: p.value.bigquery_type(),
            value: p.value.to_json(),
        }
    }
}

impl WireParam {
    pub fn value(&self) -> Option<ParamValue> {
        match (self.param_type, &self.value) {
            ("STRING", serde_json::Value::String(s)) => Some(ParamValue::String(s.clone())),
            ("INT64", v) => v.as_i64().map(ParamValue::Int64),
            ("FLOAT64", v) => v.as_f64().map(ParamValue::Float64),
            ("BOOL", v) => v.as_bool().map(ParamValue::Bool),
            _ => None,
        }
    }
}

/// Parameters for `query.execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteQueryParams {
    pub sql: String,
    pub params: Vec<WireParam>,
    pub project: String,
    pub location: String,
    pub timeout_seconds: u64,
}

/// Response from `query.execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteQueryResponse {
    pub columns: Vec<WireColumn>,
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub row_count: Option<u64>,
    #[serde(default)]
    pub bytes_processed: Option<u64>,
}

/// Response from `bridge.ping`.
#[derive(Debug, Clone, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub version: Option<String>,
}

// ============================================================================
// Method Names
// ============================================================================

/// Bridge method names.
pub mod methods {
    pub const EXECUTE_QUERY: &str = "query.execute";
    pub const PING: &str = "bridge.ping";
}

/// Error codes the bridge reports.
pub mod codes {
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    pub const INVALID_QUERY: &str = "INVALID_QUERY";
    pub const QUOTA_EXCEEDED: &str = "QUOTA_EXCEEDED";
    pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
    pub const BRIDGE_EXITED: &str = "BRIDGE_EXITED";
}
