//! Boundary-polygon documents and feature-key resolution.
//!
//! A choropleth needs every category key to name exactly one feature of
//! the boundary file. Boundary files from different sources label their
//! features with different properties (`SIGLA_UF`, `sigla`, `name`, ...),
//! so the builder offers a list of candidate properties and the first one
//! that matches every key wins. Keys and property values are compared
//! accent-folded and upper-cased.

pub mod brazil;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("failed to read boundary file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid boundary JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed boundary document: {0}")]
    Malformed(String),

    #[error(
        "no boundary property matches the keys (tried {candidates:?}; unmatched: {unmatched:?})"
    )]
    UnmatchedKeys {
        candidates: Vec<String>,
        unmatched: Vec<String>,
    },

    #[error("unknown state abbreviation: {0}")]
    UnknownState(String),

    #[error("unknown region: {0}")]
    UnknownRegion(String),
}

pub type GeoResult<T> = Result<T, GeoError>;

/// Accent-folded, trimmed, upper-case form used for key comparison.
pub fn fold_key(s: &str) -> String {
    s.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// The property a choropleth keys on, and each key's feature value.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureKey {
    pub property: String,
    /// Feature values in the order of the keys passed to [`Boundaries::resolve_key`].
    pub locations: Vec<String>,
}

impl FeatureKey {
    /// Plotly's `featureidkey`.
    pub fn featureidkey(&self) -> String {
        format!("properties.{}", self.property)
    }
}

/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone)]
pub struct Boundaries {
    document: Value,
}

impl Boundaries {
    pub fn from_str(json: &str) -> GeoResult<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> GeoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| GeoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let boundaries = Self::from_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            features = boundaries.len(),
            "loaded boundary file"
        );
        Ok(boundaries)
    }

    pub fn from_value(document: Value) -> GeoResult<Self> {
        let features = document
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| GeoError::Malformed("missing 'features' array".into()))?;
        if let Some(i) = features
            .iter()
            .position(|f| !f.get("properties").is_some_and(Value::is_object))
        {
            return Err(GeoError::Malformed(format!(
                "feature {} has no 'properties' object",
                i
            )));
        }
        Ok(Self { document })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    fn properties(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.document["features"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|f| f.get("properties").and_then(Value::as_object))
    }

    pub fn len(&self) -> usize {
        self.properties().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every property name used by at least one feature.
    pub fn property_names(&self) -> BTreeSet<String> {
        self.properties()
            .flat_map(|p| p.keys().cloned())
            .collect()
    }

    /// The value of `property` on each feature that has it, as text.
    pub fn feature_values(&self, property: &str) -> Vec<String> {
        self.properties()
            .filter_map(|p| match p.get(property)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Find the first candidate property whose values cover every key.
    pub fn resolve_key<S: AsRef<str>>(
        &self,
        keys: &[S],
        candidates: &[&str],
    ) -> GeoResult<FeatureKey> {
        let mut best: Option<Vec<String>> = None;
        for candidate in candidates {
            let by_folded: HashMap<String, String> = self
                .feature_values(candidate)
                .into_iter()
                .map(|v| (fold_key(&v), v))
                .collect();
            if by_folded.is_empty() {
                continue;
            }

            let mut locations = Vec::with_capacity(keys.len());
            let mut unmatched = Vec::new();
            for key in keys {
                match by_folded.get(&fold_key(key.as_ref())) {
                    Some(v) => locations.push(v.clone()),
                    None => unmatched.push(key.as_ref().to_string()),
                }
            }
            if unmatched.is_empty() {
                tracing::debug!(property = %candidate, "resolved boundary key");
                return Ok(FeatureKey {
                    property: candidate.to_string(),
                    locations,
                });
            }
            if best.as_ref().map_or(true, |b| unmatched.len() < b.len()) {
                best = Some(unmatched);
            }
        }

        Err(GeoError::UnmatchedKeys {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            unmatched: best.unwrap_or_else(|| {
                keys.iter().map(|k| k.as_ref().to_string()).collect()
            }),
        })
    }
}
