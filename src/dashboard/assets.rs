//! Static assets a page may need: logos and boundary files.
//!
//! A missing asset never fails a page. The lookup reports a warning the
//! page shows in place of the visual that needed it.

use std::path::{Path, PathBuf};

use crate::config::{AssetSettings, SettingsResult};

/// Logo file names tried in order.
pub const LOGO_CANDIDATES: &[&str] = &["logo.png", "logo.jpg", "logo.jpeg", "logo.webp"];

/// Outcome of looking up an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLookup {
    Found(PathBuf),
    Missing { warning: String },
}

impl AssetLookup {
    pub fn path(&self) -> Option<&Path> {
        match self {
            AssetLookup::Found(p) => Some(p),
            AssetLookup::Missing { .. } => None,
        }
    }
}

/// A directory of page assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_settings(settings: &AssetSettings) -> SettingsResult<Self> {
        Ok(Self::new(settings.resolved_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The first candidate that exists as a file under the root.
    pub fn first_existing(&self, candidates: &[&str]) -> Option<PathBuf> {
        candidates
            .iter()
            .map(|c| self.root.join(c))
            .find(|p| p.is_file())
    }

    /// Look up `what` under any of `candidates`.
    pub fn lookup(&self, what: &str, candidates: &[&str]) -> AssetLookup {
        match self.first_existing(candidates) {
            Some(path) => AssetLookup::Found(path),
            None => {
                tracing::warn!(
                    asset = what,
                    dir = %self.root.display(),
                    ?candidates,
                    "asset not found"
                );
                AssetLookup::Missing {
                    warning: format!(
                        "⚠️ {} não encontrado em {} (procurado: {}).",
                        what,
                        self.root.display(),
                        candidates.join(", ")
                    ),
                }
            }
        }
    }

    pub fn logo(&self) -> AssetLookup {
        self.lookup("Logo", LOGO_CANDIDATES)
    }
}

impl Default for AssetDir {
    fn default() -> Self {
        Self::new("assets")
    }
}
