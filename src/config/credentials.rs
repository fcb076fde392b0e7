//! Service-account credential materialization.
//!
//! The warehouse client authenticates through a key file named by an
//! environment variable. The secret arrives as JSON in another variable; it
//! is written to disk once per process and never rotated.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;

use super::settings::CredentialSettings;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential secret is not a JSON object: {0}")]
    InvalidJson(String),

    #[error("failed to write credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credentials already materialized at {existing}, refusing {requested}")]
    AlreadyMaterialized { existing: PathBuf, requested: PathBuf },
}

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Holds the path of the one credential file a store has written.
#[derive(Debug, Default)]
pub struct CredentialStore {
    written: OnceCell<PathBuf>,
}

static PROCESS_STORE: CredentialStore = CredentialStore {
    written: OnceCell::new(),
};

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store shared by the whole process.
    pub fn process() -> &'static CredentialStore {
        &PROCESS_STORE
    }

    pub fn path(&self) -> Option<&Path> {
        self.written.get().map(PathBuf::as_path)
    }

    /// Validate `secret_json`, write it to `path` and point `env_var` at it.
    ///
    /// Only the first call writes. Later calls for the same path return it
    /// unchanged; a different path is an error.
    pub fn materialize(
        &self,
        secret_json: &str,
        path: &Path,
        env_var: &str,
    ) -> CredentialResult<PathBuf> {
        let written = self
            .written
            .get_or_try_init(|| write_secret(secret_json, path, env_var))?;
        if written != path {
            return Err(CredentialError::AlreadyMaterialized {
                existing: written.clone(),
                requested: path.to_path_buf(),
            });
        }
        Ok(written.clone())
    }
}

fn write_secret(secret_json: &str, path: &Path, env_var: &str) -> CredentialResult<PathBuf> {
    let parsed: serde_json::Value = serde_json::from_str(secret_json)
        .map_err(|e| CredentialError::InvalidJson(e.to_string()))?;
    if !parsed.is_object() {
        return Err(CredentialError::InvalidJson("expected an object".to_string()));
    }

    let io_err = |source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(io_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    }
    file.write_all(secret_json.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;

    std::env::set_var(env_var, path);
    tracing::info!(path = %path.display(), env_var, "materialized warehouse credentials");
    Ok(path.to_path_buf())
}

/// Process-wide [`CredentialStore::materialize`].
pub fn materialize(secret_json: &str, path: &Path, env_var: &str) -> CredentialResult<PathBuf> {
    CredentialStore::process().materialize(secret_json, path, env_var)
}

/// Materialize from the configured secret variable, if it is set.
pub fn materialize_from_settings(
    settings: &CredentialSettings,
) -> CredentialResult<Option<PathBuf>> {
    match std::env::var(&settings.secret_env) {
        Ok(secret) => materialize(&secret, Path::new(&settings.file), &settings.env_var).map(Some),
        Err(_) => {
            tracing::debug!(
                secret_env = %settings.secret_env,
                "no service-account secret in environment"
            );
            Ok(None)
        }
    }
}
