//! Path helpers for the config loader.

use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Canonicalize when possible; a missing path is kept as given.
pub(super) fn normalize_path(path: &Path) -> Result<PathBuf, ConfigError> {
    match path.canonicalize() {
        Ok(path) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path.to_path_buf()),
        Err(err) => Err(ConfigError::read(path, err)),
    }
}

/// Key used to skip a file already loaded through another layer.
pub(super) fn unique_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve a relative store path against the config's working directory.
pub(super) fn resolve_relative(base: &Path, value: &str) -> String {
    let candidate = Path::new(value);
    if candidate.is_absolute() {
        value.to_string()
    } else {
        base.join(candidate).to_string_lossy().into_owned()
    }
}
