//! Software authenticator persistence.
//!
//! The key file is the JSON form of [`SoftAuthenticator`], including its
//! private key. It is rewritten after every ceremony so the sign counter
//! survives between runs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use passkey_core::SoftAuthenticator;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error("Failed to read key file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Key file {} is not a valid authenticator: {source}", path.display())]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Key file {} already exists (use --force to replace it)", .0.display())]
    Exists(PathBuf),
    #[error("Failed to write key file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn load(path: &Path) -> Result<SoftAuthenticator, KeyFileError> {
    let bytes = std::fs::read(path).map_err(|source| KeyFileError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let authenticator: SoftAuthenticator =
        serde_json::from_slice(&bytes).map_err(|source| KeyFileError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), counter = authenticator.sign_count(), "Loaded key file");
    Ok(authenticator)
}

/// Fail early when `path` exists and `force` is not set.
pub fn ensure_writable(path: &Path, force: bool) -> Result<(), KeyFileError> {
    if path.exists() && !force {
        return Err(KeyFileError::Exists(path.to_path_buf()));
    }
    Ok(())
}

/// Written to a sibling temp file, then renamed into place.
///
/// On unix the temp file is created owner-only (0600) before any key
/// material is written.
pub fn save(path: &Path, authenticator: &SoftAuthenticator) -> Result<(), KeyFileError> {
    let write_err = |source| KeyFileError::Write {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_vec_pretty(authenticator)
        .map_err(|e| write_err(std::io::Error::other(e)))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    match std::fs::remove_file(&tmp) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(write_err(e)),
        _ => {}
    }
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&tmp).map_err(write_err)?;
    file.write_all(&json).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);
    std::fs::rename(&tmp, path).map_err(write_err)?;
    debug!(path = %path.display(), counter = authenticator.sign_count(), "Saved key file");
    Ok(())
}
