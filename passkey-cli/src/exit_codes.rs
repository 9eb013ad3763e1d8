//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use passkey_core::CeremonyError;

use crate::client::Rejected;
use crate::keyfile::KeyFileError;

/// Successful execution.
pub const SUCCESS: u8 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: u8 = 1;

/// Data format error (ceremony rejected, undecodable payload).
/// Maps to EX_DATAERR from sysexits.h.
pub const CEREMONY_REJECTED: u8 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: u8 = 66;

/// Server unreachable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: u8 = 69;

/// Refusing to overwrite an existing key file.
/// Maps to EX_CANTCREAT from sysexits.h.
pub const CANT_CREATE: u8 = 73;

/// I/O error (cannot write output file).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: u8 = 74;

/// Help text listing the codes above.
pub const HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  65  Ceremony rejected or payload undecodable
  66  Key file missing or unreadable
  69  Server unreachable
  73  Key file already exists
  74  Key file could not be written";

/// Pick the exit code for an error by walking its source chain.
pub fn classify(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<KeyFileError>() {
            return match e {
                KeyFileError::Unreadable { .. } | KeyFileError::Invalid { .. } => INPUT_ERROR,
                KeyFileError::Exists(_) => CANT_CREATE,
                KeyFileError::Write { .. } => IO_ERROR,
            };
        }
        if let Some(e) = cause.downcast_ref::<Rejected>() {
            return if e.status >= 500 {
                GENERAL_ERROR
            } else {
                CEREMONY_REJECTED
            };
        }
        if cause.downcast_ref::<CeremonyError>().is_some() {
            return CEREMONY_REJECTED;
        }
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            if e.is_connect() || e.is_timeout() {
                return NETWORK_ERROR;
            }
        }
    }
    GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    #[test]
    fn test_classify_key_file_errors() {
        let err = anyhow::Error::new(KeyFileError::Exists(PathBuf::from("k.json")));
        assert_eq!(classify(&err), CANT_CREATE);

        let err = Err::<(), _>(KeyFileError::Unreadable {
            path: PathBuf::from("k.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
        .context("Login failed")
        .unwrap_err();
        assert_eq!(classify(&err), INPUT_ERROR);
    }

    #[test]
    fn test_classify_rejections() {
        let err = anyhow::Error::new(Rejected {
            status: 400,
            code: "CHALLENGE_EXPIRED".into(),
            message: "Challenge expired".into(),
        });
        assert_eq!(classify(&err), CEREMONY_REJECTED);

        let err = anyhow::Error::new(CeremonyError::NotFound("credential"));
        assert_eq!(classify(&err), CEREMONY_REJECTED);

        assert_eq!(classify(&anyhow::anyhow!("boom")), GENERAL_ERROR);
    }
}
