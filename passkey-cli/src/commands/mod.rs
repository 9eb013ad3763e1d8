//! Subcommand implementations.

pub mod inspect;
pub mod login;
pub mod register;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Body returned by both `start` endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse<T> {
    pub session: String,
    pub public_key: T,
}

/// Origin reported in client data: `--origin` if given, else the server's own.
pub fn resolve_origin(server: &Url, origin: Option<String>) -> Result<String> {
    match origin {
        Some(origin) => {
            let url = Url::parse(&origin).with_context(|| format!("Invalid origin: {origin}"))?;
            Ok(url.origin().ascii_serialization())
        }
        None => Ok(server.origin().ascii_serialization()),
    }
}
