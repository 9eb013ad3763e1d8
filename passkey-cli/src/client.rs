//! HTTP client for the passkey server API.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// A ceremony step refused by the server.
#[derive(Debug, thiserror::Error)]
#[error("Server rejected the request ({status} {code}): {message}")]
pub struct Rejected {
    pub status: u16,
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base })
    }

    /// POST `body` as JSON to `path` under `/api/webauthn/`.
    pub async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = self
            .base
            .join("/api/webauthn/")
            .and_then(|u| u.join(path))
            .with_context(|| format!("Invalid endpoint path: {path}"))?;
        debug!(%url, "POST");

        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach server at {url}"))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .with_context(|| format!("Unexpected response body from {url}"));
        }

        let text = response.text().await.unwrap_or_default();
        let rejected = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Rejected {
                status: status.as_u16(),
                code: body.code,
                message: body.error,
            },
            Err(_) => Rejected {
                status: status.as_u16(),
                code: "UNKNOWN".to_string(),
                message: text,
            },
        };
        Err(rejected.into())
    }
}
