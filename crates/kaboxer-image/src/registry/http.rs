//! JSON-over-HTTP helper shared by every registry client

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Why a registry query produced no data
///
/// Never leaves the registry module: every failure is logged and turned into
/// an empty version list.
#[derive(Debug, Error)]
pub(crate) enum RegistryFailure {
    #[error("could not query registry on {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP request to {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("unexpected response from {url}: {message}")]
    MalformedResponse { url: String, message: String },
}

impl RegistryFailure {
    /// Warn on connection problems only; 404s are routine while probing
    /// GitLab project paths
    pub(crate) fn log(&self) {
        match self {
            RegistryFailure::Unreachable { .. } => warn!("{}", self),
            _ => debug!("{}", self),
        }
    }
}

/// Thin wrapper around a `reqwest::Client` issuing unauthenticated GETs
#[derive(Debug, Clone)]
pub struct RegistryHttp {
    client: reqwest::Client,
}

impl RegistryHttp {
    /// Build a client sending `user_agent`
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// GET `url` and decode the JSON body as `T`
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> std::result::Result<T, RegistryFailure> {
        debug!("Querying registry: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| RegistryFailure::Unreachable {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryFailure::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| RegistryFailure::Unreachable {
                url: url.to_string(),
                source,
            })?;
        trace!("Response from {}: {}", url, body);

        serde_json::from_str(&body).map_err(|e| RegistryFailure::MalformedResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Like [`get_json`](Self::get_json), logging and swallowing failures
    pub(crate) async fn get_json_or_log<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        match self.get_json(url).await {
            Ok(value) => Some(value),
            Err(failure) => {
                failure.log();
                None
            }
        }
    }
}
