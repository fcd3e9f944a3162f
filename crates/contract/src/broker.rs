use std::path::Path;

use reqwest::StatusCode;
use tracing::{info, warn};
use url::Url;

use crate::{error::ContractError, pact_file::PactFile};

/// Where generated pacts are published.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerSettings {
    pub url: Url,
    pub token: Option<String>,
}

impl BrokerSettings {
    /// Reads `PACT_BROKER_URL` (required) and `PACT_BROKER_TOKEN`.
    pub fn from_env() -> Result<Self, ContractError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ContractError> {
        let raw = lookup("PACT_BROKER_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ContractError::BrokerConfig("PACT_BROKER_URL is not set".into()))?;
        let url = Url::parse(&raw).map_err(|error| {
            ContractError::BrokerConfig(format!("PACT_BROKER_URL '{raw}' is invalid: {error}"))
        })?;
        let token = lookup("PACT_BROKER_TOKEN")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Self { url, token })
    }

    pub fn pact_url(
        &self,
        provider: &str,
        consumer: &str,
        version: &str,
    ) -> Result<Url, ContractError> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ContractError::BrokerConfig(format!("'{}' cannot be a base url", self.url))
            })?
            .pop_if_empty()
            .extend(["pacts", "provider", provider, "consumer", consumer, "version", version]);
        Ok(url)
    }
}

/// Publishes pact files to a broker.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    settings: BrokerSettings,
}

impl BrokerClient {
    pub fn new(settings: BrokerSettings) -> Self {
        Self::with_client(reqwest::Client::new(), settings)
    }

    pub fn with_client(http: reqwest::Client, settings: BrokerSettings) -> Self {
        Self { http, settings }
    }

    /// PUTs the pact at `pact_path` as consumer version `version` and
    /// returns the URL it was published to.
    pub async fn publish_pact(&self, pact_path: &Path, version: &str) -> Result<Url, ContractError> {
        if version.trim().is_empty() {
            return Err(ContractError::BrokerConfig(
                "consumer version must not be empty".into(),
            ));
        }
        let pact = PactFile::read(pact_path)?;
        let url = self
            .settings
            .pact_url(&pact.provider.name, &pact.consumer.name, version)?;

        let mut request = self.http.put(url.clone()).json(&pact);
        if let Some(token) = &self.settings.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            info!(%url, %status, "pact published");
            return Ok(url);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(%url, %status, "broker rejected pact");
        Err(ContractError::BrokerRejected {
            status: status.as_u16(),
            body: if status == StatusCode::UNAUTHORIZED && body.is_empty() {
                "unauthorized".into()
            } else {
                body
            },
        })
    }
}

#[cfg(test)]
#[path = "tests/broker_tests.rs"]
mod tests;
