//! Replays registered interactions against a running provider.

use reqwest::{header, Client, Method};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::{error::ContractError, interaction::Interaction};

/// Sends each interaction's request to the provider at `base_url` and checks
/// the reply against the recorded response. Every mismatch is reported,
/// prefixed with the interaction description.
pub async fn verify_provider(
    http: &Client,
    base_url: &Url,
    interactions: &[Interaction],
) -> Result<(), ContractError> {
    let mut failures = Vec::new();
    for interaction in interactions {
        let mismatches = replay(http, base_url, interaction).await?;
        if mismatches.is_empty() {
            debug!(description = %interaction.description, "provider satisfied interaction");
        }
        failures.extend(
            mismatches
                .into_iter()
                .map(|mismatch| format!("'{}' {mismatch}", interaction.description)),
        );
    }

    if !failures.is_empty() {
        warn!(?failures, provider = %base_url, "provider verification failed");
        return Err(ContractError::ProviderMismatch { failures });
    }
    info!(count = interactions.len(), provider = %base_url, "provider verification passed");
    Ok(())
}

async fn replay(
    http: &Client,
    base_url: &Url,
    interaction: &Interaction,
) -> Result<Vec<String>, ContractError> {
    if let Some(state) = &interaction.provider_state {
        debug!(description = %interaction.description, %state, "provider state assumed");
    }
    let request = &interaction.request;
    let expected = &interaction.response;
    let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
        ContractError::InvalidInteraction(format!(
            "'{}' has invalid method {}",
            interaction.description, request.method
        ))
    })?;
    let url = base_url.join(request.path.trim_start_matches('/'))?;

    let response = http
        .request(method, url)
        .header(header::ACCEPT, "application/json")
        .json(&request.body())
        .send()
        .await?;

    let mut mismatches = Vec::new();
    let status = response.status().as_u16();
    if status != expected.status {
        mismatches.push(format!("status: expected {}, got {status}", expected.status));
    }
    for (name, value) in &expected.headers {
        let actual = response
            .headers()
            .get(name.as_str())
            .and_then(|v| v.to_str().ok());
        match actual {
            Some(actual) if media_type(actual) == media_type(value) => {}
            Some(actual) => {
                mismatches.push(format!("header {name}: expected {value}, got {actual}"))
            }
            None => mismatches.push(format!("header {name}: missing")),
        }
    }

    let body = response.bytes().await?;
    match serde_json::from_slice::<Value>(&body) {
        Ok(actual) => {
            if let Err(body_mismatches) = expected.body.check(&actual) {
                mismatches.extend(
                    body_mismatches
                        .into_iter()
                        .map(|mismatch| format!("body {mismatch}")),
                );
            }
        }
        Err(error) => mismatches.push(format!("body: not JSON ({error})")),
    }
    Ok(mismatches)
}

/// `application/json; charset=utf-8` and `application/json` name the same
/// media type.
fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
#[path = "tests/verifier_tests.rs"]
mod tests;
