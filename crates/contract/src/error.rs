use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("failed to bind mock provider on port {port}: {source}")]
    Bind { port: u16, source: io::Error },
    #[error("invalid interaction: {0}")]
    InvalidInteraction(String),
    #[error("{}", describe_unsatisfied(.missing, .unexpected))]
    Unsatisfied {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    #[error("invalid mock provider url: {0}")]
    Url(#[from] url::ParseError),
    #[error("consumer test failed: {0}")]
    Consumer(String),
    #[error("pact file '{path}': {source}")]
    PactFile { path: PathBuf, source: io::Error },
    #[error("failed to encode pact: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("broker configuration: {0}")]
    BrokerConfig(String),
    #[error("broker rejected pact with HTTP {status}: {body}")]
    BrokerRejected { status: u16, body: String },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider does not satisfy the contract: {}", .failures.join("; "))]
    ProviderMismatch { failures: Vec<String> },
}

fn describe_unsatisfied(missing: &[String], unexpected: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("interactions not exercised: {}", missing.join(", ")));
    }
    if !unexpected.is_empty() {
        parts.push(format!("unexpected requests: {}", unexpected.join(", ")));
    }
    format!("pact verification failed ({})", parts.join("; "))
}
