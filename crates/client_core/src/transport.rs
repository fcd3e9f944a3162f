//! GraphQL-over-HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use shared::protocol::{GraphQlRequest, GraphQlResponse};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    async fn execute(&self, request: GraphQlRequest) -> Result<GraphQlResponse<Value>, ClientError>;
}

pub struct HttpGraphQlClient {
    http: Client,
    endpoint: Url,
}

impl HttpGraphQlClient {
    /// Posts to `endpoint` through a caller-configured client.
    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, endpoint))
    }
}

#[async_trait]
impl GraphQlTransport for HttpGraphQlClient {
    async fn execute(&self, request: GraphQlRequest) -> Result<GraphQlResponse<Value>, ClientError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;
        let status = res.status();
        debug!(
            operation = request.operation_name.as_deref().unwrap_or("anonymous"),
            %status,
            "graphql response received"
        );

        if status.is_success() {
            return Ok(res.json::<GraphQlResponse<Value>>().await?);
        }

        // Some servers report validation failures with a 4xx and a regular
        // GraphQL error body.
        let body = res.bytes().await?;
        match serde_json::from_slice::<GraphQlResponse<Value>>(&body) {
            Ok(envelope) if !envelope.errors.is_empty() => Ok(envelope),
            _ => Err(ClientError::Transport(format!(
                "server responded with HTTP {status}"
            ))),
        }
    }
}
