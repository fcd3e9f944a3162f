use std::{
    future::Future,
    net::SocketAddr,
    panic::AssertUnwindSafe,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use futures::FutureExt;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::ContractError,
    interaction::{Interaction, ResponseSpec},
    pact_file::{PactFile, WriteMode},
};

pub const DEFAULT_PORT: u16 = 20002;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub host: String,
    pub port: u16,
    pub pact_dir: PathBuf,
    pub consumer: String,
    pub provider: String,
    pub write_mode: WriteMode,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            pact_dir: PathBuf::from("pacts"),
            consumer: "GraphQLConsumer".into(),
            provider: "GraphQLProvider".into(),
            write_mode: WriteMode::Overwrite,
        }
    }
}

impl ProviderConfig {
    /// Defaults overridden by `PACT_MOCK_PORT`, `PACT_DIR` and
    /// `PACT_WRITE_MODE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(port) = lookup("PACT_MOCK_PORT").and_then(|v| v.trim().parse().ok()) {
            config.port = port;
        }
        if let Some(dir) = lookup("PACT_DIR").filter(|v| !v.trim().is_empty()) {
            config.pact_dir = PathBuf::from(dir);
        }
        match lookup("PACT_WRITE_MODE").as_deref().map(str::trim) {
            Some("merge") => config.write_mode = WriteMode::Merge,
            Some("overwrite") => config.write_mode = WriteMode::Overwrite,
            _ => {}
        }
        config
    }

    pub fn with_pact_dir(mut self, pact_dir: impl Into<PathBuf>) -> Self {
        self.pact_dir = pact_dir.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

#[derive(Debug)]
struct Registered {
    interaction: Interaction,
    hits: usize,
}

#[derive(Debug, Default)]
struct Registry {
    interactions: Vec<Registered>,
    unexpected: Vec<String>,
}

type SharedRegistry = Arc<Mutex<Registry>>;

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a passing [`MockProvider::run`].
#[derive(Debug)]
pub struct Verified<T> {
    pub value: T,
    pub pact_path: PathBuf,
}

/// In-process stand-in for the GraphQL provider.
pub struct MockProvider {
    config: ProviderConfig,
    addr: SocketAddr,
    registry: SharedRegistry,
    verified: Vec<Interaction>,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl MockProvider {
    pub async fn start(config: ProviderConfig) -> Result<Self, ContractError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ContractError::Bind {
                port: config.port,
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| ContractError::Bind {
            port: config.port,
            source,
        })?;

        let registry = SharedRegistry::default();
        let app = Router::new()
            .fallback(handle_request)
            .with_state(registry.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = result {
                warn!(%error, "mock provider stopped with error");
            }
        });
        info!(%addr, consumer = %config.consumer, provider = %config.provider, "mock provider listening");

        Ok(Self {
            config,
            addr,
            registry,
            verified: Vec::new(),
            shutdown: Some(shutdown_tx),
            server: Some(server),
        })
    }

    /// Scoped lifecycle: start, register `interactions`, run `test` against
    /// the provider's base URL, verify, write the pact and shut down. The
    /// provider is shut down on every path, including a panicking test,
    /// whose panic is resumed afterwards.
    pub async fn run<F, Fut, T>(
        config: ProviderConfig,
        interactions: impl IntoIterator<Item = Interaction>,
        test: F,
    ) -> Result<Verified<T>, ContractError>
    where
        F: FnOnce(Url) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut provider = Self::start(config).await?;
        for interaction in interactions {
            provider.add_interaction(interaction);
        }

        let base_url = provider.base_url()?;
        let outcome = AssertUnwindSafe(async move { test(base_url).await })
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(value)) => provider
                .verify()
                .and_then(|()| provider.write_pact())
                .map(|pact_path| Verified { value, pact_path }),
            Ok(Err(error)) => {
                if let Err(unsatisfied) = provider.verify() {
                    debug!(%unsatisfied, "verification skipped after consumer failure");
                }
                Err(ContractError::Consumer(format!("{error:#}")))
            }
            Err(panic) => {
                provider.shutdown().await;
                std::panic::resume_unwind(panic);
            }
        };
        provider.shutdown().await;
        result
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> Result<Url, ContractError> {
        Ok(Url::parse(&format!("http://{}/", self.addr))?)
    }

    pub fn add_interaction(&self, interaction: Interaction) {
        debug!(description = %interaction.description, "interaction registered");
        lock(&self.registry).interactions.push(Registered {
            interaction,
            hits: 0,
        });
    }

    /// Checks that every registered interaction was exercised and no
    /// unexpected request arrived. Registered interactions are cleared
    /// either way; satisfied ones are kept for the pact file.
    pub fn verify(&mut self) -> Result<(), ContractError> {
        let mut registry = lock(&self.registry);
        let registered = std::mem::take(&mut registry.interactions);
        let unexpected = std::mem::take(&mut registry.unexpected);
        drop(registry);

        let missing: Vec<String> = registered
            .iter()
            .filter(|r| r.hits == 0)
            .map(|r| r.interaction.description.clone())
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            warn!(?missing, ?unexpected, "pact verification failed");
            return Err(ContractError::Unsatisfied {
                missing,
                unexpected,
            });
        }

        info!(count = registered.len(), "pact verification passed");
        self.verified
            .extend(registered.into_iter().map(|r| r.interaction));
        Ok(())
    }

    pub fn verified(&self) -> &[Interaction] {
        &self.verified
    }

    pub fn write_pact(&self) -> Result<PathBuf, ContractError> {
        PactFile::new(&self.config.consumer, &self.config.provider, &self.verified)
            .write(&self.config.pact_dir, self.config.write_mode)
    }

    /// Stops the server and waits for the port to be released.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(mut server) = self.server.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
                warn!(port = self.addr.port(), "graceful shutdown timed out; aborting");
                server.abort();
                let _ = server.await;
            }
        }
        info!(port = self.addr.port(), "mock provider stopped");
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

async fn handle_request(
    State(registry): State<SharedRegistry>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let body = decode_body(&body);
    let mut registry = lock(&registry);
    let mut report = Vec::new();

    for registered in registry.interactions.iter_mut() {
        let mismatches =
            registered
                .interaction
                .request
                .mismatches(method.as_str(), uri.path(), &body);
        if mismatches.is_empty() {
            registered.hits += 1;
            debug!(description = %registered.interaction.description, "interaction matched");
            return respond(&registered.interaction.response);
        }
        report.push(json!({
            "interaction": registered.interaction.description,
            "mismatches": mismatches,
        }));
    }

    let summary = format!("{method} {}", uri.path());
    warn!(request = %summary, "no interaction matched request");
    registry.unexpected.push(summary.clone());
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": format!("no interaction matched {summary}"),
            "mismatches": report,
        })),
    )
        .into_response()
}

fn decode_body(raw: &Bytes) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(raw)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
}

fn respond(spec: &ResponseSpec) -> Response {
    let status = StatusCode::from_u16(spec.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = spec.body.example().to_string();
    let mut response = (status, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &spec.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(%name, "skipping invalid response header"),
        }
    }
    response
}

#[cfg(test)]
#[path = "tests/mock_server_tests.rs"]
mod tests;
