use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{HttpGraphQlClient, UserApi};
use contract::{
    scenarios::get_users_interaction, verify_provider, BrokerClient, BrokerSettings,
    MockProvider, PactFile, ProviderConfig, WriteMode,
};
use shared::domain::UserFilter;
use tracing::info;
use url::Url;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "contract-tools", about = "Generate and publish the user GraphQL pact")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the consumer against the mock provider and write the pact file.
    Generate {
        #[arg(long, env = "PACT_DIR")]
        pact_dir: Option<PathBuf>,
        #[arg(long, env = "PACT_MOCK_PORT")]
        port: Option<u16>,
        /// Merge into an existing pact file instead of replacing it.
        #[arg(long)]
        merge: bool,
    },
    /// Publish a pact file to the broker at PACT_BROKER_URL.
    Publish {
        /// Consumer version the pact is published under.
        #[arg(long)]
        version: String,
        /// Defaults to the pact written by `generate`.
        #[arg(long)]
        pact_file: Option<PathBuf>,
    },
    /// Replay the GetUsers interaction against a running provider.
    Verify {
        #[arg(long, env = "PROVIDER_URL", default_value = "http://localhost:4000")]
        provider_url: Url,
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            pact_dir,
            port,
            merge,
        } => {
            let mut config = ProviderConfig::from_env();
            if let Some(pact_dir) = pact_dir {
                config.pact_dir = pact_dir;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if merge {
                config.write_mode = WriteMode::Merge;
            }
            let path = generate(config).await?;
            println!("{}", path.display());
        }
        Command::Publish { version, pact_file } => {
            let pact_file = pact_file.unwrap_or_else(|| {
                let config = ProviderConfig::from_env();
                config
                    .pact_dir
                    .join(PactFile::file_name(&config.consumer, &config.provider))
            });
            let settings = BrokerSettings::from_env()?;
            let url = BrokerClient::new(settings)
                .publish_pact(&pact_file, &version)
                .await
                .with_context(|| format!("failed to publish {}", pact_file.display()))?;
            println!("published {url}");
        }
        Command::Verify {
            provider_url,
            timeout_secs,
        } => {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?;
            verify_provider(&http, &provider_url, &[get_users_interaction()?])
                .await
                .with_context(|| format!("provider at {provider_url} failed verification"))?;
            println!("verified {provider_url}");
        }
    }

    Ok(())
}

async fn generate(config: ProviderConfig) -> Result<PathBuf> {
    let interactions = [get_users_interaction()?];
    let verified = MockProvider::run(config, interactions, |base_url| async move {
        let endpoint = base_url.join("graphql")?;
        let client = HttpGraphQlClient::with_timeout(endpoint, Duration::from_secs(10))?;
        let users = UserApi::new(Arc::new(client))
            .get_users(&UserFilter::by_first_name("Aleena"))
            .await?;
        Ok::<_, anyhow::Error>(users.len())
    })
    .await
    .context("GetUsers contract failed")?;
    info!(users = verified.value, "consumer decoded provider response");
    Ok(verified.pact_path)
}
