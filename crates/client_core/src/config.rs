use std::{fs, io, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::form::SubmitPolicy;

pub const DEFAULT_GRAPHQL_URL: &str = "http://localhost:8080/graphql";
pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub graphql_url: String,
    pub request_timeout_secs: u64,
    pub clear_draft_on_success: bool,
    pub refetch_after_submit: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            graphql_url: DEFAULT_GRAPHQL_URL.into(),
            request_timeout_secs: 30,
            clear_draft_on_success: false,
            refetch_after_submit: false,
        }
    }
}

impl ClientSettings {
    pub fn endpoint(&self) -> anyhow::Result<Url> {
        Url::parse(&self.graphql_url)
            .with_context(|| format!("invalid graphql url '{}'", self.graphql_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn submit_policy(&self) -> SubmitPolicy {
        SubmitPolicy {
            clear_draft_on_success: self.clear_draft_on_success,
            refetch_after_success: self.refetch_after_submit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    graphql_url: Option<String>,
    request_timeout_secs: Option<u64>,
    clear_draft_on_success: Option<bool>,
    refetch_after_submit: Option<bool>,
}

/// Defaults, then `client.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse '{}'", path.display()))?;
            if let Some(v) = file_cfg.graphql_url {
                settings.graphql_url = v;
            }
            if let Some(v) = file_cfg.request_timeout_secs {
                settings.request_timeout_secs = v;
            }
            if let Some(v) = file_cfg.clear_draft_on_success {
                settings.clear_draft_on_success = v;
            }
            if let Some(v) = file_cfg.refetch_after_submit {
                settings.refetch_after_submit = v;
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
    }

    if let Some(v) = env("GRAPHQL_URL") {
        settings.graphql_url = v;
    }
    if let Some(v) = env("APP__GRAPHQL_URL") {
        settings.graphql_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v
            .parse()
            .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS is not a number: '{v}'"))?;
    }
    if let Some(v) = env("APP__CLEAR_DRAFT_ON_SUCCESS") {
        settings.clear_draft_on_success = parse_flag("APP__CLEAR_DRAFT_ON_SUCCESS", &v)?;
    }
    if let Some(v) = env("APP__REFETCH_AFTER_SUBMIT") {
        settings.refetch_after_submit = parse_flag("APP__REFETCH_AFTER_SUBMIT", &v)?;
    }

    Ok(settings)
}

fn parse_flag(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key} is not a boolean: '{other}'"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
