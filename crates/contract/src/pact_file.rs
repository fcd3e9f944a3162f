//! Pact specification v2 JSON documents.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    error::ContractError,
    interaction::{query_regex, Interaction},
};

pub const PACT_SPECIFICATION_VERSION: &str = "2.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace any existing file.
    #[default]
    Overwrite,
    /// Keep interactions already in the file unless re-recorded.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pacticipant {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PactRequest {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub matching_rules: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PactResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub matching_rules: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PactInteraction {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<String>,
    pub request: PactRequest,
    pub response: PactResponse,
}

impl PactInteraction {
    fn same_key(&self, other: &Self) -> bool {
        self.description == other.description && self.provider_state == other.provider_state
    }
}

impl From<&Interaction> for PactInteraction {
    fn from(interaction: &Interaction) -> Self {
        let mut request_rules = BTreeMap::new();
        request_rules.insert(
            "$.body.query".to_string(),
            json!({"match": "regex", "regex": query_regex(&interaction.request.query)}),
        );
        Self {
            description: interaction.description.clone(),
            provider_state: interaction.provider_state.clone(),
            request: PactRequest {
                method: interaction.request.method.clone(),
                path: interaction.request.path.clone(),
                headers: BTreeMap::from([(
                    "Content-Type".to_string(),
                    "application/json".to_string(),
                )]),
                body: interaction.request.body(),
                matching_rules: request_rules,
            },
            response: PactResponse {
                status: interaction.response.status,
                headers: interaction.response.headers.clone(),
                body: interaction.response.body.example(),
                matching_rules: interaction.response.body.matching_rules("$.body"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PactFile {
    pub consumer: Pacticipant,
    pub provider: Pacticipant,
    pub interactions: Vec<PactInteraction>,
    pub metadata: Value,
}

impl PactFile {
    pub fn new<'a>(
        consumer: &str,
        provider: &str,
        interactions: impl IntoIterator<Item = &'a Interaction>,
    ) -> Self {
        Self {
            consumer: Pacticipant {
                name: consumer.to_string(),
            },
            provider: Pacticipant {
                name: provider.to_string(),
            },
            interactions: interactions.into_iter().map(PactInteraction::from).collect(),
            metadata: json!({
                "pactSpecification": { "version": PACT_SPECIFICATION_VERSION }
            }),
        }
    }

    /// `<consumer>-<provider>.json`, lower-cased.
    pub fn file_name(consumer: &str, provider: &str) -> String {
        format!("{consumer}-{provider}.json").to_lowercase()
    }

    pub fn read(path: &Path) -> Result<Self, ContractError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ContractError::PactFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Folds `self` into `existing`: re-recorded interactions replace their
    /// older version in place, new ones are appended.
    fn merged_into(self, mut existing: PactFile) -> PactFile {
        for interaction in self.interactions {
            match existing
                .interactions
                .iter_mut()
                .find(|current| current.same_key(&interaction))
            {
                Some(current) => *current = interaction,
                None => existing.interactions.push(interaction),
            }
        }
        existing.metadata = self.metadata;
        existing
    }

    /// Writes the pact into `dir`, creating it if needed, and returns the
    /// file path.
    pub fn write(self, dir: &Path, mode: WriteMode) -> Result<PathBuf, ContractError> {
        std::fs::create_dir_all(dir).map_err(|source| ContractError::PactFile {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(Self::file_name(&self.consumer.name, &self.provider.name));

        let pact = match mode {
            WriteMode::Merge if path.exists() => self.merged_into(Self::read(&path)?),
            _ => self,
        };
        let encoded = serde_json::to_string_pretty(&pact)?;
        std::fs::write(&path, encoded).map_err(|source| ContractError::PactFile {
            path: path.clone(),
            source,
        })?;
        info!(
            path = %path.display(),
            interactions = pact.interactions.len(),
            ?mode,
            "pact file written"
        );
        Ok(path)
    }
}

#[cfg(test)]
#[path = "tests/pact_file_tests.rs"]
mod tests;
