use shared::error::GraphQlErrors;
use thiserror::Error;

/// Failure of one GraphQL round trip. The view layer shows the display text
/// verbatim; the variant is only used for logging.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("{0}")]
    Server(#[from] GraphQlErrors),
    #[error("unexpected response shape: {0}")]
    Decode(String),
    #[error("response carried neither data nor errors")]
    MissingData,
}

impl ClientError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Server(_) => "server",
            Self::Decode(_) => "decode",
            Self::MissingData => "missing_data",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}
