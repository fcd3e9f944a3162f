//! Consumer-driven contract harness for the user GraphQL endpoint.

pub mod broker;
pub mod error;
pub mod interaction;
pub mod matchers;
pub mod mock_server;
pub mod pact_file;
pub mod scenarios;
pub mod verifier;

pub use broker::{BrokerClient, BrokerSettings};
pub use error::ContractError;
pub use interaction::{normalize_query, GraphQlInteraction, Interaction};
pub use matchers::{each_like, like, Matcher};
pub use mock_server::{MockProvider, ProviderConfig, Verified};
pub use pact_file::{PactFile, WriteMode};
pub use verifier::verify_provider;
