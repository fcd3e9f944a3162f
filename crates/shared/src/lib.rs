//! Wire and domain types shared by the GraphQL client and the contract harness.

pub mod domain;
pub mod error;
pub mod protocol;
