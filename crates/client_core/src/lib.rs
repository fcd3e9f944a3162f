use std::sync::Arc;

use serde::de::DeserializeOwned;
use shared::{
    domain::{UserFeedbackInput, UserFilter, UserInput, UserRecord},
    error::GraphQlErrors,
    protocol::{GraphQlRequest, ReadOperation, SavedUserData, UserListData, WriteOperation},
};
use tracing::{debug, warn};

pub mod config;
pub mod error;
pub mod form;
pub mod query_result;
pub mod render;
pub mod transport;
pub mod user_list;

pub use config::{load_settings, ClientSettings};
pub use error::ClientError;
pub use form::{FormBinder, FormDraft, FormError, FormField, FormKind, SubmitPolicy, SubmitState};
pub use query_result::QueryResult;
pub use transport::{GraphQlTransport, HttpGraphQlClient};
pub use user_list::UserListView;

/// Typed user operations on top of an injected transport.
#[derive(Clone)]
pub struct UserApi {
    transport: Arc<dyn GraphQlTransport>,
}

impl UserApi {
    pub fn new(transport: Arc<dyn GraphQlTransport>) -> Self {
        Self { transport }
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        let client = HttpGraphQlClient::with_timeout(settings.endpoint()?, settings.request_timeout())?;
        Ok(Self::new(Arc::new(client)))
    }

    pub async fn list_users(
        &self,
        operation: ReadOperation,
        filter: &UserFilter,
    ) -> Result<Vec<UserRecord>, ClientError> {
        let data: UserListData = self.run(operation.request(filter)).await?;
        let users = data.into_records();
        debug!(
            operation = operation.operation_name(),
            count = users.len(),
            "user list fetched"
        );
        Ok(users)
    }

    pub async fn get_users(&self, filter: &UserFilter) -> Result<Vec<UserRecord>, ClientError> {
        self.list_users(ReadOperation::GetUser, filter).await
    }

    pub async fn get_user_feedback(
        &self,
        filter: &UserFilter,
    ) -> Result<Vec<UserRecord>, ClientError> {
        self.list_users(ReadOperation::GetUserFeedback, filter).await
    }

    pub async fn save_user(&self, input: &UserInput) -> Result<UserRecord, ClientError> {
        self.write(WriteOperation::SaveUser, input).await
    }

    pub async fn save_user_feedback(
        &self,
        input: &UserFeedbackInput,
    ) -> Result<UserRecord, ClientError> {
        self.write(WriteOperation::SaveUserFeedback, input).await
    }

    async fn write<I: serde::Serialize>(
        &self,
        operation: WriteOperation,
        input: &I,
    ) -> Result<UserRecord, ClientError> {
        let input = serde_json::to_value(input).map_err(|err| ClientError::Decode(err.to_string()))?;
        let data: SavedUserData = self.run(operation.request(input)).await?;
        Ok(data.user)
    }

    async fn run<T: DeserializeOwned>(&self, request: GraphQlRequest) -> Result<T, ClientError> {
        let operation = request
            .operation_name
            .clone()
            .unwrap_or_else(|| "anonymous".to_string());
        let result = self.execute(request).await;
        if let Err(err) = &result {
            warn!(%operation, kind = err.kind(), error = %err, "graphql operation failed");
        }
        result
    }

    async fn execute<T: DeserializeOwned>(&self, request: GraphQlRequest) -> Result<T, ClientError> {
        let envelope = self.transport.execute(request).await?;
        if !envelope.errors.is_empty() {
            return Err(GraphQlErrors::new(envelope.errors).into());
        }
        let data = envelope.data.ok_or(ClientError::MissingData)?;
        if data.is_null() {
            return Err(ClientError::MissingData);
        }
        serde_json::from_value(data).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
