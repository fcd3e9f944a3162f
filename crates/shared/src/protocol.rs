use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{UserFilter, UserRecord},
    error::GraphQlError,
};

/// Body of a GraphQL-over-HTTP POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
        }
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

const USER_LIST_FIELDS: &[&str] = &["id", "firstName", "lastName", "email"];
const USER_FEEDBACK_FIELDS: &[&str] = &[
    "id",
    "firstName",
    "lastName",
    "email",
    "jobTitle",
    "feedback",
    "createdAt",
];
const SAVED_USER_FIELDS: &[&str] = &["id", "firstName", "lastName", "email", "jobTitle", "createdAt"];

/// The two read operations exposed by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadOperation {
    #[default]
    GetUser,
    GetUserFeedback,
}

impl ReadOperation {
    pub fn field_name(self) -> &'static str {
        match self {
            Self::GetUser => "GetUser",
            Self::GetUserFeedback => "GetUserFeedback",
        }
    }

    pub fn operation_name(self) -> &'static str {
        match self {
            Self::GetUser => "GetUsers",
            Self::GetUserFeedback => "GetUserFeedback",
        }
    }

    fn selection(self) -> &'static [&'static str] {
        match self {
            Self::GetUser => USER_LIST_FIELDS,
            Self::GetUserFeedback => USER_FEEDBACK_FIELDS,
        }
    }

    /// Query document with the filter inlined as an input object literal.
    pub fn document(self, filter: &UserFilter) -> String {
        let arguments = filter
            .to_graphql_literal()
            .map(|literal| format!("(filter: {literal})"))
            .unwrap_or_default();
        format!(
            "query {} {{\n  {}{} {{\n{}  }}\n}}\n",
            self.operation_name(),
            self.field_name(),
            arguments,
            selection_lines(self.selection(), 4),
        )
    }

    pub fn request(self, filter: &UserFilter) -> GraphQlRequest {
        GraphQlRequest::new(self.document(filter)).with_operation_name(self.operation_name())
    }
}

/// The two write operations exposed by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    SaveUser,
    SaveUserFeedback,
}

impl WriteOperation {
    pub fn field_name(self) -> &'static str {
        match self {
            Self::SaveUser => "saveUser",
            Self::SaveUserFeedback => "SaveUserFeedback",
        }
    }

    pub fn operation_name(self) -> &'static str {
        match self {
            Self::SaveUser => "SaveUser",
            Self::SaveUserFeedback => "SaveUserFeedback",
        }
    }

    fn input_type(self) -> &'static str {
        match self {
            Self::SaveUser => "UserInput",
            Self::SaveUserFeedback => "UserFeedbackInput",
        }
    }

    fn selection(self) -> &'static [&'static str] {
        match self {
            Self::SaveUser => SAVED_USER_FIELDS,
            Self::SaveUserFeedback => USER_FEEDBACK_FIELDS,
        }
    }

    pub fn document(self) -> String {
        format!(
            "mutation {}($input: {}!) {{\n  {}(input: $input) {{\n{}  }}\n}}\n",
            self.operation_name(),
            self.input_type(),
            self.field_name(),
            selection_lines(self.selection(), 4),
        )
    }

    pub fn request(self, input: Value) -> GraphQlRequest {
        GraphQlRequest::new(self.document())
            .with_operation_name(self.operation_name())
            .with_variable("input", input)
    }
}

fn selection_lines(fields: &[&str], indent: usize) -> String {
    fields
        .iter()
        .map(|field| format!("{:indent$}{field}\n", ""))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserItem {
    pub user: UserRecord,
}

/// `data` of a read response. The endpoint answers with the operation field
/// (`GetUser` / `GetUserFeedback`); the consumer contract wraps each record
/// in an `items: [{user}]` envelope. A `null` list is an empty result and
/// `null` entries are skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum UserListData {
    Direct { users: Vec<UserRecord> },
    Items { items: Vec<UserItem> },
}

const LIST_FIELDS: [&str; 3] = ["GetUser", "GetUserFeedback", "items"];

impl<'de> Deserialize<'de> for UserListData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let Some((field, list)) = LIST_FIELDS
            .iter()
            .find_map(|field| fields.remove(*field).map(|list| (*field, list)))
        else {
            let found: Vec<&str> = fields.keys().map(String::as_str).collect();
            return Err(de::Error::custom(format!(
                "expected one of `GetUser`, `GetUserFeedback` or `items` in data, found [{}]",
                found.join(", ")
            )));
        };

        let decode_error = |error: serde_json::Error| -> D::Error {
            de::Error::custom(format!("`{field}`: {error}"))
        };
        if field == "items" {
            let items: Option<Vec<Option<UserItem>>> =
                serde_json::from_value(list).map_err(decode_error)?;
            Ok(Self::Items {
                items: items.into_iter().flatten().flatten().collect(),
            })
        } else {
            let users: Option<Vec<Option<UserRecord>>> =
                serde_json::from_value(list).map_err(decode_error)?;
            Ok(Self::Direct {
                users: users.into_iter().flatten().flatten().collect(),
            })
        }
    }
}

impl UserListData {
    pub fn into_records(self) -> Vec<UserRecord> {
        match self {
            Self::Direct { users } => users,
            Self::Items { items } => items.into_iter().map(|item| item.user).collect(),
        }
    }
}

/// `data` of a write response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedUserData {
    #[serde(rename = "saveUser", alias = "SaveUserFeedback")]
    pub user: UserRecord,
}
