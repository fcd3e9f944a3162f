use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned identifier. The user list hands out integers while the
/// feedback store hands out string ids, so the client keeps it opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, alias = "createAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Nullable GraphQL scalars decode to the type's default instead of failing
/// the whole record.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Field-level equality filter for the read operations. An empty filter
/// selects every user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

impl UserFilter {
    pub fn by_first_name(first_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.email.is_none() && self.first_name.is_none()
    }

    /// Renders the filter as a GraphQL input object literal, e.g.
    /// `{firstName: "Aleena"}`. Returns `None` for the empty filter.
    pub fn to_graphql_literal(&self) -> Option<String> {
        let fields: Vec<String> = [
            ("id", self.id.as_deref()),
            ("email", self.email.as_deref()),
            ("firstName", self.first_name.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value.map(|value| format!("{name}: {}", graphql_string(value)))
        })
        .collect();

        if fields.is_empty() {
            None
        } else {
            Some(format!("{{{}}}", fields.join(", ")))
        }
    }
}

fn graphql_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Input of the `saveUser` mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

/// Input of the `SaveUserFeedback` mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFeedbackInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    pub feedback: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_literal() {
        assert!(UserFilter::default().is_empty());
        assert_eq!(UserFilter::default().to_graphql_literal(), None);
    }

    #[test]
    fn filter_literal_escapes_strings() {
        let filter = UserFilter::by_first_name("Al \"the\" een\\a");
        assert_eq!(
            filter.to_graphql_literal().as_deref(),
            Some(r#"{firstName: "Al \"the\" een\\a"}"#)
        );
    }

    #[test]
    fn user_id_accepts_integer_and_string_ids() {
        let int: UserId = serde_json::from_str("123").expect("int id");
        let text: UserId = serde_json::from_str("\"a1b2\"").expect("text id");
        assert_eq!(int, UserId::Int(123));
        assert_eq!(text.to_string(), "a1b2");
    }

    #[test]
    fn record_tolerates_null_fields() {
        let record: UserRecord = serde_json::from_value(serde_json::json!({
            "id": 7,
            "firstName": "John",
            "lastName": null,
            "email": null,
            "jobTitle": null,
            "createdAt": null
        }))
        .expect("nullable fields");
        assert_eq!(record.first_name, "John");
        assert_eq!(record.last_name, "");
        assert_eq!(record.email, "");
        assert_eq!(record.job_title, None);
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn record_accepts_legacy_create_at_spelling() {
        let record: UserRecord = serde_json::from_value(serde_json::json!({
            "id": "42",
            "firstName": "John",
            "lastName": "Doe",
            "email": "john@test.com",
            "createAt": "2024-01-01T10:00:00+01:00"
        }))
        .expect("record");
        assert_eq!(
            record.created_at.map(|ts| ts.to_rfc3339()).as_deref(),
            Some("2024-01-01T09:00:00+00:00")
        );
        assert_eq!(record.job_title, None);
    }

    #[test]
    fn user_input_omits_missing_job_title() {
        let input = UserInput {
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john@test.com".into(),
            job_title: None,
        };
        let value = serde_json::to_value(&input).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "firstName": "John",
                "lastName": "Doe",
                "email": "john@test.com"
            })
        );
    }
}
