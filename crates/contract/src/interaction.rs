use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use shared::protocol::GraphQlRequest;

use crate::{error::ContractError, matchers::Matcher};

/// Expected GraphQL-over-HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: String,
    pub path: String,
    pub operation_name: Option<String>,
    pub query: String,
    pub variables: Map<String, Value>,
}

impl RequestSpec {
    /// Request body as recorded in the pact file.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        if let Some(operation_name) = &self.operation_name {
            body.insert("operationName".into(), json!(operation_name));
        }
        body.insert("query".into(), json!(self.query));
        body.insert("variables".into(), Value::Object(self.variables.clone()));
        Value::Object(body)
    }

    /// Everything about the actual request that disagrees with this spec.
    /// An empty list means the request matches.
    pub fn mismatches(&self, method: &str, path: &str, body: &Value) -> Vec<String> {
        let mut mismatches = Vec::new();
        if !self.method.eq_ignore_ascii_case(method) {
            mismatches.push(format!("method: expected {}, got {method}", self.method));
        }
        if self.path != path {
            mismatches.push(format!("path: expected {}, got {path}", self.path));
        }

        let request: GraphQlRequest = match serde_json::from_value(body.clone()) {
            Ok(request) => request,
            Err(error) => {
                mismatches.push(format!("body: not a GraphQL request ({error})"));
                return mismatches;
            }
        };
        if let Some(expected) = &self.operation_name {
            if request.operation_name.as_deref() != Some(expected.as_str()) {
                mismatches.push(format!(
                    "operationName: expected {expected}, got {}",
                    request.operation_name.as_deref().unwrap_or("none")
                ));
            }
        }
        if normalize_query(&self.query) != normalize_query(&request.query) {
            mismatches.push(format!(
                "query: expected `{}`, got `{}`",
                normalize_query(&self.query),
                normalize_query(&request.query)
            ));
        }
        if self.variables != request.variables {
            mismatches.push(format!(
                "variables: expected {}, got {}",
                Value::Object(self.variables.clone()),
                Value::Object(request.variables)
            ));
        }
        mismatches
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Matcher,
}

/// A registered request/response pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub description: String,
    pub provider_state: Option<String>,
    pub request: RequestSpec,
    pub response: ResponseSpec,
}

/// Builder for a GraphQL interaction.
#[derive(Debug, Clone)]
pub struct GraphQlInteraction {
    description: Option<String>,
    provider_state: Option<String>,
    method: String,
    path: String,
    operation_name: Option<String>,
    query: Option<String>,
    variables: Map<String, Value>,
    response: Option<ResponseSpec>,
}

impl Default for GraphQlInteraction {
    fn default() -> Self {
        Self {
            description: None,
            provider_state: None,
            method: "POST".into(),
            path: "/graphql".into(),
            operation_name: None,
            query: None,
            variables: Map::new(),
            response: None,
        }
    }
}

impl GraphQlInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn given(mut self, provider_state: impl Into<String>) -> Self {
        self.provider_state = Some(provider_state.into());
        self
    }

    pub fn upon_receiving(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self.path = path.into();
        self
    }

    pub fn with_operation(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = match variables {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self
    }

    pub fn will_respond_with<K, V>(
        mut self,
        status: u16,
        headers: impl IntoIterator<Item = (K, V)>,
        body: Matcher,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.response = Some(ResponseSpec {
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            body,
        });
        self
    }

    pub fn build(self) -> Result<Interaction, ContractError> {
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ContractError::InvalidInteraction("missing description".into()))?;
        let query = self
            .query
            .filter(|q| !normalize_query(q).is_empty())
            .ok_or_else(|| {
                ContractError::InvalidInteraction(format!("'{description}' has no query"))
            })?;
        check_balanced(&query).map_err(|reason| {
            ContractError::InvalidInteraction(format!("'{description}' query {reason}"))
        })?;
        let response = self.response.ok_or_else(|| {
            ContractError::InvalidInteraction(format!("'{description}' has no response"))
        })?;
        if !(100..=599).contains(&response.status) {
            return Err(ContractError::InvalidInteraction(format!(
                "'{description}' responds with invalid status {}",
                response.status
            )));
        }

        Ok(Interaction {
            description,
            provider_state: self.provider_state,
            request: RequestSpec {
                method: self.method,
                path: self.path,
                operation_name: self.operation_name,
                query,
                variables: self.variables,
            },
            response,
        })
    }
}

/// Lexical tokens of a GraphQL document. Whitespace, commas and comments
/// are insignificant and never produced.
fn tokenize(query: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = query.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() || c == ',' || c == '\u{feff}' => {}
            '#' => {
                for next in chars.by_ref() {
                    if next == '\n' || next == '\r' {
                        break;
                    }
                }
            }
            '"' => {
                let mut literal = String::from('"');
                let mut escaped = false;
                for next in chars.by_ref() {
                    literal.push(next);
                    if escaped {
                        escaped = false;
                    } else if next == '\\' {
                        escaped = true;
                    } else if next == '"' {
                        break;
                    }
                }
                tokens.push(literal);
            }
            '.' => {
                let mut spread = String::from('.');
                while chars.peek() == Some(&'.') {
                    spread.push('.');
                    chars.next();
                }
                tokens.push(spread);
            }
            c if c.is_alphanumeric() || c == '_' || c == '-' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric()
                        || next == '_'
                        || (next == '.' && word_is_number(&word))
                    {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(word);
            }
            other => tokens.push(other.to_string()),
        }
    }
    tokens
}

fn word_is_number(word: &str) -> bool {
    word.trim_start_matches('-')
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

/// Canonical single-line form of a GraphQL document. Two documents that
/// differ only in whitespace, commas or comments normalize identically, and
/// a `query Name` header without variable definitions is equivalent to the
/// anonymous `{ ... }` shorthand.
pub fn normalize_query(query: &str) -> String {
    let tokens = tokenize(query);
    let body = match tokens.as_slice() {
        [keyword, name, brace, ..] if keyword == "query" && brace == "{" && is_name(name) => {
            &tokens[2..]
        }
        [keyword, brace, ..] if keyword == "query" && brace == "{" => &tokens[1..],
        _ => &tokens[..],
    };
    body.join(" ")
}

fn is_name(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
}

fn check_balanced(query: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    for token in tokenize(query) {
        match token.as_str() {
            "{" | "(" | "[" => stack.push(token),
            "}" | ")" | "]" => {
                let open = match token.as_str() {
                    "}" => "{",
                    ")" => "(",
                    _ => "[",
                };
                if stack.pop().as_deref() != Some(open) {
                    return Err(format!("has an unmatched '{token}'"));
                }
            }
            _ => {}
        }
    }
    match stack.last() {
        Some(open) => Err(format!("has an unclosed '{open}'")),
        None => Ok(()),
    }
}

/// Regex recorded as the pact's `$.body.query` rule: the canonical tokens
/// separated by optional whitespace or commas.
pub fn query_regex(query: &str) -> String {
    let separator = r"[\s,]*";
    let tokens: Vec<String> = normalize_query(query)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(escape_regex)
        .collect();
    format!(r"^{separator}(query{separator}\w*{separator})?{}{separator}$", tokens.join(separator))
}

fn escape_regex(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len());
    for c in token.chars() {
        if r"\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
#[path = "tests/interaction_tests.rs"]
mod tests;
