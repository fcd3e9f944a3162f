//! Example bodies mixing literal values with "any value of this shape"
//! matchers.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Must equal the value exactly.
    Literal(Value),
    /// Any value of the same JSON type; the example is served by the mock.
    Like(Value),
    /// Array of at least `min` elements, each matching `template`.
    EachLike { template: Box<Matcher>, min: usize },
    Object(BTreeMap<String, Matcher>),
    Array(Vec<Matcher>),
}

pub fn like(example: impl Into<Value>) -> Matcher {
    Matcher::Like(example.into())
}

pub fn each_like(template: Matcher, min: usize) -> Matcher {
    Matcher::EachLike {
        template: Box::new(template),
        min: min.max(1),
    }
}

pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Matcher)>) -> Matcher {
    Matcher::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

pub fn array(items: impl IntoIterator<Item = Matcher>) -> Matcher {
    Matcher::Array(items.into_iter().collect())
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl Matcher {
    /// Concrete body served by the mock provider.
    pub fn example(&self) -> Value {
        match self {
            Self::Literal(value) | Self::Like(value) => value.clone(),
            Self::EachLike { template, min } => {
                Value::Array((0..*min).map(|_| template.example()).collect())
            }
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.example()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Array(items) => Value::Array(items.iter().map(Matcher::example).collect()),
        }
    }

    /// Pact v2 `matchingRules`, keyed by JSON path below `root`.
    pub fn matching_rules(&self, root: &str) -> BTreeMap<String, Value> {
        let mut rules = BTreeMap::new();
        self.collect_rules(root, &mut rules);
        rules
    }

    fn collect_rules(&self, path: &str, rules: &mut BTreeMap<String, Value>) {
        match self {
            Self::Literal(_) => {}
            Self::Like(_) => {
                rules.insert(path.to_string(), serde_json::json!({"match": "type"}));
            }
            Self::EachLike { template, min } => {
                rules.insert(
                    path.to_string(),
                    serde_json::json!({"match": "type", "min": min}),
                );
                template.collect_rules(&format!("{path}[*]"), rules);
            }
            Self::Object(fields) => {
                for (key, value) in fields {
                    value.collect_rules(&format!("{path}.{key}"), rules);
                }
            }
            Self::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    item.collect_rules(&format!("{path}[{index}]"), rules);
                }
            }
        }
    }

    /// Checks `actual` against this matcher and lists every mismatch found.
    pub fn check(&self, actual: &Value) -> Result<(), Vec<String>> {
        let mut mismatches = Vec::new();
        self.check_at("$", actual, &mut mismatches);
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(mismatches)
        }
    }

    fn check_at(&self, path: &str, actual: &Value, mismatches: &mut Vec<String>) {
        match self {
            Self::Literal(expected) => {
                if expected != actual {
                    mismatches.push(format!("{path}: expected {expected}, got {actual}"));
                }
            }
            Self::Like(example) => {
                if !same_shape(example, actual) {
                    mismatches.push(format!(
                        "{path}: expected a value like {example}, got {actual}"
                    ));
                }
            }
            Self::EachLike { template, min } => match actual {
                Value::Array(items) if items.len() >= *min => {
                    for (index, item) in items.iter().enumerate() {
                        template.check_at(&format!("{path}[{index}]"), item, mismatches);
                    }
                }
                _ => mismatches.push(format!(
                    "{path}: expected an array of at least {min} element(s), got {actual}"
                )),
            },
            Self::Object(fields) => match actual {
                Value::Object(actual_fields) => {
                    for (key, matcher) in fields {
                        let field_path = format!("{path}.{key}");
                        match actual_fields.get(key) {
                            Some(value) => matcher.check_at(&field_path, value, mismatches),
                            None => mismatches.push(format!("{field_path}: missing")),
                        }
                    }
                }
                _ => mismatches.push(format!("{path}: expected an object, got {actual}")),
            },
            Self::Array(items) => match actual {
                Value::Array(actual_items) if actual_items.len() == items.len() => {
                    for (index, (matcher, value)) in items.iter().zip(actual_items).enumerate() {
                        matcher.check_at(&format!("{path}[{index}]"), value, mismatches);
                    }
                }
                _ => mismatches.push(format!(
                    "{path}: expected an array of {} element(s), got {actual}",
                    items.len()
                )),
            },
        }
    }
}

/// Type-level comparison used by `like`: objects recurse on the example's
/// keys, arrays on the first example element.
fn same_shape(example: &Value, actual: &Value) -> bool {
    match (example, actual) {
        (Value::Null, Value::Null) | (Value::Bool(_), Value::Bool(_)) => true,
        (Value::Number(e), Value::Number(a)) => {
            e.is_f64() || (e.is_i64() || e.is_u64()) == (a.is_i64() || a.is_u64())
        }
        (Value::String(_), Value::String(_)) => true,
        (Value::Array(e), Value::Array(a)) => match e.first() {
            Some(first) => a.iter().all(|item| same_shape(first, item)),
            None => true,
        },
        (Value::Object(e), Value::Object(a)) => e
            .iter()
            .all(|(key, value)| a.get(key).is_some_and(|actual| same_shape(value, actual))),
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/matchers_tests.rs"]
mod tests;
