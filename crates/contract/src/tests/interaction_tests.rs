use serde_json::json;

use super::*;
use crate::matchers::like;

const SPACED: &str = r#"
    {
        GetUser(filter: {
            firstName: "Aleena"
        }){
            id
            firstName
        }
    }
"#;

fn interaction() -> Interaction {
    GraphQlInteraction::new()
        .upon_receiving("a list of users")
        .with_request("post", "/graphql")
        .with_operation("GetUsers")
        .with_query(SPACED)
        .with_variables(json!({}))
        .will_respond_with(
            200,
            [("Content-Type", "application/json")],
            like(json!({"ok": true})),
        )
        .build()
        .expect("valid interaction")
}

#[test]
fn normalization_ignores_layout_commas_and_comments() {
    let compact = "{GetUser(filter:{firstName:\"Aleena\"}){id,firstName}}";
    let commented = "# list\n{ GetUser(filter: {firstName: \"Aleena\"}) { id # key\n firstName } }";

    assert_eq!(normalize_query(SPACED), normalize_query(compact));
    assert_eq!(normalize_query(SPACED), normalize_query(commented));
    assert_eq!(
        normalize_query(compact),
        "{ GetUser ( filter : { firstName : \"Aleena\" } ) { id firstName } }"
    );
}

#[test]
fn named_query_header_matches_shorthand() {
    let named = "query GetUsers {\n  GetUser(filter: {firstName: \"Aleena\"}) {\n    id\n    firstName\n  }\n}\n";
    assert_eq!(normalize_query(named), normalize_query(SPACED));
}

#[test]
fn string_contents_stay_significant() {
    assert_ne!(
        normalize_query("{ GetUser(filter: {firstName: \"A, B\"}) { id } }"),
        normalize_query("{ GetUser(filter: {firstName: \"A B\"}) { id } }")
    );
}

#[test]
fn builder_uppercases_method_and_keeps_defaults() {
    let interaction = interaction();
    assert_eq!(interaction.request.method, "POST");
    assert_eq!(interaction.request.path, "/graphql");
    assert_eq!(interaction.request.operation_name.as_deref(), Some("GetUsers"));
    assert_eq!(interaction.response.headers["Content-Type"], "application/json");
}

#[test]
fn build_rejects_incomplete_interactions() {
    let missing_query = GraphQlInteraction::new()
        .upon_receiving("nothing")
        .will_respond_with(200, [("a", "b")], like(1))
        .build();
    assert!(matches!(
        missing_query,
        Err(ContractError::InvalidInteraction(_))
    ));

    let unbalanced = GraphQlInteraction::new()
        .upon_receiving("broken")
        .with_query("{ GetUser { id }")
        .will_respond_with(200, [("a", "b")], like(1))
        .build()
        .expect_err("unbalanced query");
    assert_eq!(
        unbalanced.to_string(),
        "invalid interaction: 'broken' query has an unclosed '{'"
    );

    let no_response = GraphQlInteraction::new()
        .upon_receiving("silent")
        .with_query("{ a }")
        .build();
    assert!(no_response.is_err());
}

#[test]
fn request_matches_regardless_of_layout() {
    let interaction = interaction();
    let body = json!({
        "operationName": "GetUsers",
        "query": "query GetUsers { GetUser(filter: {firstName: \"Aleena\"}) { id firstName } }",
        "variables": {}
    });
    assert!(interaction
        .request
        .mismatches("POST", "/graphql", &body)
        .is_empty());

    // Missing variables decode as an empty map.
    let without_variables = json!({
        "operationName": "GetUsers",
        "query": SPACED
    });
    assert!(interaction
        .request
        .mismatches("post", "/graphql", &without_variables)
        .is_empty());
}

#[test]
fn request_mismatches_are_all_reported() {
    let interaction = interaction();
    let body = json!({
        "operationName": "GetUserFeedback",
        "query": "{ GetUser { id } }",
        "variables": {"limit": 1}
    });

    let mismatches = interaction.request.mismatches("GET", "/other", &body);
    assert_eq!(mismatches.len(), 5);
    assert!(mismatches[0].starts_with("method"));
    assert!(mismatches[1].starts_with("path"));
    assert!(mismatches[2].starts_with("operationName"));
    assert!(mismatches[3].starts_with("query"));
    assert!(mismatches[4].starts_with("variables"));

    let not_graphql = interaction
        .request
        .mismatches("POST", "/graphql", &json!("hello"));
    assert_eq!(not_graphql.len(), 1);
}

#[test]
fn request_body_records_operation_query_and_variables() {
    let body = interaction().request.body();
    assert_eq!(body["operationName"], "GetUsers");
    assert_eq!(body["query"], SPACED);
    assert_eq!(body["variables"], json!({}));
}

#[test]
fn query_regex_escapes_punctuation() {
    let regex = query_regex("{ GetUser(filter: {firstName: \"A\"}) { id } }");
    assert!(regex.starts_with('^'));
    assert!(regex.ends_with('$'));
    assert!(regex.contains(r"GetUser[\s,]*\([\s,]*filter"));
    assert!(regex.contains(r"\{[\s,]*id[\s,]*\}"));
}
