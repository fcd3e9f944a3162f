//! Interactions the user-feedback consumer relies on.

use serde_json::json;

use crate::{
    error::ContractError,
    interaction::{GraphQlInteraction, Interaction},
    matchers::{array, like, object, Matcher},
};

pub const GET_USERS_DESCRIPTION: &str = "a list of users";

pub const GET_USERS_QUERY: &str = r#"
    {
        GetUser(filter: {
            firstName: "Aleena"
        }){
            id
            firstName
            lastName
            email
        }
    }
"#;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// The user served by the GetUsers interaction.
pub fn example_user() -> Matcher {
    object([
        ("id", like(123)),
        ("firstName", like("John")),
        ("lastName", like("Doe")),
        ("email", like("john@gmail.com")),
    ])
}

pub fn get_users_interaction() -> Result<Interaction, ContractError> {
    GraphQlInteraction::new()
        .upon_receiving(GET_USERS_DESCRIPTION)
        .with_request("POST", "/graphql")
        .with_operation("GetUsers")
        .with_query(GET_USERS_QUERY)
        .with_variables(json!({}))
        .will_respond_with(
            200,
            [("Content-Type", JSON_CONTENT_TYPE)],
            object([(
                "data",
                object([("items", array([object([("user", example_user())])]))]),
            )]),
        )
        .build()
}
