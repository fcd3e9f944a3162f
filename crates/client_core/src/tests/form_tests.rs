use serde_json::{json, Value};
use shared::{domain::UserFilter, protocol::ReadOperation};

use super::*;
use crate::{
    test_support::{api, users_data, wait_until, Reply, ScriptedTransport},
    QueryResult,
};

fn saved_user(field: &str) -> Value {
    json!({
        field: {
            "id": 9,
            "firstName": "Jane",
            "lastName": "Roe",
            "email": "jane@test.com"
        }
    })
}

fn fill(form: &FormBinder) {
    form.edit(FormField::FirstName, "Jane").expect("first name");
    form.edit(FormField::LastName, "Roe").expect("last name");
    form.edit(FormField::Email, "jane@test.com").expect("email");
    form.edit(FormField::JobTitle, "Engineer").expect("job title");
}

#[test]
fn field_names_parse_to_fields() {
    for field in FormField::ALL {
        assert_eq!(field.name().parse::<FormField>(), Ok(field));
    }
    assert_eq!(
        "nickname".parse::<FormField>(),
        Err(FormError::UnknownField("nickname".into()))
    );
}

#[test]
fn draft_without_edits_builds_blank_input() {
    let input = FormDraft::default().to_user_input();
    assert_eq!(input.first_name, "");
    assert_eq!(input.job_title, None);
}

#[tokio::test]
async fn each_edit_overwrites_only_its_field() {
    let transport = ScriptedTransport::new([Reply::data(saved_user("saveUser"))]);
    let form = FormBinder::new(api(&transport), FormKind::CreateUser);

    form.edit(FormField::FirstName, "J").expect("edit");
    form.edit(FormField::FirstName, "Ja").expect("edit");
    form.edit_named("email", "ja@test.com").expect("edit");

    let draft = form.draft();
    assert_eq!(draft.get(FormField::FirstName), Some("Ja"));
    assert_eq!(draft.get(FormField::Email), Some("ja@test.com"));
    assert_eq!(draft.get(FormField::LastName), None);
    // Editing never talks to the server.
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn create_form_rejects_feedback_field() {
    let transport = ScriptedTransport::new([Reply::data(saved_user("saveUser"))]);
    let form = FormBinder::new(api(&transport), FormKind::CreateUser);

    let err = form
        .edit(FormField::Feedback, "hello")
        .expect_err("not a create-user field");
    assert_eq!(
        err.to_string(),
        "field 'feedback' is not part of the create user form"
    );
    assert!(matches!(
        form.edit_named("nickname", "x"),
        Err(FormError::UnknownField(_))
    ));
}

#[tokio::test]
async fn submit_sends_one_mutation_with_values_at_submit_time() {
    let transport = ScriptedTransport::new([Reply::data(saved_user("saveUser"))]);
    let form = FormBinder::new(api(&transport), FormKind::CreateUser);

    form.edit(FormField::FirstName, "Stale").expect("edit");
    fill(&form);

    let saved = form.submit().await.expect("submit");
    assert_eq!(saved.first_name, "Jane");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].operation_name.as_deref(), Some("SaveUser"));
    assert_eq!(
        requests[0].variables["input"],
        json!({
            "firstName": "Jane",
            "lastName": "Roe",
            "email": "jane@test.com",
            "jobTitle": "Engineer"
        })
    );
}

#[tokio::test]
async fn feedback_form_includes_feedback_text() {
    let transport = ScriptedTransport::new([Reply::data(saved_user("SaveUserFeedback"))]);
    let form = FormBinder::new(api(&transport), FormKind::Feedback);
    fill(&form);
    form.edit(FormField::Feedback, "This is a feedback").expect("edit");

    form.submit().await.expect("submit");

    let request = &transport.requests()[0];
    assert_eq!(request.operation_name.as_deref(), Some("SaveUserFeedback"));
    assert_eq!(request.variables["input"]["feedback"], "This is a feedback");
}

#[tokio::test]
async fn draft_is_kept_after_success_by_default() {
    let transport = ScriptedTransport::new([Reply::data(saved_user("saveUser"))]);
    let form = FormBinder::new(api(&transport), FormKind::CreateUser);
    fill(&form);
    let before = form.draft();

    form.submit().await.expect("submit");

    assert_eq!(form.draft(), before);
    assert!(matches!(form.outcome(), SubmitState::Succeeded(_)));
}

#[tokio::test]
async fn clear_policy_resets_draft_after_success() {
    let transport = ScriptedTransport::new([Reply::data(saved_user("saveUser"))]);
    let form = FormBinder::new(api(&transport), FormKind::CreateUser).with_policy(SubmitPolicy {
        clear_draft_on_success: true,
        refetch_after_success: false,
    });
    fill(&form);

    form.submit().await.expect("submit");

    assert!(form.draft().is_empty());
}

#[tokio::test]
async fn failure_is_returned_and_published() {
    let transport = ScriptedTransport::new([Reply::errors(&["failed to save user"])]);
    let form = FormBinder::new(api(&transport), FormKind::Feedback).with_policy(SubmitPolicy {
        clear_draft_on_success: true,
        refetch_after_success: false,
    });
    fill(&form);
    let mut outcome = form.subscribe_outcome();

    let err = form.submit().await.expect_err("must fail");

    assert_eq!(err.to_string(), "failed to save user");
    assert_eq!(
        wait_until(&mut outcome, |s| matches!(s, SubmitState::Failed(_))).await,
        SubmitState::Failed("failed to save user".into())
    );
    // A failed submit never clears the draft.
    assert!(!form.draft().is_empty());
}

#[tokio::test]
async fn repeated_submits_are_independent_requests() {
    let transport = ScriptedTransport::new([Reply::data(saved_user("saveUser"))]);
    let form = FormBinder::new(api(&transport), FormKind::CreateUser);
    fill(&form);

    let (first, second) = tokio::join!(form.submit(), form.submit());
    first.expect("first");
    second.expect("second");

    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn refetch_policy_reloads_attached_list() {
    let transport = ScriptedTransport::new([
        Reply::data(users_data(Vec::new())),
        Reply::data(saved_user("saveUser")),
        Reply::data(users_data(vec![json!({
            "id": 9,
            "firstName": "Jane",
            "lastName": "Roe",
            "email": "jane@test.com"
        })])),
    ]);
    let list = Arc::new(UserListView::new(
        api(&transport),
        ReadOperation::GetUser,
        UserFilter::default(),
    ));
    let mut rx = list.subscribe();
    list.mount();
    wait_until(&mut rx, QueryResult::is_ready).await;

    let form = FormBinder::new(api(&transport), FormKind::CreateUser)
        .with_policy(SubmitPolicy {
            clear_draft_on_success: false,
            refetch_after_success: true,
        })
        .attach_list(list.clone());
    fill(&form);
    form.submit().await.expect("submit");

    let state = wait_until(&mut rx, |s| s.items().is_some_and(|i| !i.is_empty())).await;
    assert_eq!(state.items().expect("items")[0].first_name, "Jane");
    assert_eq!(transport.request_count(), 3);
}
