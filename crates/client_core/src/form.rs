//! Form view model: field edits go into a draft, an explicit submit turns the
//! draft snapshot into one mutation.

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use shared::domain::{UserFeedbackInput, UserInput, UserRecord};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{ClientError, UserApi, UserListView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormField {
    FirstName,
    LastName,
    Email,
    JobTitle,
    Feedback,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::JobTitle,
        Self::Feedback,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::JobTitle => "jobTitle",
            Self::Feedback => "feedback",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormField {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| FormError::UnknownField(s.to_string()))
    }
}

const CREATE_USER_FIELDS: &[FormField] = &[
    FormField::FirstName,
    FormField::LastName,
    FormField::Email,
    FormField::JobTitle,
];
const FEEDBACK_FIELDS: &[FormField] = &FormField::ALL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    CreateUser,
    Feedback,
}

impl FormKind {
    pub fn fields(self) -> &'static [FormField] {
        match self {
            Self::CreateUser => CREATE_USER_FIELDS,
            Self::Feedback => FEEDBACK_FIELDS,
        }
    }

    pub fn accepts(self, field: FormField) -> bool {
        self.fields().contains(&field)
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateUser => f.write_str("create user"),
            Self::Feedback => f.write_str("feedback"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown form field '{0}'")]
    UnknownField(String),
    #[error("field '{field}' is not part of the {kind} form")]
    FieldNotInForm { field: FormField, kind: FormKind },
}

/// Current text of each edited field. Fields never edited are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDraft {
    values: BTreeMap<FormField, String>,
}

impl FormDraft {
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn text(&self, field: FormField) -> String {
        self.get(field).unwrap_or_default().to_string()
    }

    pub fn to_user_input(&self) -> UserInput {
        UserInput {
            first_name: self.text(FormField::FirstName),
            last_name: self.text(FormField::LastName),
            email: self.text(FormField::Email),
            job_title: self.get(FormField::JobTitle).map(str::to_string),
        }
    }

    pub fn to_feedback_input(&self) -> UserFeedbackInput {
        UserFeedbackInput {
            first_name: self.text(FormField::FirstName),
            last_name: self.text(FormField::LastName),
            email: self.text(FormField::Email),
            job_title: self.get(FormField::JobTitle).map(str::to_string),
            feedback: self.text(FormField::Feedback),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Succeeded(UserRecord),
    Failed(String),
}

/// What happens after a successful submit. The default keeps the draft and
/// leaves the list alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitPolicy {
    pub clear_draft_on_success: bool,
    pub refetch_after_success: bool,
}

pub struct FormBinder {
    api: UserApi,
    kind: FormKind,
    policy: SubmitPolicy,
    draft: watch::Sender<FormDraft>,
    outcome: watch::Sender<SubmitState>,
    list: Option<Arc<UserListView>>,
}

impl FormBinder {
    pub fn new(api: UserApi, kind: FormKind) -> Self {
        let (draft, _) = watch::channel(FormDraft::default());
        let (outcome, _) = watch::channel(SubmitState::Idle);
        Self {
            api,
            kind,
            policy: SubmitPolicy::default(),
            draft,
            outcome,
            list: None,
        }
    }

    pub fn with_policy(mut self, policy: SubmitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// List refetched after a successful submit when the policy asks for it.
    pub fn attach_list(mut self, list: Arc<UserListView>) -> Self {
        self.list = Some(list);
        self
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.policy
    }

    pub fn edit(&self, field: FormField, value: impl Into<String>) -> Result<(), FormError> {
        if !self.kind.accepts(field) {
            return Err(FormError::FieldNotInForm {
                field,
                kind: self.kind,
            });
        }
        let value = value.into();
        self.draft.send_modify(|draft| draft.set(field, value));
        Ok(())
    }

    pub fn edit_named(&self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        self.edit(name.parse()?, value)
    }

    pub fn draft(&self) -> FormDraft {
        self.draft.borrow().clone()
    }

    pub fn outcome(&self) -> SubmitState {
        self.outcome.borrow().clone()
    }

    pub fn subscribe_draft(&self) -> watch::Receiver<FormDraft> {
        self.draft.subscribe()
    }

    pub fn subscribe_outcome(&self) -> watch::Receiver<SubmitState> {
        self.outcome.subscribe()
    }

    /// Sends one mutation built from the draft as it is right now. Values are
    /// not validated. Failures are returned and also published as
    /// [`SubmitState::Failed`].
    pub async fn submit(&self) -> Result<UserRecord, ClientError> {
        let snapshot = self.draft();
        self.outcome.send_replace(SubmitState::Submitting);

        let result = match self.kind {
            FormKind::CreateUser => self.api.save_user(&snapshot.to_user_input()).await,
            FormKind::Feedback => {
                self.api
                    .save_user_feedback(&snapshot.to_feedback_input())
                    .await
            }
        };

        match &result {
            Ok(user) => {
                info!(form = %self.kind, user_id = %user.id, "form submitted");
                self.outcome.send_replace(SubmitState::Succeeded(user.clone()));
                if self.policy.clear_draft_on_success {
                    self.draft.send_replace(FormDraft::default());
                }
                if self.policy.refetch_after_success {
                    if let Some(list) = &self.list {
                        list.refetch();
                    }
                }
            }
            Err(err) => {
                warn!(form = %self.kind, kind = err.kind(), error = %err, "form submit failed");
                self.outcome.send_replace(SubmitState::Failed(err.to_string()));
            }
        }

        result
    }
}

#[cfg(test)]
#[path = "tests/form_tests.rs"]
mod tests;
