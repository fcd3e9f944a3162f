//! Plain-text rendering of the view models and the observer loop that drives
//! it.

use shared::domain::UserRecord;
use tokio::{sync::watch, task::JoinHandle};

use crate::{QueryResult, SubmitState};

pub const LIST_HEADER: &str = "List of Users";
pub const LOADING_TEXT: &str = "Loading...";
pub const EMPTY_TEXT: &str = "No users found.";

pub fn render_user_list(state: &QueryResult<UserRecord>) -> String {
    match state {
        QueryResult::Pending => LOADING_TEXT.to_string(),
        QueryResult::Failed(message) => format!("Error : {message}"),
        QueryResult::Ready(users) if users.is_empty() => EMPTY_TEXT.to_string(),
        QueryResult::Ready(users) => {
            let mut out = String::from(LIST_HEADER);
            for user in users {
                out.push('\n');
                out.push_str(&render_user_row(user));
            }
            out
        }
    }
}

pub fn render_user_row(user: &UserRecord) -> String {
    let mut row = format!("{} {} <{}>", user.first_name, user.last_name, user.email);
    if let Some(job_title) = user.job_title.as_deref().filter(|t| !t.is_empty()) {
        row.push_str(&format!(" - {job_title}"));
    }
    if let Some(created_at) = user.created_at {
        row.push_str(&format!(" ({})", created_at.format("%Y-%m-%d %H:%M")));
    }
    if let Some(feedback) = user.feedback.as_deref().filter(|f| !f.is_empty()) {
        row.push_str(&format!("\n    \"{feedback}\""));
    }
    row
}

pub fn render_submit_state(state: &SubmitState) -> String {
    match state {
        SubmitState::Idle => String::new(),
        SubmitState::Submitting => "Submitting...".to_string(),
        SubmitState::Succeeded(user) => format!(
            "Saved {} {} (id {})",
            user.first_name, user.last_name, user.id
        ),
        SubmitState::Failed(message) => format!("Error : {message}"),
    }
}

/// Calls `render` with the current value and again after every change. The
/// task ends once the publishing side is dropped.
pub fn spawn_renderer<T, F>(mut rx: watch::Receiver<T>, mut render: F) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    F: FnMut(&T) + Send + 'static,
{
    tokio::spawn(async move {
        let initial = rx.borrow_and_update().clone();
        render(&initial);
        while rx.changed().await.is_ok() {
            let value = rx.borrow_and_update().clone();
            render(&value);
        }
    })
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
