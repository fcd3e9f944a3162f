use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    error::GraphQlError,
    protocol::{GraphQlRequest, GraphQlResponse},
};
use tokio::sync::{watch, Notify};

use crate::{ClientError, GraphQlTransport, UserApi};

#[derive(Clone)]
pub(crate) struct Reply {
    gate: Option<Arc<Notify>>,
    outcome: Result<GraphQlResponse<Value>, ClientError>,
}

impl Reply {
    pub(crate) fn data(data: Value) -> Self {
        Self {
            gate: None,
            outcome: Ok(GraphQlResponse {
                data: Some(data),
                errors: Vec::new(),
            }),
        }
    }

    pub(crate) fn errors(messages: &[&str]) -> Self {
        Self {
            gate: None,
            outcome: Ok(GraphQlResponse {
                data: None,
                errors: messages.iter().map(|m| GraphQlError::new(*m)).collect(),
            }),
        }
    }

    pub(crate) fn transport(message: &str) -> Self {
        Self {
            gate: None,
            outcome: Err(ClientError::Transport(message.to_string())),
        }
    }

    /// Holds the reply back until `gate` is notified.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// In-process transport double: replays scripted replies in order, repeating
/// the last one, and records every request.
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GraphQlRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<GraphQlRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl GraphQlTransport for ScriptedTransport {
    async fn execute(&self, request: GraphQlRequest) -> Result<GraphQlResponse<Value>, ClientError> {
        self.requests.lock().expect("requests lock").push(request);
        let reply = {
            let mut replies = self.replies.lock().expect("replies lock");
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        }
        .expect("no scripted reply left");

        if let Some(gate) = &reply.gate {
            gate.notified().await;
        }
        reply.outcome
    }
}

pub(crate) fn api(transport: &Arc<ScriptedTransport>) -> UserApi {
    UserApi::new(transport.clone())
}

pub(crate) fn user_json(id: i64, first_name: &str, last_name: &str, email: &str) -> Value {
    json!({
        "id": id,
        "firstName": first_name,
        "lastName": last_name,
        "email": email,
    })
}

pub(crate) fn users_data(users: Vec<Value>) -> Value {
    json!({ "GetUser": users })
}

pub(crate) async fn wait_until<T: Clone>(
    rx: &mut watch::Receiver<T>,
    predicate: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("publisher dropped")
        .clone()
}
