//! List view model: one read request per mount, state published through a
//! watch channel.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};

use shared::{
    domain::{UserFilter, UserRecord},
    protocol::ReadOperation,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::{QueryResult, UserApi};

struct ListShared {
    api: UserApi,
    operation: ReadOperation,
    filter: UserFilter,
    state: watch::Sender<QueryResult<UserRecord>>,
    generation: AtomicU64,
}

impl ListShared {
    async fn load(&self) -> QueryResult<UserRecord> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_if_modified(|state| {
            if state.is_pending() {
                false
            } else {
                *state = QueryResult::Pending;
                true
            }
        });

        let result = QueryResult::from(self.api.list_users(self.operation, &self.filter).await);

        // Overlapping fetches: only the most recently issued one publishes.
        // The check runs under the channel lock so a newer load's Pending
        // cannot be overwritten in between.
        let published = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = result.clone();
            true
        });
        if !published {
            debug!(
                operation = self.operation.operation_name(),
                generation, "discarding superseded user list response"
            );
        }
        result
    }
}

pub struct UserListView {
    shared: Arc<ListShared>,
    mounted: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl UserListView {
    pub fn new(api: UserApi, operation: ReadOperation, filter: UserFilter) -> Self {
        let (state, _) = watch::channel(QueryResult::Pending);
        Self {
            shared: Arc::new(ListShared {
                api,
                operation,
                filter,
                state,
                generation: AtomicU64::new(0),
            }),
            mounted: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn operation(&self) -> ReadOperation {
        self.shared.operation
    }

    pub fn filter(&self) -> &UserFilter {
        &self.shared.filter
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryResult<UserRecord>> {
        self.shared.state.subscribe()
    }

    pub fn current(&self) -> QueryResult<UserRecord> {
        self.shared.state.borrow().clone()
    }

    /// Issues the initial read. Mounting an already mounted view does nothing.
    pub fn mount(&self) {
        if self.mounted.swap(true, Ordering::SeqCst) {
            debug!(
                operation = self.shared.operation.operation_name(),
                "user list already mounted"
            );
            return;
        }
        self.spawn_load();
    }

    /// Issues one more read request.
    pub fn refetch(&self) {
        self.mounted.store(true, Ordering::SeqCst);
        self.spawn_load();
    }

    /// Runs a read in the caller's task and returns its outcome.
    pub async fn load(&self) -> QueryResult<UserRecord> {
        self.shared.load().await
    }

    /// Aborts in-flight reads so nothing is published after teardown.
    pub fn unmount(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
        self.mounted.store(false, Ordering::SeqCst);
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }

    fn spawn_load(&self) {
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            shared.load().await;
        });
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }
}

impl Drop for UserListView {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
#[path = "tests/user_list_tests.rs"]
mod tests;
