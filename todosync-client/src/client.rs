use std::sync::Arc;

use tracing::{info, warn};

use todosync_core::{
    new_temp_id, NewTask, PendingOp, SyncError, SyncResult, Task, TaskPatch,
};

use crate::api::TaskApi;
use crate::events::{ClientEvent, EventDispatcher, NoticeLevel};
use crate::reconciler;
use crate::store::LocalStore;

/// The task list as the user sees it, with optimistic mutations and a
/// pending queue behind it.
///
/// Every mutation updates the in-memory list first. While offline, or when
/// a request fails with a retryable error, the mutation is queued; toggles
/// and edits additionally roll the list back so the display never lies
/// about server state it claimed to have. Adds and deletes stay applied
/// under their optimistic form.
pub struct TaskListClient<A: TaskApi> {
    api: A,
    store: LocalStore,
    events: Arc<EventDispatcher>,
    tasks: Vec<Task>,
    online: bool,
}

impl<A: TaskApi> TaskListClient<A> {
    pub fn new(api: A, store: LocalStore) -> Self {
        TaskListClient {
            api,
            store,
            events: Arc::new(EventDispatcher::new()),
            tasks: Vec::new(),
            online: true,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn event_dispatcher(&self) -> Arc<EventDispatcher> {
        self.events.clone()
    }

    /// Populate the list: from the server when online (then reconcile any
    /// queued ops), from the cache otherwise. A fetch failure falls back to
    /// a non-empty cache; with nothing cached the error propagates.
    pub async fn load_tasks(&mut self) -> SyncResult<()> {
        if !self.online {
            self.tasks = self.store.load_tasks().await;
            self.events
                .emit_notice(NoticeLevel::Info, "Offline: showing saved tasks");
            return Ok(());
        }

        match self.api.list_tasks().await {
            Ok(mut fetched) => {
                // unconfirmed local adds are not on the server yet; keep
                // them visible until the reconciler pushes them up
                let cached = self.store.load_tasks().await;
                for task in cached {
                    if task.is_temporary && !fetched.iter().any(|t| t.id == task.id) {
                        fetched.push(task);
                    }
                }
                self.tasks = fetched;
                self.store.save_tasks(&self.tasks).await;
                reconciler::run(&self.api, &self.store, &mut self.tasks, &self.events).await;
                Ok(())
            }
            Err(e) => {
                let cached = self.store.load_tasks().await;
                if cached.is_empty() {
                    return Err(e);
                }
                warn!(error = %e, "fetch failed, falling back to cached tasks");
                self.tasks = cached;
                self.events
                    .emit_notice(NoticeLevel::Error, "Could not reach server, showing saved tasks");
                Ok(())
            }
        }
    }

    /// Add a task. The task appears in the list immediately under a
    /// temporary id; the id is replaced once the server confirms. On any
    /// retryable failure the add stays visible and is queued.
    pub async fn add_task(&mut self, mut payload: NewTask) -> SyncResult<Task> {
        payload.title = payload.title.trim().to_string();
        if payload.title.is_empty() {
            return Err(SyncError::Validation("title must not be empty".into()));
        }

        let temp_id = new_temp_id();
        let task = Task::optimistic(&payload, temp_id.clone());
        self.tasks.push(task.clone());
        self.events.emit(ClientEvent::TaskAdded {
            id: task.id.clone(),
            title: task.title.clone(),
        });

        if !self.online {
            self.queue_op(PendingOp::Add {
                temp_id,
                payload,
            })
            .await;
            self.store.save_tasks(&self.tasks).await;
            self.events
                .emit_notice(NoticeLevel::Info, "Offline: task will sync when reconnected");
            return Ok(task);
        }

        match self.api.create_task(&payload).await {
            Ok(confirmed) => {
                // a 2xx with no decodable body keeps the optimistic copy
                let confirmed = confirmed.unwrap_or_else(|| task.clone());
                if let Some(local) = self.tasks.iter_mut().find(|t| t.id == temp_id) {
                    *local = confirmed.clone();
                }
                self.store.save_tasks(&self.tasks).await;
                Ok(confirmed)
            }
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "create failed, queueing add");
                self.queue_op(PendingOp::Add {
                    temp_id,
                    payload,
                })
                .await;
                self.store.save_tasks(&self.tasks).await;
                self.events
                    .emit_notice(NoticeLevel::Error, "Could not reach server, task saved locally");
                Ok(task)
            }
            // a blocked action leaves no optimistic residue behind
            Err(e) => {
                self.tasks.retain(|t| t.id != temp_id);
                self.store.save_tasks(&self.tasks).await;
                Err(e)
            }
        }
    }

    /// Flip a task's completion state. On failure the flip is rolled back
    /// and the intended state queued, so the checkbox reflects what the
    /// server last confirmed.
    pub async fn toggle_task(&mut self, id: &str, completed: bool) -> SyncResult<()> {
        let patch = TaskPatch::completed(completed);
        self.update_with_rollback(id, patch).await
    }

    /// Apply an arbitrary edit, with the same rollback-and-queue behavior
    /// as a toggle. An edit that blanks the title is rejected up front.
    pub async fn edit_task(&mut self, id: &str, mut patch: TaskPatch) -> SyncResult<()> {
        if let Some(title) = &patch.title {
            let trimmed = title.trim().to_string();
            if trimmed.is_empty() {
                return Err(SyncError::Validation("title must not be empty".into()));
            }
            patch.title = Some(trimmed);
        }
        self.update_with_rollback(id, patch).await
    }

    async fn update_with_rollback(&mut self, id: &str, patch: TaskPatch) -> SyncResult<()> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            warn!(id, "update for unknown task ignored");
            return Ok(());
        };

        let before = self.tasks[index].clone();
        self.tasks[index].apply_patch(&patch);
        self.events.emit(ClientEvent::TaskUpdated { id: id.to_string() });

        if !self.online {
            self.queue_op(PendingOp::Update {
                id: id.to_string(),
                payload: patch,
            })
            .await;
            self.store.save_tasks(&self.tasks).await;
            self.events
                .emit_notice(NoticeLevel::Info, "Offline: change will sync when reconnected");
            return Ok(());
        }

        match self.api.update_task(id, &patch).await {
            Ok(()) => {
                self.store.save_tasks(&self.tasks).await;
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                warn!(id, error = %e, "update failed, rolling back and queueing");
                self.tasks[index] = before;
                self.queue_op(PendingOp::Update {
                    id: id.to_string(),
                    payload: patch,
                })
                .await;
                self.store.save_tasks(&self.tasks).await;
                self.events
                    .emit_notice(NoticeLevel::Error, "Could not reach server, change saved locally");
                Ok(())
            }
            Err(e) => {
                self.tasks[index] = before;
                Err(e)
            }
        }
    }

    /// Remove a task. The removal is never rolled back; a failed request
    /// queues the delete and the task stays gone locally.
    pub async fn delete_task(&mut self, id: &str) -> SyncResult<()> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            warn!(id, "delete for unknown task ignored");
            return Ok(());
        };

        let removed = self.tasks.remove(index);
        self.events.emit(ClientEvent::TaskDeleted { id: id.to_string() });

        if !self.online {
            self.queue_op(PendingOp::Delete { id: id.to_string() }).await;
            self.store.save_tasks(&self.tasks).await;
            self.events
                .emit_notice(NoticeLevel::Info, "Offline: deletion will sync when reconnected");
            return Ok(());
        }

        match self.api.delete_task(id).await {
            Ok(()) => {
                self.store.save_tasks(&self.tasks).await;
                Ok(())
            }
            Err(e) if e.is_retryable() => {
                warn!(id, error = %e, "delete failed, queueing");
                self.queue_op(PendingOp::Delete { id: id.to_string() }).await;
                self.store.save_tasks(&self.tasks).await;
                self.events
                    .emit_notice(NoticeLevel::Error, "Could not reach server, deletion saved locally");
                Ok(())
            }
            Err(e) => {
                self.tasks.insert(index, removed);
                Err(e)
            }
        }
    }

    /// Record a connectivity change. An offline-to-online transition is one
    /// of the two reconciliation triggers; going offline just flips the
    /// flag.
    pub async fn set_online(&mut self, online: bool) {
        let was_online = self.online;
        self.online = online;

        if online && !was_online {
            info!("connection restored");
            self.events.emit_notice(NoticeLevel::Info, "Back online");
            reconciler::run(&self.api, &self.store, &mut self.tasks, &self.events).await;
            self.refresh_from_server().await;
        } else if !online && was_online {
            info!("connection lost");
        }
    }

    /// Re-fetch after a reconciliation, tolerating failure: the list just
    /// keeps its reconciled local state.
    async fn refresh_from_server(&mut self) {
        match self.api.list_tasks().await {
            Ok(mut fetched) => {
                for task in self.tasks.iter() {
                    if task.is_temporary && !fetched.iter().any(|t| t.id == task.id) {
                        fetched.push(task.clone());
                    }
                }
                self.tasks = fetched;
                self.store.save_tasks(&self.tasks).await;
            }
            Err(e) => {
                warn!(error = %e, "post-sync refresh failed, keeping local state");
            }
        }
    }

    async fn queue_op(&self, op: PendingOp) {
        let mut pending = self.store.load_pending().await;
        pending.push(op);
        self.store.save_pending(&pending).await;
    }
}
