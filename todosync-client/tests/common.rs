#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use todosync_client::TaskApi;
use todosync_core::{NewTask, SyncError, SyncResult, Task, TaskPatch};

/// Scripted in-memory server. Failures can be switched on globally, per
/// created title, or per mutated id; every accepted call is recorded so
/// tests can assert on order and arguments.
#[derive(Default)]
pub struct MockApi {
    pub tasks: Mutex<Vec<Task>>,
    pub calls: Mutex<Vec<String>>,
    fail_all: AtomicBool,
    reject_all: AtomicBool,
    fail_create: Mutex<HashSet<String>>,
    fail_mutation: Mutex<HashSet<String>>,
    server_status: Mutex<Option<u16>>,
    next_id: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::default();
        *api.tasks.lock().unwrap() = tasks;
        api
    }

    /// Make every call fail until switched off.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make creates with this exact title fail.
    pub fn fail_create_titled(&self, title: &str) {
        self.fail_create.lock().unwrap().insert(title.to_string());
    }

    /// Make updates and deletes for this id fail.
    pub fn fail_mutations_on(&self, id: &str) {
        self.fail_mutation.lock().unwrap().insert(id.to_string());
    }

    /// Make every call fail with a non-retryable validation error.
    pub fn set_reject_all(&self, reject: bool) {
        self.reject_all.store(reject, Ordering::SeqCst);
    }

    /// Report failures as this HTTP status instead of a network error.
    pub fn set_server_status(&self, status: u16) {
        *self.server_status.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn server_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    fn fails_everything(&self) -> bool {
        self.fail_all.load(Ordering::SeqCst) || self.reject_all.load(Ordering::SeqCst)
    }

    fn boom(&self) -> SyncError {
        if self.reject_all.load(Ordering::SeqCst) {
            return SyncError::Validation("scripted rejection".into());
        }
        match *self.server_status.lock().unwrap() {
            Some(status) => SyncError::Server {
                status,
                message: "scripted failure".into(),
            },
            None => SyncError::NetworkUnavailable("scripted failure".into()),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

// lets a client borrow the mock while the test keeps scripting it
impl TaskApi for &MockApi {
    async fn list_tasks(&self) -> SyncResult<Vec<Task>> {
        <MockApi as TaskApi>::list_tasks(self).await
    }

    async fn create_task(&self, payload: &NewTask) -> SyncResult<Option<Task>> {
        <MockApi as TaskApi>::create_task(self, payload).await
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> SyncResult<()> {
        <MockApi as TaskApi>::update_task(self, id, patch).await
    }

    async fn delete_task(&self, id: &str) -> SyncResult<()> {
        <MockApi as TaskApi>::delete_task(self, id).await
    }
}

impl TaskApi for MockApi {
    async fn list_tasks(&self) -> SyncResult<Vec<Task>> {
        if self.fails_everything() {
            return Err(self.boom());
        }
        self.record("list".into());
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn create_task(&self, payload: &NewTask) -> SyncResult<Option<Task>> {
        if self.fails_everything()
            || self.fail_create.lock().unwrap().contains(&payload.title)
        {
            return Err(self.boom());
        }
        let id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.record(format!("create {} -> {}", payload.title, id));
        let task = Task::optimistic(payload, id);
        self.tasks.lock().unwrap().push(task.clone());
        Ok(Some(task))
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> SyncResult<()> {
        if self.fails_everything()
            || self.fail_mutation.lock().unwrap().contains(id)
        {
            return Err(self.boom());
        }
        self.record(format!("update {id}"));
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
            task.apply_patch(patch);
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> SyncResult<()> {
        if self.fails_everything()
            || self.fail_mutation.lock().unwrap().contains(id)
        {
            return Err(self.boom());
        }
        self.record(format!("delete {id}"));
        self.tasks.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}
