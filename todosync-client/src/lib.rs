pub mod api;
pub mod auth;
pub mod client;
pub mod events;
pub mod reconciler;
pub mod store;

pub use api::{HttpTaskApi, TaskApi};
pub use auth::AuthClient;
pub use client::TaskListClient;
pub use events::{ClientEvent, EventDispatcher, NoticeLevel};
pub use store::LocalStore;

pub use todosync_core::{
    Category, NewTask, PendingOp, Priority, SyncError, SyncResult, Task, TaskPatch,
};

/// Install the default tracing subscriber, filtered by `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
