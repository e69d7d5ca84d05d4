use std::collections::VecDeque;

use tracing::{info, warn};

use todosync_core::{PendingOp, Task};

use crate::api::TaskApi;
use crate::events::{EventDispatcher, NoticeLevel};
use crate::store::LocalStore;

/// Result of draining the pending queue once.
#[derive(Debug, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Ops that failed and stay queued, in their original order.
    pub remaining: Vec<PendingOp>,
    /// Number of ops the server confirmed.
    pub synced: usize,
}

impl ReconcileOutcome {
    pub fn fully_drained(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Replay queued ops against the server in submission order.
///
/// A failed op is retained (with any id rewrites applied) rather than
/// retried inline; the next reconciliation picks it up again. When an add
/// is confirmed, the temp id is rewritten to the server id in the local
/// task list, in every queued follow-up and in already-retained ops.
pub async fn drain_queue<A: TaskApi>(
    api: &A,
    tasks: &mut Vec<Task>,
    queue: Vec<PendingOp>,
) -> ReconcileOutcome {
    let mut pending: VecDeque<PendingOp> = queue.into();
    let mut outcome = ReconcileOutcome::default();

    while let Some(op) = pending.pop_front() {
        match &op {
            PendingOp::Add { temp_id, payload } => match api.create_task(payload).await {
                Ok(confirmed) => {
                    outcome.synced += 1;
                    let Some(confirmed) = confirmed else {
                        continue;
                    };
                    // queued follow-ups still reference the temp id; rewrite
                    // them whether or not the task survives locally
                    for queued in pending.iter_mut() {
                        queued.retarget(temp_id, &confirmed.id);
                    }
                    for retained in outcome.remaining.iter_mut() {
                        retained.retarget(temp_id, &confirmed.id);
                    }
                    match tasks.iter_mut().find(|t| t.id == *temp_id) {
                        Some(local) => {
                            info!(%temp_id, server_id = %confirmed.id, "add confirmed");
                            *local = confirmed;
                        }
                        // deleted locally while queued; a retargeted delete
                        // later in the queue cleans up the server copy
                        None => {
                            info!(%temp_id, "add confirmed for a task no longer held locally");
                        }
                    }
                }
                Err(e) => {
                    warn!(%temp_id, error = %e, "add failed, keeping queued");
                    outcome.remaining.push(op);
                }
            },
            PendingOp::Update { id, payload } => match api.update_task(id, payload).await {
                Ok(()) => outcome.synced += 1,
                Err(e) => {
                    warn!(%id, error = %e, "update failed, keeping queued");
                    outcome.remaining.push(op);
                }
            },
            PendingOp::Delete { id } => match api.delete_task(id).await {
                Ok(()) => outcome.synced += 1,
                Err(e) => {
                    warn!(%id, error = %e, "delete failed, keeping queued");
                    outcome.remaining.push(op);
                }
            },
        }
    }

    outcome
}

/// Load the queue, drain it, and persist both the surviving queue and the
/// updated task cache. An empty queue is a total no-op: no events, no
/// writes, no requests.
pub async fn run<A: TaskApi>(
    api: &A,
    store: &LocalStore,
    tasks: &mut Vec<Task>,
    events: &EventDispatcher,
) -> ReconcileOutcome {
    let queue = store.load_pending().await;
    if queue.is_empty() {
        return ReconcileOutcome::default();
    }

    info!(queued = queue.len(), "reconciling pending operations");
    events.emit_sync_started();

    let outcome = drain_queue(api, tasks, queue).await;

    store.save_pending(&outcome.remaining).await;
    store.save_tasks(tasks).await;

    if outcome.fully_drained() {
        events.emit_notice(NoticeLevel::Success, "All changes synced with server");
    } else {
        warn!(
            retained = outcome.remaining.len(),
            synced = outcome.synced,
            "reconciliation incomplete"
        );
    }
    events.emit_sync_completed(outcome.synced);

    outcome
}
