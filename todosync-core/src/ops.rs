use serde::{Deserialize, Serialize};

use crate::models::{NewTask, TaskPatch};

/// A mutation accepted locally but not yet confirmed by the server.
///
/// Ops are persisted in submission order and replayed in that order; the
/// wire format is tagged so the queue survives restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PendingOp {
    Add {
        #[serde(rename = "tempId")]
        temp_id: String,
        payload: NewTask,
    },
    Update {
        id: String,
        payload: TaskPatch,
    },
    Delete {
        id: String,
    },
}

impl PendingOp {
    /// The task id this op targets (the temp id for an add).
    pub fn task_id(&self) -> &str {
        match self {
            PendingOp::Add { temp_id, .. } => temp_id,
            PendingOp::Update { id, .. } => id,
            PendingOp::Delete { id } => id,
        }
    }

    /// Repoint an update or delete at a new id, used once the server
    /// confirms an add and hands back the real id. Adds keep their temp id.
    pub fn retarget(&mut self, from: &str, to: &str) {
        match self {
            PendingOp::Update { id, .. } | PendingOp::Delete { id } if *id == from => {
                *id = to.to_string();
            }
            _ => {}
        }
    }
}
