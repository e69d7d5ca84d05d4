pub mod errors;
pub mod models;
pub mod ops;

pub use errors::{SyncError, SyncResult};
pub use models::{is_temp_id, new_temp_id, Category, NewTask, Priority, Task, TaskPatch};
pub use ops::PendingOp;
