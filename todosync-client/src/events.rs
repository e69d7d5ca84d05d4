use std::sync::Mutex;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Everything the UI layer may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    TaskAdded { id: String, title: String },
    TaskUpdated { id: String },
    TaskDeleted { id: String },
    SyncStarted,
    SyncCompleted { synced: usize },
    Notice { level: NoticeLevel, message: String },
}

type Callback = Box<dyn Fn(&ClientEvent) + Send>;

/// Fan-out point for [`ClientEvent`]s; callbacks run synchronously on the
/// emitting task, in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    callbacks: Mutex<Vec<Callback>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, callback: F)
    where
        F: Fn(&ClientEvent) + Send + 'static,
    {
        // a callback that panicked mid-dispatch must not disable events
        let mut callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        callbacks.push(Box::new(callback));
    }

    pub fn emit(&self, event: ClientEvent) {
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for callback in callbacks.iter() {
            callback(&event);
        }
    }

    pub fn emit_notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ClientEvent::Notice {
            level,
            message: message.into(),
        });
    }

    pub fn emit_sync_started(&self) {
        self.emit(ClientEvent::SyncStarted);
    }

    pub fn emit_sync_completed(&self, synced: usize) {
        self.emit(ClientEvent::SyncCompleted { synced });
    }
}
