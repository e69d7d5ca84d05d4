use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Prefix distinguishing locally generated ids from server-assigned ones.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Generate a fresh temporary id for an optimistic, unconfirmed task.
pub fn new_temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

/// True for ids produced by [`new_temp_id`], i.e. not yet server-confirmed.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Category {
    Work,
    Personal,
    Study,
    Shopping,
    #[default]
    Other,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A to-do item as held in memory and in the local cache.
///
/// `id` is the single key used by the UI, the cache and the pending queue;
/// while unconfirmed it carries the [`TEMP_ID_PREFIX`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    /// Set while the id has not been confirmed by the server.
    #[serde(rename = "isTemporary", default)]
    pub is_temporary: bool,
}

impl Task {
    /// Build the optimistic in-memory task for a creation payload.
    pub fn optimistic(payload: &NewTask, id: String) -> Self {
        let is_temporary = is_temp_id(&id);
        Task {
            id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            category: payload.category,
            priority: payload.priority,
            completed: payload.completed,
            is_temporary,
        }
    }

    /// Best-effort conversion of any remote task representation.
    ///
    /// Accepts an object with `id`/`_id`/`uuid`/`_key` and
    /// `title`/`task`/`description` fallbacks, or the positional array form
    /// `[id, userId, title, description, category, priority, status]`.
    /// Unknown or missing metadata coerces to defaults; a value with no
    /// usable id gets a fresh temporary one.
    pub fn normalize(raw: &Value) -> Self {
        match raw {
            Value::Array(fields) => Self::from_positional(fields),
            Value::Object(_) => Self::from_object(raw),
            _ => Task {
                id: new_temp_id(),
                title: String::new(),
                description: String::new(),
                category: Category::default(),
                priority: Priority::default(),
                completed: false,
                is_temporary: true,
            },
        }
    }

    fn from_object(raw: &Value) -> Self {
        let id = ["id", "_id", "uuid", "_key"]
            .iter()
            .find_map(|key| scalar_to_string(raw.get(key)?))
            .unwrap_or_else(new_temp_id);

        let title = ["title", "task", "description"]
            .iter()
            .find_map(|key| scalar_to_string(raw.get(key)?))
            .unwrap_or_default();

        let description = raw
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let completed = raw.get("completed").and_then(Value::as_bool).unwrap_or_else(|| {
            raw.get("status")
                .and_then(|v| v.as_str())
                .is_some_and(status_means_completed)
        });

        let is_temporary = is_temp_id(&id);
        Task {
            id,
            title,
            description,
            category: coerce_enum(raw.get("category")),
            priority: coerce_enum(raw.get("priority")),
            completed,
            is_temporary,
        }
    }

    fn from_positional(fields: &[Value]) -> Self {
        let id = fields
            .first()
            .and_then(|v| scalar_to_string(v))
            .unwrap_or_else(new_temp_id);
        // index 1 is the owning user id; the client has no use for it
        let title = fields
            .get(2)
            .and_then(|v| scalar_to_string(v))
            .unwrap_or_default();
        let description = fields
            .get(3)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let completed = match fields.get(6) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => status_means_completed(s),
            _ => false,
        };

        let is_temporary = is_temp_id(&id);
        Task {
            id,
            title,
            description,
            category: coerce_enum(fields.get(4)),
            priority: coerce_enum(fields.get(5)),
            completed,
            is_temporary,
        }
    }

    /// Apply a partial update in place, field by field.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn status_means_completed(status: &str) -> bool {
    status.eq_ignore_ascii_case("completed") || status.eq_ignore_ascii_case("done")
}

fn coerce_enum<T: FromStr + Default>(value: Option<&Value>) -> T {
    value
        .and_then(|v| v.as_str())
        .and_then(|s| T::from_str(s).ok())
        .unwrap_or_default()
}

/// Outbound payload for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        NewTask {
            title: title.into(),
            description: String::new(),
            category: Category::default(),
            priority: Priority::default(),
            completed: false,
        }
    }
}

/// Outbound payload for a partial update; absent fields are left untouched
/// on the server, so a completion toggle sends only `{"completed": …}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        TaskPatch {
            completed: Some(completed),
            ..TaskPatch::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(title.into()),
            ..TaskPatch::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_temp_id_helpers() {
        let id = new_temp_id();
        assert!(is_temp_id(&id));
        assert!(!is_temp_id("42"));
        assert!(!is_temp_id("a3f0c9"));
    }

    #[test]
    fn test_normalize_object_with_fallback_keys() {
        let task = Task::normalize(&json!({
            "_id": 17,
            "task": "Buy milk",
            "category": "shopping",
            "priority": "HIGH",
            "status": "completed"
        }));

        assert_eq!(task.id, "17");
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.category, Category::Shopping);
        assert_eq!(task.priority, Priority::High);
        assert!(task.completed);
        assert!(!task.is_temporary);
    }

    #[test]
    fn test_normalize_coerces_bad_metadata() {
        let task = Task::normalize(&json!({
            "id": "9",
            "title": "Read",
            "category": "Gardening",
            "priority": 3
        }));

        assert_eq!(task.category, Category::Other);
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
    }

    #[test]
    fn test_normalize_positional_array() {
        let task = Task::normalize(&json!([
            5, 12, "Write report", "quarterly numbers", "Work", "High", "pending"
        ]));

        assert_eq!(task.id, "5");
        assert_eq!(task.title, "Write report");
        assert_eq!(task.description, "quarterly numbers");
        assert_eq!(task.category, Category::Work);
        assert_eq!(task.priority, Priority::High);
        assert!(!task.completed);
    }

    #[test]
    fn test_normalize_garbage_gets_temp_id() {
        let task = Task::normalize(&json!(null));
        assert!(task.is_temporary);
        assert!(is_temp_id(&task.id));
        assert!(task.title.is_empty());
    }

    #[test]
    fn test_toggle_patch_serializes_only_completed() {
        let patch = TaskPatch::completed(true);
        let wire = serde_json::to_string(&patch).unwrap();
        assert_eq!(wire, r#"{"completed":true}"#);
    }

    #[test]
    fn test_apply_patch_leaves_absent_fields() {
        let mut task = Task::optimistic(&NewTask::new("Walk dog"), "srv-1".to_string());
        task.apply_patch(&TaskPatch::completed(true));

        assert_eq!(task.title, "Walk dog");
        assert!(task.completed);
        assert!(!task.is_temporary);
    }

    #[test]
    fn test_cache_round_trip_preserves_temp_flag() {
        let task = Task::optimistic(&NewTask::new("Offline task"), new_temp_id());
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""isTemporary":true"#));

        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }
}
