use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

use todosync_core::{NewTask, SyncError, SyncResult, Task, TaskPatch};

/// Hard deadline for every request; a response after this is abandoned.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote task endpoints. The client and reconciler run against this
/// trait so tests can swap in a scripted server.
#[allow(async_fn_in_trait)]
pub trait TaskApi {
    async fn list_tasks(&self) -> SyncResult<Vec<Task>>;

    /// Create a task. `Ok(None)` means the server accepted the task but the
    /// response body carried no decodable task; the caller keeps its
    /// optimistic copy in that case.
    async fn create_task(&self, payload: &NewTask) -> SyncResult<Option<Task>>;

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> SyncResult<()>;

    async fn delete_task(&self, id: &str) -> SyncResult<()>;
}

/// HTTP implementation of [`TaskApi`] against the REST backend.
pub struct HttpTaskApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::NetworkUnavailable(e.to_string()))?;
        Ok(HttpTaskApi {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> SyncResult<Self> {
        let mut api = Self::new(base_url)?;
        api.token = Some(token.into());
        Ok(api)
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn check_status(response: reqwest::Response) -> SyncResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Server {
            status: status.as_u16(),
            message: decode_error_message(&body, status),
        })
    }
}

impl TaskApi for HttpTaskApi {
    async fn list_tasks(&self) -> SyncResult<Vec<Task>> {
        let response = self
            .request(reqwest::Method::GET, "/tasks")
            .send()
            .await
            .map_err(map_transport)?;
        let response = Self::check_status(response).await?;
        let body: Value = response.json().await.map_err(map_transport)?;
        Ok(decode_task_list(&body))
    }

    async fn create_task(&self, payload: &NewTask) -> SyncResult<Option<Task>> {
        let response = self
            .request(reqwest::Method::POST, "/tasks")
            .json(payload)
            .send()
            .await
            .map_err(map_transport)?;
        let response = Self::check_status(response).await?;

        // some backends return the created task, some an empty body
        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "create succeeded but response body was unreadable");
                return Ok(None);
            }
        };
        Ok(decode_created_task(&body))
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> SyncResult<()> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/tasks/{id}"))
            .json(patch)
            .send()
            .await
            .map_err(map_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> SyncResult<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/tasks/{id}"))
            .send()
            .await
            .map_err(map_transport)?;
        Self::check_status(response).await?;
        Ok(())
    }
}

/// Split transport failures into the timeout and unreachable cases.
pub(crate) fn map_transport(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::Timeout
    } else {
        SyncError::NetworkUnavailable(err.to_string())
    }
}

/// Pull a human-readable message out of an error body: a JSON `message`
/// or `error` field when present, otherwise the raw text, otherwise the
/// status line.
pub(crate) fn decode_error_message(body: &str, status: StatusCode) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(message) = json.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

/// Decode a task-list response. Accepts a bare array or an object wrapping
/// the array under `tasks` or `data`; each element goes through
/// [`Task::normalize`]. Anything else decodes to an empty list.
pub(crate) fn decode_task_list(body: &Value) -> Vec<Task> {
    let items = match body {
        Value::Array(items) => Some(items),
        Value::Object(_) => ["tasks", "data"]
            .iter()
            .find_map(|key| body.get(key)?.as_array()),
        _ => None,
    };
    match items {
        Some(items) => items.iter().map(Task::normalize).collect(),
        None => {
            warn!("unrecognised task list shape, treating as empty");
            Vec::new()
        }
    }
}

/// Decode a create response. Accepts the created task directly or wrapped
/// under `task` or `data`; `None` when no task-shaped value is present.
pub(crate) fn decode_created_task(body: &Value) -> Option<Task> {
    let raw = match body {
        Value::Object(_) => {
            if body.get("id").is_some() || body.get("_id").is_some() {
                Some(body)
            } else {
                ["task", "data"]
                    .iter()
                    .find_map(|key| body.get(key))
                    .filter(|v| v.is_object())
            }
        }
        _ => None,
    };
    raw.map(Task::normalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_bare_array() {
        let tasks = decode_task_list(&json!([
            {"id": 1, "title": "a"},
            {"id": 2, "title": "b", "completed": true}
        ]));
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "1");
        assert!(tasks[1].completed);
    }

    #[test]
    fn test_decode_wrapped_arrays() {
        let under_tasks = decode_task_list(&json!({"tasks": [{"id": "x", "title": "t"}]}));
        assert_eq!(under_tasks.len(), 1);

        let under_data = decode_task_list(&json!({"data": [[7, 1, "pos", "", "Work", "Low", "done"]]}));
        assert_eq!(under_data.len(), 1);
        assert_eq!(under_data[0].id, "7");
        assert!(under_data[0].completed);
    }

    #[test]
    fn test_decode_unrecognised_shape_is_empty() {
        assert!(decode_task_list(&json!({"items": []})).is_empty());
        assert!(decode_task_list(&json!("nope")).is_empty());
    }

    #[test]
    fn test_decode_created_task_shapes() {
        let direct = decode_created_task(&json!({"id": 9, "title": "direct"}));
        assert_eq!(direct.unwrap().id, "9");

        let wrapped = decode_created_task(&json!({"task": {"_id": "abc", "title": "w"}}));
        assert_eq!(wrapped.unwrap().id, "abc");

        assert!(decode_created_task(&json!({"ok": true})).is_none());
        assert!(decode_created_task(&json!(null)).is_none());
    }

    #[test]
    fn test_decode_error_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            decode_error_message(r#"{"message":"title required"}"#, status),
            "title required"
        );
        assert_eq!(
            decode_error_message(r#"{"error":"nope"}"#, status),
            "nope"
        );
        assert_eq!(decode_error_message("plain text", status), "plain text");
        assert_eq!(decode_error_message("", status), "Bad Request");
    }
}
