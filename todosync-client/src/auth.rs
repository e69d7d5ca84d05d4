use serde::{Deserialize, Serialize};
use tracing::info;

use todosync_core::{SyncError, SyncResult};

use crate::api::{decode_error_message, map_transport, REQUEST_TIMEOUT};
use crate::store::LocalStore;

#[derive(Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

/// Account registration and login against the backend; the session token
/// is kept in the local store so a restart stays signed in.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    store: LocalStore,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>, store: LocalStore) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::NetworkUnavailable(e.to_string()))?;
        Ok(AuthClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> SyncResult<()> {
        let response = self
            .http
            .post(format!("{}/register", self.base_url))
            .json(&RegisterBody {
                username,
                email,
                password,
            })
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                message: decode_error_message(&body, status),
            });
        }
        info!(username, "account registered");
        Ok(())
    }

    /// Log in and persist the returned token.
    pub async fn login(&self, username: &str, password: &str) -> SyncResult<String> {
        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&LoginBody { username, password })
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                message: decode_error_message(&body, status),
            });
        }

        let body: TokenBody = response.json().await.map_err(map_transport)?;
        self.store.save_token(&body.token).await?;
        info!(username, "logged in");
        Ok(body.token)
    }

    pub async fn stored_token(&self) -> SyncResult<Option<String>> {
        self.store.load_token().await
    }

    pub async fn logout(&self) -> SyncResult<()> {
        self.store.clear_token().await
    }
}
