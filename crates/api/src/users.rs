//! Lookup of order owners in the external user service.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::UserId;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// A user as reported by the user service.
///
/// The zero value stands in for a user that could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Errors from the user service client.
#[derive(Debug, Error)]
pub enum UserLookupError {
    /// The request could not be sent or the body could not be read.
    #[error("User service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("User service returned {0}")]
    Status(StatusCode),
}

/// Settings for [`HttpUserDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after the first one fails with a retryable error.
    pub retries: u32,
    pub retry_wait: Duration,
}

impl Default for UserClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout: Duration::from_secs(5),
            retries: 3,
            retry_wait: Duration::from_secs(1),
        }
    }
}

/// Source of user details.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetches a user by id.
    async fn find(&self, id: UserId) -> Result<User, UserLookupError>;
}

/// Fetches a user, falling back to the zero user on any failure.
pub async fn find_or_default(users: &dyn UserDirectory, id: UserId) -> User {
    match users.find(id).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(user_id = %id, error = %e, "user lookup failed");
            User::default()
        }
    }
}

/// User directory backed by `GET {base_url}/users/{id}`.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: reqwest::Client,
    config: UserClientConfig,
}

impl HttpUserDirectory {
    pub fn new(config: UserClientConfig) -> Result<Self, UserLookupError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        tracing::info!(base_url = %config.base_url, "initialized user service client");
        Ok(Self { client, config })
    }

    fn url(&self, id: UserId) -> String {
        format!("{}/users/{}", self.config.base_url.trim_end_matches('/'), id)
    }

    async fn fetch(&self, id: UserId) -> Result<User, UserLookupError> {
        let response = self
            .client
            .get(self.url(id))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UserLookupError::Status(status));
        }
        Ok(response.json().await?)
    }
}

fn is_retryable(error: &UserLookupError) -> bool {
    match error {
        UserLookupError::Transport(_) => true,
        UserLookupError::Status(status) => status.is_server_error(),
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    #[tracing::instrument(skip(self))]
    async fn find(&self, id: UserId) -> Result<User, UserLookupError> {
        let mut attempt = 0;
        loop {
            match self.fetch(id).await {
                Ok(user) => return Ok(user),
                Err(e) if attempt < self.config.retries && is_retryable(&e) => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %e, "retrying user lookup");
                    tokio::time::sleep(self.config.retry_wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// User directory held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<i64, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, id: UserId) -> Result<User, UserLookupError> {
        self.users
            .read()
            .await
            .get(&id.as_i64())
            .cloned()
            .ok_or(UserLookupError::Status(StatusCode::NOT_FOUND))
    }
}
