// ============================================================================
// User Service
// ============================================================================
//
// User records live behind the UserStore trait; the rest of the application
// only sees the interface. The bundled implementation is an in-memory store
// seeded with the demo account. The info/register endpoints are served by a
// stub service whose responses are projected through a response DTO that
// exposes a fixed field set.
//
// ============================================================================

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Stored user record
#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// bcrypt hash; legacy records may still hold plaintext until their
    /// first successful login re-hashes them
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// 1 = enabled, 0 = disabled
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence interface for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_password(&self, user_id: u64, password_hash: &str) -> Result<()>;
}

/// In-memory user store, keyed by username
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.username.clone(), u)).collect()),
        }
    }

    /// Store seeded with the demo account (stored plaintext; upgraded to
    /// bcrypt on first login).
    pub fn seeded() -> Self {
        let now = Utc::now();
        Self::new(vec![User {
            id: 1,
            username: "admin".to_string(),
            password: "123456".to_string(),
            email: None,
            phone: None,
            status: 1,
            created_at: now,
            updated_at: now,
        }])
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn update_password(&self, user_id: u64, password_hash: &str) -> Result<()> {
        let mut users = self.users.write().await;
        for user in users.values_mut() {
            if user.id == user_id {
                user.password = password_hash.to_string();
                user.updated_at = Utc::now();
                return Ok(());
            }
        }
        anyhow::bail!("user {} not found", user_id)
    }
}

/// Internal user info shape, as the service produces it
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub username: String,
    pub password: String,
    pub account_type: String,
}

/// Response DTO: only these fields reach the client
#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub username: String,
    pub password: String,
}

impl From<UserInfo> for UserInfoResponse {
    fn from(info: UserInfo) -> Self {
        Self {
            username: info.username,
            password: info.password,
        }
    }
}

/// Demo user info payload
pub fn get_user_info() -> UserInfo {
    UserInfo {
        username: "admin".to_string(),
        password: "123456".to_string(),
        account_type: "12312313".to_string(),
    }
}

/// Registration stub
pub fn register_user() -> &'static str {
    "registration successful"
}
