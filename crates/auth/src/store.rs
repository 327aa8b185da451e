//! Durable storage for the session credential and user record

use async_trait::async_trait;
use log::warn;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use crate::error::AuthError;
use crate::session::{Session, UserInfo};

/// Storage key of the bearer token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Storage key of the serialized [`UserInfo`]
pub const USER_DATA_KEY: &str = "user_data";

/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Storage key of the token expiry, unix seconds
pub const EXPIRES_AT_KEY: &str = "expires_at";

/// String key-value storage surviving process restarts
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AuthError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError>;

    /// Removing a missing key is not an error
    async fn remove_item(&self, key: &str) -> Result<(), AuthError>;
}

/// Non-durable store, for tests and short-lived processes
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// Store keeping one file per key under a directory
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// The directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, AuthError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), AuthError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), AuthError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

pub(crate) async fn save_session(store: &dyn SessionStore, session: &Session) -> Result<(), AuthError> {
    store.set_item(AUTH_TOKEN_KEY, &session.token).await?;
    store
        .set_item(USER_DATA_KEY, &serde_json::to_string(&session.user)?)
        .await?;
    match &session.refresh_token {
        Some(refresh_token) => store.set_item(REFRESH_TOKEN_KEY, refresh_token).await?,
        None => store.remove_item(REFRESH_TOKEN_KEY).await?,
    }
    match session.expires_at {
        Some(expires_at) => store.set_item(EXPIRES_AT_KEY, &expires_at.to_string()).await,
        None => store.remove_item(EXPIRES_AT_KEY).await,
    }
}

/// A session is only restored when both the token and the user record exist
pub(crate) async fn load_session(store: &dyn SessionStore) -> Result<Option<Session>, AuthError> {
    let token = store.get_item(AUTH_TOKEN_KEY).await?;
    let user_data = store.get_item(USER_DATA_KEY).await?;

    match (token, user_data) {
        (Some(token), Some(user_data)) => {
            let user: UserInfo = serde_json::from_str(&user_data)?;
            let mut session = Session::new(user, token);
            session.refresh_token = store.get_item(REFRESH_TOKEN_KEY).await?;
            session.expires_at = match store.get_item(EXPIRES_AT_KEY).await? {
                Some(raw) => Some(raw.trim().parse().unwrap_or_else(|_| {
                    // unreadable expiry: treat the token as expired
                    warn!("ignoring stored expiry {:?}", raw);
                    0
                })),
                None => None,
            };
            Ok(Some(session))
        }
        _ => Ok(None),
    }
}

pub(crate) async fn clear_session(store: &dyn SessionStore) -> Result<(), AuthError> {
    store.remove_item(AUTH_TOKEN_KEY).await?;
    store.remove_item(USER_DATA_KEY).await?;
    store.remove_item(REFRESH_TOKEN_KEY).await?;
    store.remove_item(EXPIRES_AT_KEY).await
}
