//! Session data

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The signed-in user as known to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub has_completed_survey: bool,
}

/// Partial update applied to the stored [`UserInfo`]
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub has_completed_survey: Option<bool>,
}

impl UserUpdate {
    /// Overwrite every field of `user` that this update carries
    pub fn apply(self, user: &mut UserInfo) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(done) = self.has_completed_survey {
            user.has_completed_survey = done;
        }
    }
}

/// Result of a successful login or registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub user: UserInfo,
    pub token: String,
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The user owning the session
    pub user: UserInfo,

    /// Bearer credential sent to the plan API
    pub token: String,

    /// Token used to obtain a new credential, when the provider issues one
    pub refresh_token: Option<String>,

    /// Expiry as a unix timestamp in seconds
    pub expires_at: Option<i64>,
}

impl Session {
    /// Create a session without refresh data
    pub fn new(user: UserInfo, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Attach refresh data; `expires_in` is relative to now
    pub fn with_refresh(mut self, refresh_token: Option<String>, expires_in: Option<i64>) -> Self {
        self.refresh_token = refresh_token;
        self.expires_at = expires_in.map(|secs| Utc::now().timestamp() + secs);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_within(0)
    }

    /// Whether the credential expires in the next `secs` seconds
    pub fn expires_within(&self, secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() + secs >= expires_at,
            None => false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty() && !self.is_expired()
    }

    pub fn auth_result(&self) -> AuthResult {
        AuthResult {
            user: self.user.clone(),
            token: self.token.clone(),
        }
    }
}
