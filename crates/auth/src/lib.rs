//! Authentication session handling for the Oh My Fitness client
//!
//! This crate provides the [`AuthSession`] capability consumed by the plan
//! client, an HTTP implementation against an identity-toolkit style REST API,
//! an in-process implementation for development builds, and durable session
//! storage.

mod error;
mod identity_toolkit;
mod session;
mod static_token;
mod store;

use async_trait::async_trait;

pub use error::AuthError;
pub use identity_toolkit::{IdentityToolkitAuth, IdentityToolkitConfig};
pub use session::{AuthResult, Session, UserInfo, UserUpdate};
pub use static_token::StaticTokenAuth;
pub use store::{
    FileSessionStore, MemorySessionStore, SessionStore, AUTH_TOKEN_KEY, EXPIRES_AT_KEY,
    REFRESH_TOKEN_KEY, USER_DATA_KEY,
};

/// Credential lifecycle as seen by the rest of the client
///
/// Implementations are chosen when the client is composed; business logic
/// only ever talks to this trait.
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// Sign in with email and password
    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError>;

    /// Create an account and sign it in
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResult, AuthError>;

    /// Drop the session and its persisted copy
    async fn logout(&self) -> Result<(), AuthError>;

    /// The active session, if any, whether or not its credential is still valid
    fn current_session(&self) -> Option<Session>;

    /// A bearer token that is valid right now
    ///
    /// Implementations able to renew credentials do so here. The default
    /// fails with [`AuthError::SessionExpired`] once the session has expired.
    async fn access_token(&self) -> Result<String, AuthError> {
        let session = self.current_session().ok_or(AuthError::MissingSession)?;
        if session.is_expired() {
            return Err(AuthError::SessionExpired);
        }
        Ok(session.token)
    }

    /// Load a previously persisted session into memory
    async fn restore_session(&self) -> Result<Option<Session>, AuthError>;

    /// Apply a partial update to the signed-in user and persist it
    async fn update_user(&self, update: UserUpdate) -> Result<UserInfo, AuthError>;
}
