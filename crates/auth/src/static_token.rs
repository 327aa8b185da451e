//! In-process AuthSession issuing fixed tokens
//!
//! Used for development builds that have no identity provider and as a test
//! double. Accounts live in memory; sessions still go through a
//! [`SessionStore`] so restore and logout behave like the real provider.

use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

use crate::error::AuthError;
use crate::session::{AuthResult, Session, UserInfo, UserUpdate};
use crate::store::{clear_session, load_session, save_session, MemorySessionStore, SessionStore};
use crate::AuthSession;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    password: String,
}

pub struct StaticTokenAuth {
    accounts: Mutex<HashMap<String, Account>>,
    store: Arc<dyn SessionStore>,
    current_session: RwLock<Option<Session>>,
}

impl Default for StaticTokenAuth {
    fn default() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }
}

impl StaticTokenAuth {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            store,
            current_session: RwLock::new(None),
        }
    }

    /// Pre-register an account
    pub fn with_account(self, name: &str, email: &str, password: &str) -> Self {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email.to_lowercase(),
                Account {
                    id: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    password: password.to_string(),
                },
            );
        self
    }

    /// Start with an already signed-in session
    pub fn signed_in(self, session: Session) -> Self {
        self.set_session(Some(session));
        self
    }

    fn token_for(id: &str) -> String {
        format!("static-token-{}", id)
    }

    fn set_session(&self, session: Option<Session>) {
        *self
            .current_session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }

    async fn establish(&self, session: Session) -> Result<AuthResult, AuthError> {
        save_session(self.store.as_ref(), &session).await?;
        let result = session.auth_result();
        self.set_session(Some(session));
        Ok(result)
    }
}

fn check_email(email: &str) -> Result<(), AuthError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AuthError::InvalidEmail),
    }
}

#[async_trait]
impl AuthSession for StaticTokenAuth {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        check_email(email)?;
        let account = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&email.to_lowercase())
            .cloned()
            .ok_or(AuthError::UserNotFound)?;

        if account.password != password {
            return Err(AuthError::WrongPassword);
        }

        let user = UserInfo {
            id: account.id.clone(),
            name: account.name,
            email: email.to_string(),
            has_completed_survey: true,
        };
        info!("user {} signed in with a static token", user.id);
        self.establish(Session::new(user, Self::token_for(&account.id)))
            .await
    }

    /// New accounts start with `has_completed_survey` unset, as with the
    /// HTTP provider
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        check_email(email)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let account = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let key = email.to_lowercase();
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailInUse);
            }
            let account = Account {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                password: password.to_string(),
            };
            accounts.insert(key, account.clone());
            account
        };

        let user = UserInfo {
            id: account.id.clone(),
            name: account.name,
            email: email.to_string(),
            has_completed_survey: false,
        };
        info!("registered user {} with a static token", user.id);
        self.establish(Session::new(user, Self::token_for(&account.id)))
            .await
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.set_session(None);
        clear_session(self.store.as_ref()).await
    }

    fn current_session(&self) -> Option<Session> {
        self.current_session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn restore_session(&self) -> Result<Option<Session>, AuthError> {
        let restored = load_session(self.store.as_ref()).await?;
        if restored.is_some() {
            self.set_session(restored.clone());
        }
        Ok(restored)
    }

    async fn update_user(&self, update: UserUpdate) -> Result<UserInfo, AuthError> {
        let mut session = self.current_session().ok_or(AuthError::MissingSession)?;
        update.apply(&mut session.user);
        save_session(self.store.as_ref(), &session).await?;
        let user = session.user.clone();
        self.set_session(Some(session));
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_login() {
        tokio_test::block_on(async {
            let auth = StaticTokenAuth::default();

            let registered = auth
                .register("Ada", "ada@example.com", "secret1")
                .await
                .unwrap();
            assert!(registered.token.starts_with("static-token-"));
            assert!(!registered.user.has_completed_survey);

            let err = auth
                .register("Ada", "ADA@example.com", "secret1")
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::EmailInUse));

            let logged_in = auth.login("ada@example.com", "secret1").await.unwrap();
            assert_eq!(logged_in.token, registered.token);
            assert_eq!(auth.current_session().unwrap().user.name, "Ada");
        });
    }

    #[test]
    fn test_credential_errors() {
        tokio_test::block_on(async {
            let auth = StaticTokenAuth::default().with_account("Ada", "ada@example.com", "secret1");

            assert!(matches!(
                auth.login("nobody@example.com", "secret1").await,
                Err(AuthError::UserNotFound)
            ));
            assert!(matches!(
                auth.login("ada@example.com", "wrong!").await,
                Err(AuthError::WrongPassword)
            ));
            assert!(matches!(
                auth.login("not-an-email", "secret1").await,
                Err(AuthError::InvalidEmail)
            ));
            assert!(matches!(
                auth.register("Bob", "bob@example.com", "123").await,
                Err(AuthError::WeakPassword)
            ));
            assert!(auth.current_session().is_none());
        });
    }

    #[test]
    fn test_logout_clears_store() {
        tokio_test::block_on(async {
            let store = Arc::new(MemorySessionStore::new());
            let auth = StaticTokenAuth::new(store.clone()).with_account("Ada", "ada@example.com", "secret1");
            auth.login("ada@example.com", "secret1").await.unwrap();

            let restarted = StaticTokenAuth::new(store.clone());
            assert!(restarted.restore_session().await.unwrap().is_some());

            auth.logout().await.unwrap();
            assert!(auth.current_session().is_none());
            assert!(StaticTokenAuth::new(store).restore_session().await.unwrap().is_none());
        });
    }
}
