//! AuthSession backed by an identity-toolkit style REST API

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use url::Url;

use crate::error::AuthError;
use crate::session::{AuthResult, Session, UserInfo, UserUpdate};
use crate::store::{clear_session, load_session, save_session, SessionStore};
use crate::AuthSession;

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// Credentials this close to expiry are renewed before use
const REFRESH_MARGIN_SECS: i64 = 60;

/// Endpoints and project key of the identity provider
#[derive(Debug, Clone)]
pub struct IdentityToolkitConfig {
    /// Account endpoints (`/v1/accounts:*`)
    pub base_url: String,
    /// Secure token endpoint (`/v1/token`)
    pub token_url: String,
    pub api_key: String,
}

impl IdentityToolkitConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn with_base_url(mut self, value: &str) -> Self {
        self.base_url = value.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token_url(mut self, value: &str) -> Self {
        self.token_url = value.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

fn parse_expires_in(value: Option<&str>) -> Option<i64> {
    value.and_then(|secs| secs.parse().ok())
}

fn provider_error(body: &str, fallback: &str) -> AuthError {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => AuthError::from_provider_code(&parsed.error.message, fallback),
        Err(_) => AuthError::Provider {
            code: "UNKNOWN".to_string(),
            message: fallback.to_string(),
        },
    }
}

/// Email/password authentication against the identity provider
///
/// The session is kept in memory and mirrored to a [`SessionStore`] so it
/// survives restarts until [`AuthSession::logout`] is called.
pub struct IdentityToolkitAuth {
    config: IdentityToolkitConfig,
    http_client: Client,
    store: Arc<dyn SessionStore>,
    current_session: Arc<RwLock<Option<Session>>>,
    refresh_lock: Mutex<()>,
}

impl IdentityToolkitAuth {
    pub fn new(config: IdentityToolkitConfig, http_client: Client, store: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            http_client,
            store,
            current_session: Arc::new(RwLock::new(None)),
            refresh_lock: Mutex::new(()),
        }
    }

    fn endpoint(&self, base: &str, path: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}/v1/{}", base.trim_end_matches('/'), path))?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url)
    }

    async fn post_json<B, T>(&self, url: Url, body: &B, fallback: &str) -> Result<T, AuthError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {}", url.path());
        let response = self.http_client.post(url).json(body).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(provider_error(&error_text, fallback));
        }

        Ok(response.json::<T>().await?)
    }

    fn store_in_memory(&self, session: Option<Session>) {
        let mut write_guard = self
            .current_session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *write_guard = session;
    }

    async fn establish(&self, session: Session) -> Result<AuthResult, AuthError> {
        save_session(self.store.as_ref(), &session).await?;
        let result = session.auth_result();
        self.store_in_memory(Some(session));
        Ok(result)
    }

    /// Exchange the refresh token for a new credential
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let mut session = self.current_session().ok_or(AuthError::MissingSession)?;
        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or(AuthError::MissingSession)?;

        let url = self.endpoint(&self.config.token_url, "token")?;
        debug!("POST {}", url.path());
        let response = self
            .http_client
            .post(url)
            .form(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token: &refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(provider_error(&error_text, "Session refresh failed"));
        }

        let tokens: TokenResponse = response.json().await?;
        session.token = tokens.id_token;
        session = session.with_refresh(
            Some(tokens.refresh_token),
            parse_expires_in(Some(&tokens.expires_in)),
        );

        save_session(self.store.as_ref(), &session).await?;
        self.store_in_memory(Some(session.clone()));
        debug!("refreshed session for user {}", session.user.id);
        Ok(session)
    }
}

#[async_trait]
impl AuthSession for IdentityToolkitAuth {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        let url = self.endpoint(&self.config.base_url, "accounts:signInWithPassword")?;
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        let account: AccountResponse = self.post_json(url, &request, "Login failed").await?;
        let token = account.id_token.ok_or_else(|| AuthError::Provider {
            code: "MISSING_ID_TOKEN".to_string(),
            message: "Login failed".to_string(),
        })?;

        let user = UserInfo {
            id: account.local_id,
            name: account.display_name.unwrap_or_default(),
            email: account.email.unwrap_or_else(|| email.to_string()),
            has_completed_survey: true,
        };
        let session = Session::new(user, token).with_refresh(
            account.refresh_token,
            parse_expires_in(account.expires_in.as_deref()),
        );

        info!("user {} signed in", session.user.id);
        self.establish(session).await
    }

    /// New accounts start with `has_completed_survey` unset so onboarding
    /// runs before any plan screen
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        let url = self.endpoint(&self.config.base_url, "accounts:signUp")?;
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        let account: AccountResponse = self.post_json(url, &request, "Registration failed").await?;
        let mut token = account.id_token.ok_or_else(|| AuthError::Provider {
            code: "MISSING_ID_TOKEN".to_string(),
            message: "Registration failed".to_string(),
        })?;
        let mut refresh_token = account.refresh_token;
        let mut expires_in = parse_expires_in(account.expires_in.as_deref());

        let url = self.endpoint(&self.config.base_url, "accounts:update")?;
        let update = ProfileUpdateRequest {
            id_token: &token,
            display_name: name,
            return_secure_token: true,
        };
        let updated: AccountResponse = self.post_json(url, &update, "Registration failed").await?;
        if let Some(new_token) = updated.id_token {
            token = new_token;
            refresh_token = updated.refresh_token.or(refresh_token);
            expires_in = parse_expires_in(updated.expires_in.as_deref()).or(expires_in);
        }

        let user = UserInfo {
            id: account.local_id,
            name: name.to_string(),
            email: email.to_string(),
            has_completed_survey: false,
        };
        let session = Session::new(user, token).with_refresh(refresh_token, expires_in);

        info!("registered user {}", session.user.id);
        self.establish(session).await
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let previous = self.current_session();
        self.store_in_memory(None);

        if let Err(err) = clear_session(self.store.as_ref()).await {
            warn!("failed to clear stored session: {}", err);
            return Err(err);
        }

        if let Some(session) = previous {
            info!("user {} signed out", session.user.id);
        }
        Ok(())
    }

    /// Renews the credential when it expires within a minute
    ///
    /// Concurrent callers wait for a single refresh. An expired session
    /// without a refresh token fails with [`AuthError::SessionExpired`].
    async fn access_token(&self) -> Result<String, AuthError> {
        let session = self.current_session().ok_or(AuthError::MissingSession)?;
        if !session.expires_within(REFRESH_MARGIN_SECS) {
            return Ok(session.token);
        }

        let _guard = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        let session = self.current_session().ok_or(AuthError::MissingSession)?;
        if !session.expires_within(REFRESH_MARGIN_SECS) {
            return Ok(session.token);
        }

        if session.refresh_token.is_none() {
            return if session.is_expired() {
                Err(AuthError::SessionExpired)
            } else {
                Ok(session.token)
            };
        }

        debug!("session for user {} is expiring, refreshing", session.user.id);
        Ok(self.refresh_session().await?.token)
    }

    fn current_session(&self) -> Option<Session> {
        let read_guard = self
            .current_session
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        read_guard.clone()
    }

    async fn restore_session(&self) -> Result<Option<Session>, AuthError> {
        let restored = load_session(self.store.as_ref()).await?;
        if let Some(ref session) = restored {
            debug!("restored session for user {}", session.user.id);
            self.store_in_memory(Some(session.clone()));
        }
        Ok(restored)
    }

    async fn update_user(&self, update: UserUpdate) -> Result<UserInfo, AuthError> {
        let mut session = self.current_session().ok_or(AuthError::MissingSession)?;
        update.apply(&mut session.user);

        save_session(self.store.as_ref(), &session).await?;
        let user = session.user.clone();
        self.store_in_memory(Some(session));
        Ok(user)
    }
}
