//! Plan API client
//!
//! One method per backend endpoint. Every request carries a bearer token from
//! [`AuthSession::access_token`], which renews an expired credential when it
//! can; without a usable session the call fails before anything is sent.

use log::debug;
use reqwest::Client;
use std::sync::Arc;

use oh_my_fitness_auth::AuthSession;

use crate::config::ClientOptions;
use crate::dates::DateRange;
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::models::{
    OnboardingRequest, ProgressData, UpdateWeightPayload, UserInfo, UserProfile, UserWithPlan,
    WeightHistoryItem, WeightHistoryResponse, WorkoutCompletionPayload,
};

/// REST gateway to the plan API
#[derive(Clone)]
pub struct Gateway {
    base_url: String,
    http_client: Client,
    auth: Arc<dyn AuthSession>,
    client_info: String,
}

impl Gateway {
    pub fn new(base_url: &str, auth: Arc<dyn AuthSession>, options: &ClientOptions) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self::with_http_client(base_url, auth, builder.build()?, options))
    }

    /// Use an existing HTTP client
    pub fn with_http_client(
        base_url: &str,
        auth: Arc<dyn AuthSession>,
        http_client: Client,
        options: &ClientOptions,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            auth,
            client_info: options.client_info.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorize<'a>(&self, request: FetchBuilder<'a>) -> Result<FetchBuilder<'a>, Error> {
        let token = self.auth.access_token().await?;
        Ok(request
            .bearer_auth(&token)
            .header("X-Client-Info", &self.client_info))
    }

    async fn get(&self, path: &str) -> Result<FetchBuilder<'_>, Error> {
        self.authorize(Fetch::get(&self.http_client, &self.url(path))).await
    }

    async fn post(&self, path: &str) -> Result<FetchBuilder<'_>, Error> {
        self.authorize(Fetch::post(&self.http_client, &self.url(path))).await
    }

    async fn delete(&self, path: &str) -> Result<FetchBuilder<'_>, Error> {
        self.authorize(Fetch::delete(&self.http_client, &self.url(path))).await
    }

    /// Send the survey profile; the response is the generated plan
    pub async fn submit_onboarding(
        &self,
        profile: &UserProfile,
        user_info: &UserInfo,
    ) -> Result<serde_json::Value, Error> {
        debug!("submitting onboarding for user {}", user_info.id);
        self.post("/users/onboarding").await?
            .json(&OnboardingRequest { profile, user_info })?
            .execute_value()
            .await
    }

    pub async fn get_user_profile_with_plan(&self) -> Result<UserWithPlan, Error> {
        self.get("/users/profile").await?.execute().await
    }

    pub async fn get_progress(&self, range: &DateRange) -> Result<ProgressData, Error> {
        self.get("/progress").await?
            .query("startDate", &range.start_param())
            .query("endDate", &range.end_param())
            .execute()
            .await
    }

    pub async fn get_weight_history(&self, range: &DateRange) -> Result<Vec<WeightHistoryItem>, Error> {
        let response: WeightHistoryResponse = self.get("/progress/weight-history").await?
            .query("startDate", &range.start_param())
            .query("endDate", &range.end_param())
            .execute()
            .await?;
        Ok(response.weight_history)
    }

    pub async fn update_weight(&self, payload: &UpdateWeightPayload) -> Result<serde_json::Value, Error> {
        self.post("/progress/weight").await?.json(payload)?.execute_value().await
    }

    pub async fn log_workout_completion(
        &self,
        payload: &WorkoutCompletionPayload,
    ) -> Result<serde_json::Value, Error> {
        self.post("/progress/workout").await?.json(payload)?.execute_value().await
    }

    pub async fn delete_workout(&self, workout_id: &str) -> Result<serde_json::Value, Error> {
        let path = format!("/progress/workout/{}", encode_segment(workout_id));
        self.delete(&path).await?.execute_value().await
    }
}

/// Percent-encode one path segment
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use oh_my_fitness_auth::{AuthError, StaticTokenAuth};

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let auth = Arc::new(StaticTokenAuth::default());
        let gateway = Gateway::new("http://localhost:3000/api/", auth, &ClientOptions::default()).unwrap();

        assert_eq!(gateway.base_url(), "http://localhost:3000/api");
        assert_eq!(gateway.url("/users/profile"), "http://localhost:3000/api/users/profile");
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(encode_segment("abc123"), "abc123");
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn test_requests_need_a_session() {
        let auth = Arc::new(StaticTokenAuth::default());
        let gateway = Gateway::new("http://localhost:1", auth, &ClientOptions::default()).unwrap();

        let err = tokio_test::block_on(gateway.get_user_profile_with_plan()).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::MissingSession)));
    }
}
