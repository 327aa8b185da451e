//! Oh My Fitness client library
//!
//! Client-side core of the Oh My Fitness app: the onboarding survey, the
//! transformation of its answers into a plan request, and a cached client
//! for the plan and progress API.
//!
//! ```no_run
//! use std::sync::Arc;
//! use oh_my_fitness::prelude::*;
//! use oh_my_fitness::auth::StaticTokenAuth;
//!
//! # async fn run() -> Result<(), Error> {
//! let auth = Arc::new(StaticTokenAuth::default().with_account("Ada", "ada@example.com", "secret1"));
//! let client = FitnessClient::new("http://localhost:3000/api", auth)?;
//!
//! client.login("ada@example.com", "secret1").await?;
//! let progress = client.progress(&DateRange::last_days(30)).await?;
//! println!("{} workouts", ProgressSummary::from(progress.as_ref()).workouts_completed);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod dates;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod models;
pub mod survey;

/// Authentication sessions, re-exported from `oh-my-fitness-auth`
pub mod auth {
    pub use oh_my_fitness_auth::*;
}

use log::{debug, info};
use std::sync::Arc;

use oh_my_fitness_auth::{AuthError, AuthResult, AuthSession, UserUpdate};

use crate::cache::{MutationStatus, QueryCache, QueryKey, PROGRESS, WEIGHT_HISTORY};
use crate::config::ClientOptions;
use crate::dates::DateRange;
use crate::error::Error;
use crate::gateway::Gateway;
use crate::models::{
    parse_weight_input, ProgressData, ProgressSummary, UpdateWeightPayload, UserWithPlan,
    WeightHistoryItem, WorkoutCompletionPayload,
};
use crate::survey::Survey;

/// Names under which mutation outcomes are recorded
pub mod mutations {
    pub const SUBMIT_SURVEY: &str = "submitSurvey";
    pub const UPDATE_WEIGHT: &str = "updateWeight";
    pub const LOG_WORKOUT: &str = "logWorkoutCompletion";
    pub const DELETE_WORKOUT: &str = "deleteWorkout";
}

/// The main entry point: plan API access behind a query cache
///
/// Clones share the same cache and session.
#[derive(Clone)]
pub struct FitnessClient {
    gateway: Gateway,
    auth: Arc<dyn AuthSession>,
    cache: Arc<QueryCache>,
    options: ClientOptions,
}

impl FitnessClient {
    /// Create a new client with default options
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the plan API
    /// * `auth` - Session provider whose token authorizes every request
    pub fn new(base_url: &str, auth: Arc<dyn AuthSession>) -> Result<Self, Error> {
        Self::new_with_options(base_url, auth, ClientOptions::default())
    }

    /// Create a new client with custom options
    pub fn new_with_options(
        base_url: &str,
        auth: Arc<dyn AuthSession>,
        options: ClientOptions,
    ) -> Result<Self, Error> {
        let gateway = Gateway::new(base_url, auth.clone(), &options)?;

        Ok(Self {
            gateway,
            auth,
            cache: Arc::new(QueryCache::new(options.stale_time)),
            options,
        })
    }

    pub fn auth(&self) -> &dyn AuthSession {
        self.auth.as_ref()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sign in; data cached for a previous user is dropped first
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, Error> {
        self.cache.clear();
        let result = self.auth.login(email, password).await?;
        info!("signed in as {}", result.user.email);
        Ok(result)
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthResult, Error> {
        self.cache.clear();
        let result = self.auth.register(name, email, password).await?;
        info!("registered {}", result.user.email);
        Ok(result)
    }

    /// Sign out and drop everything cached for the session
    pub async fn logout(&self) -> Result<(), Error> {
        self.auth.logout().await?;
        self.cache.clear();
        info!("signed out");
        Ok(())
    }

    /// Profile, survey answers and generated plan of the signed-in user
    pub async fn user_with_plan(&self) -> Result<Arc<UserWithPlan>, Error> {
        let gateway = self.gateway.clone();
        self.cache
            .fetch(&QueryKey::user_with_plan(), move || async move {
                gateway.get_user_profile_with_plan().await
            })
            .await
    }

    pub async fn progress(&self, range: &DateRange) -> Result<Arc<ProgressData>, Error> {
        let gateway = self.gateway.clone();
        let range = *range;
        self.cache
            .fetch(&QueryKey::progress(&range), move || async move {
                gateway.get_progress(&range).await
            })
            .await
    }

    pub async fn progress_summary(&self, range: &DateRange) -> Result<ProgressSummary, Error> {
        let progress = self.progress(range).await?;
        Ok(ProgressSummary::from(progress.as_ref()))
    }

    pub async fn weight_history(&self, range: &DateRange) -> Result<Arc<Vec<WeightHistoryItem>>, Error> {
        let gateway = self.gateway.clone();
        let range = *range;
        self.cache
            .fetch(&QueryKey::weight_history(&range), move || async move {
                gateway.get_weight_history(&range).await
            })
            .await
    }

    /// Validate the survey, send it for plan generation and mark the user
    /// as having completed it
    pub async fn submit_survey(&self, survey: &Survey) -> Result<serde_json::Value, Error> {
        let profile = survey.plan_request()?;
        let session = self.auth.current_session().ok_or(AuthError::MissingSession)?;

        let invalidates = [QueryKey::user_with_plan(), QueryKey::resource(PROGRESS)];
        self.cache
            .mutate(mutations::SUBMIT_SURVEY, &invalidates, async {
                let plan = self.gateway.submit_onboarding(&profile, &session.user).await?;
                self.auth
                    .update_user(UserUpdate {
                        has_completed_survey: Some(true),
                        ..Default::default()
                    })
                    .await?;
                Ok(plan)
            })
            .await
    }

    /// Log today's weight; today is taken in New York
    pub async fn update_weight(&self, weight: f64) -> Result<serde_json::Value, Error> {
        if !(weight.is_finite() && weight > 0.0) {
            return Err(Error::malformed("weight", &weight.to_string()));
        }
        let payload = UpdateWeightPayload {
            date: dates::today_ymd(),
            weight,
        };
        debug!("logging weight {} for {}", payload.weight, payload.date);

        // one write feeds the profile, progress and weight history views
        let invalidates = [
            QueryKey::user_with_plan(),
            QueryKey::resource(PROGRESS),
            QueryKey::resource(WEIGHT_HISTORY),
        ];
        self.cache
            .mutate(mutations::UPDATE_WEIGHT, &invalidates, self.gateway.update_weight(&payload))
            .await
    }

    /// Parse a typed weight and log it
    pub async fn update_weight_input(&self, input: &str) -> Result<serde_json::Value, Error> {
        self.update_weight(parse_weight_input(input)?).await
    }

    /// Mark today's workout as done
    pub async fn log_workout_completion(&self) -> Result<serde_json::Value, Error> {
        let payload = WorkoutCompletionPayload {
            date: dates::today_ymd(),
        };
        let invalidates = [QueryKey::resource(PROGRESS), QueryKey::user_with_plan()];
        self.cache
            .mutate(mutations::LOG_WORKOUT, &invalidates, self.gateway.log_workout_completion(&payload))
            .await
    }

    pub async fn delete_workout(&self, workout_id: &str) -> Result<serde_json::Value, Error> {
        let invalidates = [QueryKey::resource(PROGRESS), QueryKey::user_with_plan()];
        self.cache
            .mutate(mutations::DELETE_WORKOUT, &invalidates, self.gateway.delete_workout(workout_id))
            .await
    }

    pub fn mutation_status(&self, name: &str) -> MutationStatus {
        self.cache.mutation_status(name)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::cache::{MutationStatus, QueryCache, QueryKey, QueryStatus};
    pub use crate::config::ClientOptions;
    pub use crate::dates::DateRange;
    pub use crate::error::{Error, ValidationError};
    pub use crate::models::{ProgressSummary, UserWithPlan};
    pub use crate::survey::{Survey, SurveyAnswers, SurveyStep};
    pub use crate::FitnessClient;
    pub use oh_my_fitness_auth::AuthSession;
}
