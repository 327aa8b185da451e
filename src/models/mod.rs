//! Types returned by the plan API

mod plan;
mod progress;

use serde::{Deserialize, Serialize};

pub use plan::*;
pub use progress::*;

pub use crate::survey::PlanRequestPayload as UserProfile;
pub use oh_my_fitness_auth::UserInfo;

use crate::dates;

/// Progress records embedded in the user document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub weight_history: Vec<WeightHistoryItem>,
    #[serde(default)]
    pub workouts: Vec<WorkoutHistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub profile: Option<UserProfile>,
    pub user_info: UserInfo,
    #[serde(default)]
    pub progress: UserProgress,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithPlan {
    pub user: User,
    pub fitness_plan: Option<FitnessPlan>,
}

/// Body of the onboarding request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest<'a> {
    pub profile: &'a UserProfile,
    pub user_info: &'a UserInfo,
}

impl UserWithPlan {
    pub fn plan_for(&self, day: DayOfWeek) -> Option<&DailyPlan> {
        self.fitness_plan.as_ref()?.plan.day(day)
    }

    /// Plan for the current weekday in New York
    pub fn todays_plan(&self) -> Option<&DailyPlan> {
        self.plan_for(DayOfWeek::of(dates::today()))
    }

    /// Most recent logged weight, falling back to the survey answer
    pub fn latest_weight(&self) -> Option<f64> {
        self.user
            .progress
            .weight_history
            .last()
            .map(|entry| entry.weight)
            .or_else(|| {
                self.user
                    .profile
                    .as_ref()
                    .map(|p| f64::from(p.personal_goals_experience.current_weight_lbs))
            })
    }
}
