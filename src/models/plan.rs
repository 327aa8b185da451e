//! Generated fitness plan

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessPlan {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub plan: Plan,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub general_notes: String,
    pub weekly_plan: HashMap<DayOfWeek, DailyPlan>,
}

impl Plan {
    pub fn day(&self, day: DayOfWeek) -> Option<&DailyPlan> {
        self.weekly_plan.get(&day)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub diet: Option<DietPlan>,
    pub workout: Option<WorkoutPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietPlan {
    pub meals_list: Vec<Meal>,
    #[serde(default)]
    pub daily_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub description: String,
    #[serde(rename = "meal_type")]
    pub meal_type: String,
    #[serde(default)]
    pub image_url: String,
    pub macros: Macros,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub duration_minutes: u32,
    pub exercises: Vec<Exercise>,
    #[serde(rename = "type")]
    pub workout_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub image_url: String,
}

impl DietPlan {
    /// Sum of the macros of every meal in the day
    pub fn total_macros(&self) -> Macros {
        self.meals_list.iter().fold(
            Macros {
                calories: 0.0,
                protein: 0.0,
                carbs: 0.0,
                fat: 0.0,
            },
            |acc, meal| Macros {
                calories: acc.calories + meal.macros.calories,
                protein: acc.protein + meal.macros.protein,
                carbs: acc.carbs + meal.macros.carbs,
                fat: acc.fat + meal.macros.fat,
            },
        )
    }
}
