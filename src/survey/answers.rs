//! Survey answers accumulated across steps

use serde::{Deserialize, Serialize};

/// Dietary preference used when none is selected
pub const NO_PREFERENCE: &str = "No preference";

pub const FITNESS_GOAL_OPTIONS: &[&str] = &[
    "Lose weight",
    "Build muscle",
    "Gain Strength",
    "Maintain fitness",
    "Improve endurance",
    "Other",
];

pub const EQUIPMENT_OPTIONS: &[&str] = &[
    "None",
    "Dumbbells",
    "Barbell",
    "Gym Access",
    "Resistance Bands",
    "Kettlebells",
];

pub const DIETARY_PREFERENCE_OPTIONS: &[&str] = &[
    NO_PREFERENCE,
    "Vegetarian",
    "Vegan",
    "Keto",
    "Paleo",
    "Low Carb",
    "Mediterranean",
];

pub const RESTRICTION_OPTIONS: &[&str] = &[
    "Gluten-free",
    "Dairy-free",
    "Nut-free",
    "Soy-free",
    "Shellfish-free",
    "Egg-free",
    "Sugar-free",
    "Other",
];

pub const WORKOUT_TYPE_OPTIONS: &[&str] = &["Strength Training", "HIIT", "Yoga", "Cardio", "Pilates", "Dance"];

pub const WORKOUTS_TO_AVOID_OPTIONS: &[&str] = &["High-Impact", "Heavy Lifting", "Long Cardio"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub const ALL: [FitnessLevel; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "18-24")]
    From18To24,
    #[serde(rename = "25-34")]
    From25To34,
    #[serde(rename = "35-44")]
    From35To44,
    #[serde(rename = "45-54")]
    From45To54,
    #[serde(rename = "55+")]
    Over55,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        Self::From18To24,
        Self::From25To34,
        Self::From35To44,
        Self::From45To54,
        Self::Over55,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::From18To24 => "18-24",
            Self::From25To34 => "25-34",
            Self::From35To44 => "35-44",
            Self::From45To54 => "45-54",
            Self::Over55 => "55+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkoutTime {
    Morning,
    Midday,
    Evening,
}

impl WorkoutTime {
    pub const ALL: [WorkoutTime; 3] = [Self::Morning, Self::Midday, Self::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Midday => "Midday",
            Self::Evening => "Evening",
        }
    }
}

/// Answers collected so far; every field is absent until its step sets it
///
/// The same type doubles as a partial update for [`SurveyAnswers::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    // About you
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_goals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_weight: Option<String>,
    /// Inches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitness_level: Option<FitnessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<AgeGroup>,

    // Schedule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_days_per_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_workout_time: Option<WorkoutTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_equipment: Option<Vec<String>>,

    // Diet and health
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_preferences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_restrictions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_considerations: Option<String>,

    // Workout preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enjoyed_workouts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workouts_to_avoid: Option<Vec<String>>,
}

macro_rules! merge_fields {
    ($target:ident, $update:ident, $($field:ident),+ $(,)?) => {
        $(
            if $update.$field.is_some() {
                $target.$field = $update.$field;
            }
        )+
    };
}

impl SurveyAnswers {
    /// Shallow merge: each field present in `update` replaces the stored one
    /// wholesale, lists included. Absent fields leave stored values alone.
    pub fn merge(&mut self, update: SurveyAnswers) {
        let target = self;
        merge_fields!(
            target,
            update,
            fitness_goals,
            current_weight,
            desired_weight,
            height,
            fitness_level,
            age_group,
            workout_days_per_week,
            preferred_workout_time,
            available_equipment,
            dietary_preferences,
            dietary_restrictions,
            other_restrictions,
            health_considerations,
            enjoyed_workouts,
            workouts_to_avoid,
        );
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Multi-select toggle: remove `value` if selected, otherwise append it
///
/// Selection order is kept, which matters for the first-selected-wins fields.
pub fn toggle(selection: &mut Vec<String>, value: &str) {
    match selection.iter().position(|item| item == value) {
        Some(index) => {
            selection.remove(index);
        }
        None => selection.push(value.to_string()),
    }
}
