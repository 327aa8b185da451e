//! Onboarding survey: step cursor, answer accumulation and validation
//!
//! The survey is a linear four-step wizard. Answers are merged in as the user
//! leaves each step; [`Survey::advance`] refuses to move past a step whose
//! required answers are missing. Once every step validates, the answers are
//! turned into a [`PlanRequestPayload`] for the onboarding request.

mod answers;
mod transform;

use std::fmt;

use crate::error::{Error, ValidationError};

pub use answers::*;
pub use transform::*;

/// Number of steps in the survey
pub const TOTAL_STEPS: u8 = 4;

const MAX_WORKOUT_DAYS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurveyStep {
    AboutYou = 1,
    Schedule = 2,
    Diet = 3,
    WorkoutPreferences = 4,
}

impl SurveyStep {
    pub const ALL: [SurveyStep; 4] = [
        Self::AboutYou,
        Self::Schedule,
        Self::Diet,
        Self::WorkoutPreferences,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::AboutYou),
            2 => Some(Self::Schedule),
            3 => Some(Self::Diet),
            4 => Some(Self::WorkoutPreferences),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::AboutYou => "About you",
            Self::Schedule => "Schedule",
            Self::Diet => "Dietary preferences",
            Self::WorkoutPreferences => "Workout preferences",
        }
    }
}

impl fmt::Display for SurveyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.title())
    }
}

/// Position of the cursor; `current_step` is always within `1..=total_steps`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurveyProgress {
    current_step: u8,
    total_steps: u8,
}

impl Default for SurveyProgress {
    fn default() -> Self {
        Self {
            current_step: 1,
            total_steps: TOTAL_STEPS,
        }
    }
}

impl SurveyProgress {
    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn total_steps(&self) -> u8 {
        self.total_steps
    }

    pub fn is_last(&self) -> bool {
        self.current_step == self.total_steps
    }

    /// Completed share of the survey, for a progress bar
    pub fn fraction(&self) -> f32 {
        f32::from(self.current_step) / f32::from(self.total_steps)
    }

    fn next(&mut self) {
        self.current_step = (self.current_step + 1).min(self.total_steps);
    }

    fn previous(&mut self) {
        self.current_step = self.current_step.saturating_sub(1).max(1);
    }
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn whole_number(
    step: SurveyStep,
    field: &'static str,
    value: &Option<String>,
    missing: &str,
) -> Result<(), ValidationError> {
    if !filled(value) {
        return Err(ValidationError::new(step, field, missing));
    }
    match value.as_deref().and_then(transform::leading_whole_number) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new(step, field, "enter a whole number")),
    }
}

fn selected(values: &Option<Vec<String>>) -> bool {
    values.as_ref().is_some_and(|v| !v.is_empty())
}

/// Check that `step`'s required answers are present
pub fn validate_step(answers: &SurveyAnswers, step: SurveyStep) -> Result<(), ValidationError> {
    match step {
        SurveyStep::AboutYou => {
            if !selected(&answers.fitness_goals) {
                return Err(ValidationError::new(step, "fitnessGoals", "select at least one fitness goal"));
            }
            whole_number(step, "currentWeight", &answers.current_weight, "enter your current weight")?;
            whole_number(step, "desiredWeight", &answers.desired_weight, "enter your desired weight")?;
            whole_number(step, "height", &answers.height, "enter your height")?;
            if answers.fitness_level.is_none() {
                return Err(ValidationError::new(step, "fitnessLevel", "select a fitness level"));
            }
            if answers.age_group.is_none() {
                return Err(ValidationError::new(step, "ageGroup", "select an age group"));
            }
        }
        SurveyStep::Schedule => {
            match answers.workout_days_per_week {
                Some(days) if (1..=MAX_WORKOUT_DAYS).contains(&days) => {}
                _ => {
                    return Err(ValidationError::new(
                        step,
                        "workoutDaysPerWeek",
                        "choose between 1 and 7 workout days",
                    ))
                }
            }
            if answers.preferred_workout_time.is_none() {
                return Err(ValidationError::new(step, "preferredWorkoutTime", "select a workout time"));
            }
            if !selected(&answers.available_equipment) {
                return Err(ValidationError::new(step, "availableEquipment", "select your equipment"));
            }
        }
        SurveyStep::Diet => {}
        SurveyStep::WorkoutPreferences => {
            if !selected(&answers.enjoyed_workouts) {
                return Err(ValidationError::new(
                    step,
                    "enjoyedWorkouts",
                    "Please select at least one workout type you enjoy.",
                ));
            }
        }
    }
    Ok(())
}

/// The survey wizard
///
/// All operations are local and total; nothing here performs I/O.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Survey {
    answers: SurveyAnswers,
    progress: SurveyProgress,
}

impl Survey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers(&self) -> &SurveyAnswers {
        &self.answers
    }

    pub fn progress(&self) -> SurveyProgress {
        self.progress
    }

    pub fn current_step(&self) -> SurveyStep {
        SurveyStep::from_number(self.progress.current_step).unwrap_or(SurveyStep::AboutYou)
    }

    /// Merge a partial update without validating it
    pub fn update_data(&mut self, update: SurveyAnswers) {
        self.answers.merge(update);
    }

    /// Move forward one step; stays put on the last step
    pub fn next_step(&mut self) {
        self.progress.next();
    }

    /// Move back one step; stays put on the first step
    pub fn previous_step(&mut self) {
        self.progress.previous();
    }

    /// Clear all answers and return to the first step
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Merge `update`, then move forward if the current step is complete.
    ///
    /// The update is kept even when validation fails so the user does not
    /// lose what was entered.
    pub fn advance(&mut self, update: SurveyAnswers) -> Result<SurveyStep, ValidationError> {
        self.update_data(update);
        validate_step(&self.answers, self.current_step())?;
        self.next_step();
        Ok(self.current_step())
    }

    /// Leave the dietary step with default answers
    pub fn skip_dietary_step(&mut self) -> Result<SurveyStep, ValidationError> {
        if self.current_step() != SurveyStep::Diet {
            return Err(ValidationError::new(
                self.current_step(),
                "dietaryPreferences",
                "only the dietary step can be skipped",
            ));
        }

        self.update_data(SurveyAnswers {
            dietary_preferences: Some(vec![NO_PREFERENCE.to_string()]),
            dietary_restrictions: Some(Vec::new()),
            other_restrictions: Some(String::new()),
            health_considerations: Some(String::new()),
            ..Default::default()
        });
        self.next_step();
        Ok(self.current_step())
    }

    pub fn validate_current(&self) -> Result<(), ValidationError> {
        validate_step(&self.answers, self.current_step())
    }

    /// First failing step, if any
    pub fn validate_all(&self) -> Result<(), ValidationError> {
        SurveyStep::ALL
            .iter()
            .try_for_each(|step| validate_step(&self.answers, *step))
    }

    pub fn is_complete(&self) -> bool {
        self.validate_all().is_ok()
    }

    /// Validate every step and build the onboarding profile
    pub fn plan_request(&self) -> Result<PlanRequestPayload, Error> {
        self.validate_all()?;
        transform(&self.answers)
    }
}
