//! Conversion of survey answers into the backend profile schema

use serde::{Deserialize, Serialize};

use super::answers::{SurveyAnswers, NO_PREFERENCE};
use super::SurveyStep;
use crate::error::{Error, ValidationError};

const CM_PER_INCH: f64 = 2.54;
const DEFAULT_LOCATION: &str = "Home";
const NO_MEDICAL_CONDITIONS: &str = "None";

/// Profile sent with the onboarding request; the backend stores it as the
/// user's profile and returns it with the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequestPayload {
    pub personal_goals_experience: PersonalGoalsExperience,
    pub schedule_availability: ScheduleAvailability,
    pub equipment_access: EquipmentAccess,
    pub dietary_preferences: DietaryPreferences,
    pub health_considerations: HealthConsiderations,
    pub preferences_motivation: PreferencesMotivation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalGoalsExperience {
    pub primary_fitness_goal: String,
    pub current_weight_lbs: u32,
    pub desired_weight_lbs: u32,
    pub height_cms: u32,
    pub current_fitness_level: String,
    pub age_group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAvailability {
    pub days_per_week_workout: String,
    pub preferred_workout_times: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentAccess {
    pub equipment: Vec<String>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryPreferences {
    pub primary_dietary_preference: String,
    pub restrictions_allergies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthConsiderations {
    pub medical_conditions: String,
    pub workouts_to_avoid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesMotivation {
    pub enjoyed_workout_types: Vec<String>,
}

/// Encode the weekly workout count the way the backend expects it.
///
/// Compatibility shim: the backend contract buckets 4 days as `"3-4"`, every
/// other count is sent as its decimal string. Keep until the backend drops
/// the bucket.
pub fn encode_workout_days(days: u8) -> String {
    if days == 4 {
        "3-4".to_string()
    } else {
        days.to_string()
    }
}

/// Round `inches` to whole centimetres
pub fn inches_to_cms(inches: u32) -> u32 {
    (f64::from(inches) * CM_PER_INCH).round() as u32
}

/// Whole number at the start of `value`, so `"180.5"` reads as 180
///
/// `None` when no digits lead the input or the number does not fit.
pub(crate) fn leading_whole_number(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    unsigned[..end].parse().ok()
}

fn parse_whole_number(field: &'static str, value: &str) -> Result<u32, Error> {
    leading_whole_number(value).ok_or_else(|| Error::malformed(field, value))
}

fn required<'a, T>(value: &'a Option<T>, step: SurveyStep, field: &'static str) -> Result<&'a T, Error> {
    value
        .as_ref()
        .ok_or_else(|| ValidationError::new(step, field, "answer required").into())
}

/// Build the onboarding profile from a snapshot of the answers.
///
/// The first selected goal becomes the primary goal and the first selected
/// dietary preference the primary preference. `otherRestrictions` has no
/// counterpart in the backend schema and is not sent.
pub fn transform(answers: &SurveyAnswers) -> Result<PlanRequestPayload, Error> {
    let primary_fitness_goal = answers
        .fitness_goals
        .as_ref()
        .and_then(|goals| goals.first())
        .cloned()
        .ok_or_else(|| {
            ValidationError::new(SurveyStep::AboutYou, "fitnessGoals", "select at least one fitness goal")
        })?;

    let current_weight = required(&answers.current_weight, SurveyStep::AboutYou, "currentWeight")?;
    let desired_weight = required(&answers.desired_weight, SurveyStep::AboutYou, "desiredWeight")?;
    let height = required(&answers.height, SurveyStep::AboutYou, "height")?;
    let fitness_level = required(&answers.fitness_level, SurveyStep::AboutYou, "fitnessLevel")?;
    let age_group = required(&answers.age_group, SurveyStep::AboutYou, "ageGroup")?;
    let days = required(&answers.workout_days_per_week, SurveyStep::Schedule, "workoutDaysPerWeek")?;
    let workout_time = required(&answers.preferred_workout_time, SurveyStep::Schedule, "preferredWorkoutTime")?;

    let primary_dietary_preference = answers
        .dietary_preferences
        .as_ref()
        .and_then(|prefs| prefs.first())
        .cloned()
        .unwrap_or_else(|| NO_PREFERENCE.to_string());

    let medical_conditions = match answers.health_considerations.as_deref().map(str::trim) {
        Some(notes) if !notes.is_empty() => notes.to_string(),
        _ => NO_MEDICAL_CONDITIONS.to_string(),
    };

    Ok(PlanRequestPayload {
        personal_goals_experience: PersonalGoalsExperience {
            primary_fitness_goal,
            current_weight_lbs: parse_whole_number("currentWeight", current_weight)?,
            desired_weight_lbs: parse_whole_number("desiredWeight", desired_weight)?,
            height_cms: inches_to_cms(parse_whole_number("height", height)?),
            current_fitness_level: fitness_level.as_str().to_string(),
            age_group: age_group.as_str().to_string(),
        },
        schedule_availability: ScheduleAvailability {
            days_per_week_workout: encode_workout_days(*days),
            preferred_workout_times: workout_time.as_str().to_string(),
        },
        equipment_access: EquipmentAccess {
            equipment: answers.available_equipment.clone().unwrap_or_default(),
            location: DEFAULT_LOCATION.to_string(),
        },
        dietary_preferences: DietaryPreferences {
            primary_dietary_preference,
            restrictions_allergies: answers.dietary_restrictions.clone().unwrap_or_default(),
        },
        health_considerations: HealthConsiderations {
            medical_conditions,
            workouts_to_avoid: answers.workouts_to_avoid.clone().unwrap_or_default(),
        },
        preferences_motivation: PreferencesMotivation {
            enjoyed_workout_types: answers.enjoyed_workouts.clone().unwrap_or_default(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::answers::{AgeGroup, FitnessLevel, WorkoutTime};

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    fn complete_answers() -> SurveyAnswers {
        SurveyAnswers {
            fitness_goals: strings(&["Lose weight", "Build muscle"]),
            current_weight: Some("180".to_string()),
            desired_weight: Some("160".to_string()),
            height: Some("70".to_string()),
            fitness_level: Some(FitnessLevel::Intermediate),
            age_group: Some(AgeGroup::From25To34),
            workout_days_per_week: Some(4),
            preferred_workout_time: Some(WorkoutTime::Morning),
            available_equipment: strings(&["Dumbbells", "Resistance Bands"]),
            dietary_preferences: strings(&[]),
            dietary_restrictions: strings(&["Nut-free"]),
            other_restrictions: Some("no cilantro".to_string()),
            health_considerations: Some(String::new()),
            enjoyed_workouts: strings(&["HIIT", "Yoga"]),
            workouts_to_avoid: strings(&["Heavy Lifting"]),
        }
    }

    #[test]
    fn test_transform_reference_answers() {
        let payload = transform(&complete_answers()).unwrap();

        let goals = &payload.personal_goals_experience;
        assert_eq!(goals.primary_fitness_goal, "Lose weight");
        assert_eq!(goals.height_cms, 178);
        assert_eq!(goals.current_weight_lbs, 180);
        assert_eq!(goals.desired_weight_lbs, 160);
        assert_eq!(goals.current_fitness_level, "Intermediate");
        assert_eq!(goals.age_group, "25-34");

        assert_eq!(payload.schedule_availability.days_per_week_workout, "3-4");
        assert_eq!(payload.schedule_availability.preferred_workout_times, "Morning");
        assert_eq!(payload.equipment_access.location, "Home");
        assert_eq!(payload.dietary_preferences.primary_dietary_preference, "No preference");
        assert_eq!(payload.dietary_preferences.restrictions_allergies, vec!["Nut-free"]);
        assert_eq!(payload.health_considerations.medical_conditions, "None");
        assert_eq!(payload.health_considerations.workouts_to_avoid, vec!["Heavy Lifting"]);
        assert_eq!(payload.preferences_motivation.enjoyed_workout_types, vec!["HIIT", "Yoga"]);
    }

    #[test]
    fn test_workout_days_encoding() {
        assert_eq!(encode_workout_days(4), "3-4");
        assert_eq!(encode_workout_days(5), "5");
        assert_eq!(encode_workout_days(1), "1");

        let mut answers = complete_answers();
        answers.workout_days_per_week = Some(5);
        let payload = transform(&answers).unwrap();
        assert_eq!(payload.schedule_availability.days_per_week_workout, "5");
    }

    #[test]
    fn test_first_selection_wins() {
        let mut answers = complete_answers();
        answers.dietary_preferences = strings(&["Keto", "Vegan"]);
        answers.health_considerations = Some("Bad knee".to_string());

        let payload = transform(&answers).unwrap();
        assert_eq!(payload.dietary_preferences.primary_dietary_preference, "Keto");
        assert_eq!(payload.health_considerations.medical_conditions, "Bad knee");
    }

    #[test]
    fn test_non_numeric_weight_is_rejected() {
        let mut answers = complete_answers();
        answers.current_weight = Some("one eighty".to_string());

        match transform(&answers) {
            Err(Error::MalformedInput { field, value }) => {
                assert_eq!(field, "currentWeight");
                assert_eq!(value, "one eighty");
            }
            other => panic!("expected malformed input, got {other:?}"),
        }
    }

    #[test]
    fn test_fractional_input_is_truncated() {
        let mut answers = complete_answers();
        answers.current_weight = Some("180.5".to_string());
        answers.height = Some(" 70in".to_string());

        let payload = transform(&answers).unwrap();
        assert_eq!(payload.personal_goals_experience.current_weight_lbs, 180);
        assert_eq!(payload.personal_goals_experience.height_cms, 178);

        assert_eq!(leading_whole_number("+160"), Some(160));
        assert_eq!(leading_whole_number("-160"), None);
        assert_eq!(leading_whole_number(".5"), None);
        assert_eq!(leading_whole_number("99999999999"), None);
    }

    #[test]
    fn test_missing_goal_is_a_validation_error() {
        let mut answers = complete_answers();
        answers.fitness_goals = strings(&[]);

        match transform(&answers) {
            Err(Error::Validation(err)) => {
                assert_eq!(err.step, SurveyStep::AboutYou);
                assert_eq!(err.field, "fitnessGoals");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_wire_names() {
        let json = serde_json::to_value(transform(&complete_answers()).unwrap()).unwrap();
        assert_eq!(json["personalGoalsExperience"]["heightCms"], 178);
        assert_eq!(json["scheduleAvailability"]["daysPerWeekWorkout"], "3-4");
        assert_eq!(json["dietaryPreferences"]["restrictionsAllergies"][0], "Nut-free");
        assert_eq!(json["preferencesMotivation"]["enjoyedWorkoutTypes"][1], "Yoga");
        assert!(json.get("otherRestrictions").is_none());
    }

    #[test]
    fn test_inches_to_cms_rounding() {
        assert_eq!(inches_to_cms(70), 178);
        assert_eq!(inches_to_cms(65), 165);
        assert_eq!(inches_to_cms(0), 0);
    }
}
