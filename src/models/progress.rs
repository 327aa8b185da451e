//! Progress tracking data

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of points up to which every chart label is shown
const ALL_LABELS_THRESHOLD: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightHistoryItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub date: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutHistoryItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub date: String,
    pub workout_id: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    pub weight_data: WeightData,
    pub workout_data: WorkoutData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightData {
    pub history: Vec<WeightHistoryItem>,
    #[serde(default)]
    pub metrics: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutData {
    pub history: Vec<WorkoutHistoryItem>,
    pub metrics: Option<MetricsData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsData {
    pub frequency: Frequency,
    pub most_recent: Option<MostRecent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frequency {
    pub total_workouts: u32,
    pub workouts_this_week: u32,
    pub days_tracked: u32,
    pub longest_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MostRecent {
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightHistoryResponse {
    pub weight_history: Vec<WeightHistoryItem>,
}

/// Body of a weight update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateWeightPayload {
    /// `yyyy-MM-dd` in New York
    pub date: String,
    pub weight: f64,
}

/// Body of a workout completion entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutCompletionPayload {
    pub date: String,
}

/// Parse a weight typed by the user; it must be a positive number
pub fn parse_weight_input(input: &str) -> Result<f64, Error> {
    match input.trim().parse::<f64>() {
        Ok(weight) if weight.is_finite() && weight > 0.0 => Ok(weight),
        _ => Err(Error::malformed("weight", input)),
    }
}

/// Figures shown on the progress screen
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub workouts_completed: u32,
    pub longest_streak: u32,
    /// Oldest first
    pub weight_history: Vec<WeightHistoryItem>,
    pub start_weight: f64,
    pub end_weight: f64,
    pub weight_change: f64,
    /// Rounded to one decimal; zero when there is no starting weight
    pub weight_change_percent: f64,
}

impl From<&ProgressData> for ProgressSummary {
    fn from(progress: &ProgressData) -> Self {
        let frequency = progress.workout_data.metrics.as_ref().map(|m| m.frequency);

        let mut weight_history = progress.weight_data.history.clone();
        // yyyy-MM-dd and ISO timestamps both sort chronologically as text
        weight_history.sort_by(|a, b| a.date.cmp(&b.date));

        let start_weight = weight_history.first().map_or(0.0, |w| w.weight);
        let end_weight = weight_history.last().map_or(0.0, |w| w.weight);
        let weight_change = end_weight - start_weight;
        let weight_change_percent = if start_weight == 0.0 {
            0.0
        } else {
            (weight_change / start_weight * 1000.0).round() / 10.0
        };

        Self {
            workouts_completed: frequency.map_or(0, |f| f.total_workouts),
            longest_streak: frequency.map_or(0, |f| f.longest_streak),
            weight_history,
            start_weight,
            end_weight,
            weight_change,
            weight_change_percent,
        }
    }
}

impl ProgressSummary {
    /// `MM-dd` labels for the weight chart
    ///
    /// Short series label every point; longer ones label the first and last
    /// point plus two evenly spaced points in between.
    pub fn chart_labels(&self) -> Vec<String> {
        let history = &self.weight_history;
        let label = |item: &WeightHistoryItem| item.date.get(5..10).unwrap_or(&item.date).to_string();

        if history.len() <= ALL_LABELS_THRESHOLD {
            return history.iter().map(label).collect();
        }

        let len = history.len();
        let mut indices = vec![0, len / 3, (2 * len) / 3, len - 1];
        indices.dedup();
        indices.into_iter().map(|i| label(&history[i])).collect()
    }
}
