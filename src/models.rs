use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

const RECORD_ID_SUFFIX_LEN: usize = 9;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ExerciseCategory {
    Compound,
    Isolation,
    Bodyweight,
    #[default]
    Custom,
}

/// An exercise that can be picked for a session. `name` is the key within a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub category: ExerciseCategory,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: ExerciseCategory) -> Self {
        Self {
            name: name.into(),
            icon: "barbell-outline".to_string(),
            category,
        }
    }

    pub(crate) fn with_icon(name: &str, icon: &str, category: ExerciseCategory) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.to_string(),
            category,
        }
    }
}

/// A weight or rep value as it was captured.
///
/// Input fields hand over free text, converted weights are stored as numbers.
/// Anything that does not parse as a finite number counts as `0` in arithmetic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SetValue {
    Number(f64),
    Text(String),
}

impl Default for SetValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl SetValue {
    pub fn from_input(input: &str) -> Self {
        Self::Text(input.to_string())
    }

    /// Numeric value with the "invalid or blank is 0" policy applied.
    #[must_use]
    pub fn number(&self) -> f64 {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// Parsed value if the input actually holds a number.
    #[must_use]
    pub fn parsed(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl From<f64> for SetValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SetValue {
    fn from(value: &str) -> Self {
        Self::from_input(value)
    }
}

impl fmt::Display for SetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    #[serde(default)]
    pub weight: SetValue,
    #[serde(default)]
    pub reps: SetValue,
    /// Seconds on the rest timer when the set was added. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_time: Option<u64>,
}

impl WorkoutSet {
    pub fn new(weight: impl Into<SetValue>, reps: impl Into<SetValue>) -> Self {
        Self {
            weight: weight.into(),
            reps: reps.into(),
            rest_time: None,
        }
    }

    #[must_use]
    pub fn volume(&self) -> f64 {
        self.weight.number() * self.reps.number()
    }
}

/// Which field of a pending set an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SetField {
    Weight,
    Reps,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
    pub name: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
    /// Accumulated rest-timer seconds for this exercise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<u64>,
}

impl ExerciseLog {
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.sets.iter().map(WorkoutSet::volume).sum()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkoutSplit {
    #[serde(rename = "type")]
    pub split_type: String,
    pub days: Vec<String>,
}

impl WorkoutSplit {
    #[must_use]
    pub fn has_day(&self, day: &str) -> bool {
        self.days.iter().any(|d| d == day)
    }
}

/// One finished workout. Built once when a session ends and never changed afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub split_day: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exercises: Vec<ExerciseLog>,
    #[serde(default)]
    pub total_exercises: usize,
    #[serde(default)]
    pub total_sets: usize,
    #[serde(default)]
    pub total_volume: f64,
}

impl WorkoutRecord {
    /// Builds a record and derives its totals from `exercises`.
    pub fn new(
        id: String,
        split_day: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exercises: Vec<ExerciseLog>,
    ) -> Self {
        let total_sets = exercises.iter().map(|e| e.sets.len()).sum();
        let total_volume = exercises.iter().map(ExerciseLog::volume).sum();
        Self {
            id,
            split_day: split_day.into(),
            start_time,
            // A clock stepping backwards must not produce a negative duration.
            end_time: end_time.max(start_time),
            total_exercises: exercises.len(),
            exercises,
            total_sets,
            total_volume,
        }
    }

    /// Rebuilds the totals from `exercises` and gives an id-less record one
    /// derived from its start time. Records from early app versions stored
    /// neither.
    #[must_use]
    pub fn normalized(self) -> Self {
        let id = if self.id.is_empty() {
            self.start_time.timestamp_millis().to_string()
        } else {
            self.id
        };
        Self::new(id, self.split_day, self.start_time, self.end_time, self.exercises)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Whole minutes between start and end.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    #[must_use]
    pub fn exercise(&self, name: &str) -> Option<&ExerciseLog> {
        self.exercises.iter().find(|e| e.name == name)
    }
}

/// Generates a record id of the form `<unix-millis>-<9 alphanumerics>`.
pub fn generate_record_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}",
        now.timestamp_millis(),
        &suffix[..RECORD_ID_SUFFIX_LEN]
    )
}
