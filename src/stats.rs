//! Read-only views derived from the stored workout list.
//!
//! Every function takes the records and an explicit `now`; nothing here reads
//! the system clock.
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::models::{WorkoutRecord, WorkoutSet};

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const WEEK_DAYS: i64 = 7;

/// Targets the weekly dashboard numbers are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyTargets {
    pub workouts_per_week: u32,
    pub calories_per_minute: u32,
}

impl Default for WeeklyTargets {
    fn default() -> Self {
        Self {
            workouts_per_week: 5,
            calories_per_minute: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub workouts: usize,
    pub total_minutes: i64,
    pub total_exercises: usize,
    /// Rough estimate: minutes times a flat per-minute rate.
    pub total_calories: i64,
    /// Percent of the weekly workout goal. Can exceed 100.
    pub workout_goal_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdaySeries {
    /// Oldest day first; index 6 is today.
    pub labels: [&'static str; 7],
    /// Workout minutes per day, aligned with `labels`.
    pub data: [i64; 7],
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseStats {
    pub total_volume: f64,
    pub max_weight: f64,
    pub max_reps: f64,
    pub total_sets: usize,
}

/// Totals for a single workout, recomputed from its sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub duration_minutes: i64,
    pub total_sets: usize,
    pub total_volume: f64,
    pub exercises: Vec<(String, ExerciseStats)>,
}

fn in_trailing_week<Tz: TimeZone>(record: &WorkoutRecord, now: &DateTime<Tz>) -> bool {
    record.start_time > now.with_timezone(&Utc) - Duration::days(WEEK_DAYS)
}

/// Totals over workouts started within the 7 days before `now`.
#[allow(clippy::cast_precision_loss)]
pub fn weekly_stats<Tz: TimeZone>(
    records: &[WorkoutRecord],
    now: &DateTime<Tz>,
    targets: &WeeklyTargets,
) -> WeeklyStats {
    let recent: Vec<&WorkoutRecord> = records
        .iter()
        .filter(|r| in_trailing_week(r, now))
        .collect();

    let total_minutes: i64 = recent.iter().map(|r| r.duration_minutes()).sum();
    let total_exercises = recent.iter().map(|r| r.total_exercises).sum();
    let workout_goal_progress = if targets.workouts_per_week == 0 {
        0.0
    } else {
        recent.len() as f64 / f64::from(targets.workouts_per_week) * 100.0
    };

    WeeklyStats {
        workouts: recent.len(),
        total_minutes,
        total_exercises,
        total_calories: total_minutes * i64::from(targets.calories_per_minute),
        workout_goal_progress,
    }
}

/// Minutes trained per weekday over the trailing week, rotated so today is last.
///
/// When several workouts in the window fall on the same weekday, the one that
/// comes later in `records` wins, regardless of timestamps.
pub fn durations_by_weekday<Tz: TimeZone>(
    records: &[WorkoutRecord],
    now: &DateTime<Tz>,
) -> WeekdaySeries {
    let tz = now.timezone();
    let mut by_weekday = [0_i64; 7];
    for record in records.iter().filter(|r| in_trailing_week(r, now)) {
        let weekday = record.start_time.with_timezone(&tz).weekday();
        by_weekday[weekday.num_days_from_sunday() as usize] = record.duration_minutes();
    }

    let today = now.weekday().num_days_from_sunday() as usize;
    let mut labels = [""; 7];
    let mut data = [0_i64; 7];
    for slot in 0..7 {
        let weekday = (today + 1 + slot) % 7;
        labels[slot] = WEEKDAY_LABELS[weekday];
        data[slot] = by_weekday[weekday];
    }
    WeekdaySeries { labels, data }
}

pub fn exercise_stats(sets: &[WorkoutSet]) -> ExerciseStats {
    if sets.is_empty() {
        return ExerciseStats::default();
    }
    ExerciseStats {
        total_volume: sets.iter().map(WorkoutSet::volume).sum(),
        max_weight: sets
            .iter()
            .map(|s| s.weight.number())
            .fold(f64::NEG_INFINITY, f64::max),
        max_reps: sets
            .iter()
            .map(|s| s.reps.number())
            .fold(f64::NEG_INFINITY, f64::max),
        total_sets: sets.len(),
    }
}

pub fn workout_summary(record: &WorkoutRecord) -> WorkoutSummary {
    let exercises: Vec<(String, ExerciseStats)> = record
        .exercises
        .iter()
        .map(|e| (e.name.clone(), exercise_stats(&e.sets)))
        .collect();
    WorkoutSummary {
        duration_minutes: record.duration_minutes(),
        total_sets: exercises.iter().map(|(_, s)| s.total_sets).sum(),
        total_volume: exercises.iter().map(|(_, s)| s.total_volume).sum(),
        exercises,
    }
}

/// Coarse "how long ago" label.
pub fn time_ago<Tz: TimeZone>(timestamp: DateTime<Utc>, now: &DateTime<Tz>) -> String {
    let hours = (now.with_timezone(&Utc) - timestamp).num_hours();
    match hours {
        h if h < 1 => "Just now".to_string(),
        h if h < 24 => format!("{h} hours ago"),
        h if h < 48 => "Yesterday".to_string(),
        h => format!("{} days ago", h / 24),
    }
}
