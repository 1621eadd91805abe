use thiserror::Error;

use crate::models::{Exercise, ExerciseCategory, WorkoutSplit};

pub const CUSTOM_SPLIT_TYPE: &str = "Custom";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SetupError {
    #[error("No workout split configured. Set one up with 'split set'.")]
    NoSplitConfigured,
    #[error("'{0}' is not a day of the current split.")]
    UnknownSplitDay(String),
    #[error("Unknown split preset: '{0}'")]
    UnknownPreset(String),
    #[error("A split needs at least one day.")]
    EmptySplit,
    #[error("Please enter a name for your custom exercise.")]
    BlankExerciseName,
}

/// A ready-made split offered at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub days: &'static [&'static str],
    pub recommended: bool,
}

impl SplitPreset {
    #[must_use]
    pub fn to_split(&self) -> WorkoutSplit {
        WorkoutSplit {
            split_type: self.name.to_string(),
            days: self.days.iter().map(|d| (*d).to_string()).collect(),
        }
    }
}

pub const SPLIT_PRESETS: [SplitPreset; 4] = [
    SplitPreset {
        name: "Push/Pull/Legs",
        description: "3-6 days per week",
        days: &["Push", "Pull", "Legs"],
        recommended: true,
    },
    SplitPreset {
        name: "Upper/Lower",
        description: "4 days per week",
        days: &["Upper", "Lower"],
        recommended: false,
    },
    SplitPreset {
        name: "Bro Split",
        description: "5 days per week",
        days: &["Chest", "Back", "Legs", "Shoulders", "Arms"],
        recommended: false,
    },
    SplitPreset {
        name: "Full Body",
        description: "3 days per week",
        days: &["Full Body A", "Full Body B", "Full Body C"],
        recommended: false,
    },
];

/// Finds a preset by name, ignoring case.
pub fn find_preset(name: &str) -> Result<&'static SplitPreset, SetupError> {
    SPLIT_PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| SetupError::UnknownPreset(name.to_string()))
}

/// Collects the days of a custom split, in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomSplitBuilder {
    days: Vec<String>,
}

impl CustomSplitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a day. Blank names and names already added are ignored.
    /// Returns whether the day was added.
    pub fn add_day(&mut self, day: &str) -> bool {
        let day = day.trim();
        if day.is_empty() || self.days.iter().any(|d| d == day) {
            return false;
        }
        self.days.push(day.to_string());
        true
    }

    pub fn remove_day(&mut self, day: &str) {
        self.days.retain(|d| d != day);
    }

    pub fn days(&self) -> &[String] {
        &self.days
    }

    /// # Errors
    /// `SetupError::EmptySplit` if no day was added.
    pub fn build(self) -> Result<WorkoutSplit, SetupError> {
        if self.days.is_empty() {
            return Err(SetupError::EmptySplit);
        }
        Ok(WorkoutSplit {
            split_type: CUSTOM_SPLIT_TYPE.to_string(),
            days: self.days,
        })
    }
}

/// Suggested exercises for a split day. Days without suggestions get an empty list.
pub fn default_exercises(split_day: &str) -> Vec<Exercise> {
    use ExerciseCategory::{Bodyweight, Compound, Isolation};
    let table: &[(&str, &str, ExerciseCategory)] = match split_day {
        "Push" => &[
            ("Bench Press", "barbell-outline", Compound),
            ("Overhead Press", "barbell-outline", Compound),
            ("Incline Bench Press", "barbell-outline", Compound),
            ("Dips", "body-outline", Compound),
            ("Lateral Raises", "fitness-outline", Isolation),
            ("Tricep Pushdowns", "git-network-outline", Isolation),
            ("Front Raises", "fitness-outline", Isolation),
            ("Close Grip Bench", "barbell-outline", Compound),
            ("Machine Chest Press", "fitness-outline", Compound),
            ("Tricep Extensions", "fitness-outline", Isolation),
            ("Push-Ups", "body-outline", Bodyweight),
            ("Cable Flyes", "git-network-outline", Isolation),
        ],
        "Pull" => &[
            ("Pull-ups", "body-outline", Compound),
            ("Barbell Rows", "barbell-outline", Compound),
            ("Deadlifts", "barbell-outline", Compound),
            ("Lat Pulldowns", "git-network-outline", Compound),
            ("Face Pulls", "git-network-outline", Isolation),
            ("Bicep Curls", "barbell-outline", Isolation),
            ("Cable Rows", "git-network-outline", Compound),
            ("Hammer Curls", "fitness-outline", Isolation),
            ("Preacher Curls", "fitness-outline", Isolation),
            ("Reverse Flyes", "fitness-outline", Isolation),
            ("Chin-ups", "body-outline", Compound),
            ("Shrugs", "barbell-outline", Isolation),
        ],
        "Chest" => &[
            ("Bench Press", "barbell-outline", Compound),
            ("Incline Press", "trending-up", Compound),
            ("Chest Flyes", "fitness-outline", Isolation),
            ("Dips", "body-outline", Compound),
            ("Push-Ups", "arrow-down", Bodyweight),
            ("Cable Crossover", "git-network-outline", Isolation),
        ],
        "Back" => &[
            ("Pull-ups", "arrow-up", Compound),
            ("Barbell Rows", "barbell-outline", Compound),
            ("Lat Pulldowns", "trending-down", Isolation),
            ("Deadlifts", "barbell-outline", Compound),
            ("Face Pulls", "git-network-outline", Isolation),
            ("Cable Rows", "git-network-outline", Isolation),
        ],
        "Shoulders" => &[
            ("Overhead Press", "barbell-outline", Compound),
            ("Lateral Raises", "fitness-outline", Isolation),
            ("Front Raises", "fitness-outline", Isolation),
            ("Arnold Press", "barbell-outline", Compound),
            ("Face Pulls", "git-network-outline", Isolation),
            ("Reverse Flyes", "fitness-outline", Isolation),
        ],
        _ => &[],
    };
    table
        .iter()
        .map(|(name, icon, category)| Exercise::with_icon(name, icon, *category))
        .collect()
}

/// A user-defined exercise.
/// # Errors
/// `SetupError::BlankExerciseName` if `name` is blank.
pub fn custom_exercise(name: &str) -> Result<Exercise, SetupError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SetupError::BlankExerciseName);
    }
    Ok(Exercise::new(name, ExerciseCategory::Custom))
}

/// Ordered pick list of exercises for one session, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseSelection {
    selected: Vec<Exercise>,
}

impl ExerciseSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the exercise, or deselects it if one with the same name is already selected.
    /// Returns whether it is selected afterwards.
    pub fn toggle(&mut self, exercise: Exercise) -> bool {
        if let Some(pos) = self.selected.iter().position(|e| e.name == exercise.name) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(exercise);
            true
        }
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn into_exercises(self) -> Vec<Exercise> {
        self.selected
    }
}
