use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::info;

// --- Declare modules ---
pub mod catalog;
mod config;
pub mod db;
pub mod models;
pub mod session;
pub mod stats;
pub mod store;
pub mod timer;
pub mod units;

// --- Expose public types ---
pub use catalog::{
    custom_exercise, default_exercises, find_preset, CustomSplitBuilder, ExerciseSelection,
    SetupError, SplitPreset, SPLIT_PRESETS,
};
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, ConfigError, StandardColor, Theme,
};
pub use db::{get_db_path as get_db_path_util, DbError, KeyValueStore, SqliteStore};
pub use models::{
    Exercise, ExerciseCategory, ExerciseLog, SetField, SetValue, WorkoutRecord, WorkoutSet,
    WorkoutSplit,
};
pub use session::{Advance, SessionError, SessionState, WorkoutSession};
pub use stats::{ExerciseStats, WeekdaySeries, WeeklyStats, WeeklyTargets, WorkoutSummary};
pub use store::{StoreError, WorkoutStore};
pub use timer::{format_time, Clock, ManualClock, SystemClock};
pub use units::WeightUnit;

pub struct AppService {
    pub config: Config,
    pub store: WorkoutStore,
    pub clock: Rc<dyn Clock>,
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl AppService {
    /// Initializes the application service.
    /// # Errors
    /// Returns `anyhow::Error` if config/db path determination, loading, or initialization fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let db_path = db::get_db_path().context("Failed to determine database path")?;
        let backend = SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database at {db_path:?}"))?;

        Ok(Self {
            config,
            store: WorkoutStore::new(backend),
            clock: Rc::new(SystemClock),
            db_path,
            config_path,
        })
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // --- Configuration ---

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the unit new sessions start in.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_default_unit(&mut self, unit: WeightUnit) -> Result<(), ConfigError> {
        self.config.default_unit = unit;
        self.save_config()
    }

    /// Sets the number of workouts per week counted as 100% of the goal.
    /// # Errors
    /// - `ConfigError::InvalidWeeklyGoal` if `goal` is 0.
    /// - `ConfigError` variants if saving fails.
    pub fn set_weekly_goal(&mut self, goal: u32) -> Result<(), ConfigError> {
        if goal == 0 {
            return Err(ConfigError::InvalidWeeklyGoal(goal));
        }
        self.config.weekly_workout_goal = goal;
        self.save_config()
    }

    // --- Split setup ---

    /// The active split, `None` if setup hasn't happened yet.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the split can't be read.
    pub fn get_split(&self) -> Result<Option<WorkoutSplit>> {
        self.store
            .load_split()
            .context("Failed to load workout split")
    }

    /// The active split, or `SetupError::NoSplitConfigured`.
    /// # Errors
    /// - `SetupError::NoSplitConfigured` if no split is stored.
    /// - `StoreError` if the split can't be read.
    pub fn require_split(&self) -> Result<WorkoutSplit> {
        match self.get_split()? {
            Some(split) => Ok(split),
            None => bail!(SetupError::NoSplitConfigured),
        }
    }

    /// Replaces the active split.
    /// # Errors
    /// - `SetupError::EmptySplit` if `split` has no days.
    /// - `StoreError` if the write fails.
    pub fn set_split(&self, split: &WorkoutSplit) -> Result<()> {
        if split.days.is_empty() {
            bail!(SetupError::EmptySplit);
        }
        self.store
            .save_split(split)
            .context("Failed to save workout split")
    }

    /// Makes a preset the active split.
    /// # Errors
    /// - `SetupError::UnknownPreset` if no preset has that name.
    /// - `StoreError` if the write fails.
    pub fn choose_preset(&self, name: &str) -> Result<WorkoutSplit> {
        let split = catalog::find_preset(name)?.to_split();
        self.set_split(&split)?;
        Ok(split)
    }

    /// Suggested exercises for a day of the active split.
    /// # Errors
    /// - `SetupError::NoSplitConfigured` if no split is stored.
    /// - `SetupError::UnknownSplitDay` if the split has no such day.
    pub fn exercises_for_day(&self, split_day: &str) -> Result<Vec<Exercise>> {
        let split = self.require_split()?;
        if !split.has_day(split_day) {
            bail!(SetupError::UnknownSplitDay(split_day.to_string()));
        }
        Ok(catalog::default_exercises(split_day))
    }

    // --- Sessions ---

    /// Starts a workout over `exercises`, in order, using the configured default unit.
    /// # Errors
    /// `SessionError::NoExercisesSelected` if `exercises` is empty.
    pub fn start_session(
        &self,
        split_day: &str,
        exercises: Vec<Exercise>,
    ) -> Result<WorkoutSession<'_>, SessionError> {
        WorkoutSession::start(
            &self.store,
            Rc::clone(&self.clock),
            split_day,
            exercises,
            self.config.default_unit,
        )
    }

    // --- History ---

    /// Loads every stored workout in insertion order.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the history can't be read.
    pub fn list_workouts(&self) -> Result<Vec<WorkoutRecord>> {
        self.store
            .load_workouts()
            .context("Failed to load workout history")
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the history can't be read.
    pub fn get_recent_workouts(&self, limit: usize) -> Result<Vec<WorkoutRecord>> {
        self.store
            .recent_workouts(limit)
            .context("Failed to load recent workouts")
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the history can't be read.
    pub fn get_workout(&self, id: &str) -> Result<Option<WorkoutRecord>> {
        self.store
            .find_workout(id)
            .with_context(|| format!("Failed to load workout '{id}'"))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the history can't be read.
    pub fn previous_performance(&self, exercise_name: &str) -> Result<Option<Vec<WorkoutSet>>> {
        self.store
            .previous_performance(exercise_name)
            .with_context(|| format!("Failed to load previous sets for '{exercise_name}'"))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the history can't be read.
    pub fn get_weekly_stats<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<WeeklyStats> {
        let records = self.list_workouts()?;
        Ok(stats::weekly_stats(
            &records,
            now,
            &self.config.weekly_targets(),
        ))
    }

    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the history can't be read.
    pub fn get_weekday_series<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<WeekdaySeries> {
        let records = self.list_workouts()?;
        Ok(stats::durations_by_weekday(&records, now))
    }

    /// Removes all workouts and the split.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError` if the delete fails.
    pub fn clear_all_data(&self) -> Result<()> {
        self.store
            .clear_all()
            .context("Failed to clear workout data")?;
        info!("Local data cleared");
        Ok(())
    }
}
