use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::catalog::{custom_exercise, SetupError};
use crate::models::{
    generate_record_id, Exercise, ExerciseLog, SetField, SetValue, WorkoutRecord, WorkoutSet,
};
use crate::store::{StoreError, WorkoutStore};
use crate::timer::{Clock, RestTimer};
use crate::units::WeightUnit;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No exercises selected. Please select exercises before starting a workout.")]
    NoExercisesSelected,
    #[error("This workout is already finished.")]
    AlreadyFinished,
    #[error("There is no set #{index} for the current exercise ({len} logged).")]
    SetIndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    InvalidExercise(#[from] SetupError),
    #[error("Could not save workout data")]
    Persistence(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress { exercise_index: usize },
    Finished,
}

/// Outcome of moving past the current exercise.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next { exercise_index: usize },
    Finished(WorkoutRecord),
}

/// One active workout, from the first exercise to a saved `WorkoutRecord`.
pub struct WorkoutSession<'a> {
    store: &'a WorkoutStore,
    clock: Rc<dyn Clock>,
    split_day: String,
    exercises: Vec<Exercise>,
    state: SessionState,
    start_time: DateTime<Utc>,
    current_sets: Vec<WorkoutSet>,
    committed_sets: HashMap<String, Vec<WorkoutSet>>,
    committed_time: HashMap<String, u64>,
    timer: RestTimer,
    weight_unit: WeightUnit,
    // Built by a finish attempt whose save failed; reused on retry.
    unsaved_record: Option<WorkoutRecord>,
}

impl std::fmt::Debug for WorkoutSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkoutSession")
            .field("split_day", &self.split_day)
            .field("state", &self.state)
            .field("weight_unit", &self.weight_unit)
            .finish_non_exhaustive()
    }
}

impl<'a> WorkoutSession<'a> {
    /// Starts a session on the first of `exercises`.
    /// # Errors
    /// `SessionError::NoExercisesSelected` if `exercises` is empty.
    pub fn start(
        store: &'a WorkoutStore,
        clock: Rc<dyn Clock>,
        split_day: impl Into<String>,
        exercises: Vec<Exercise>,
        weight_unit: WeightUnit,
    ) -> Result<Self, SessionError> {
        if exercises.is_empty() {
            return Err(SessionError::NoExercisesSelected);
        }
        let split_day = split_day.into();
        let start_time = clock.now();
        info!(%split_day, exercises = exercises.len(), "Workout session started");
        Ok(Self {
            store,
            clock,
            split_day,
            exercises,
            state: SessionState::InProgress { exercise_index: 0 },
            start_time,
            current_sets: Vec::new(),
            committed_sets: HashMap::new(),
            committed_time: HashMap::new(),
            timer: RestTimer::default(),
            weight_unit,
            unsaved_record: None,
        })
    }

    // --- Accessors ---

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished)
    }

    pub fn split_day(&self) -> &str {
        &self.split_day
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub const fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::InProgress { exercise_index } => Some(exercise_index),
            SessionState::Finished => None,
        }
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.current_index().and_then(|i| self.exercises.get(i))
    }

    /// Sets logged so far for the current exercise.
    pub fn pending_sets(&self) -> &[WorkoutSet] {
        &self.current_sets
    }

    pub const fn weight_unit(&self) -> WeightUnit {
        self.weight_unit
    }

    pub fn timer_seconds(&self) -> u64 {
        self.timer.seconds(self.clock.now())
    }

    pub const fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    fn ensure_active(&self) -> Result<usize, SessionError> {
        self.current_index().ok_or(SessionError::AlreadyFinished)
    }

    /// Appends a custom exercise after the ones already planned.
    /// Returns its position in the workout.
    /// # Errors
    /// - `SessionError::AlreadyFinished` after the workout was saved.
    /// - `SessionError::InvalidExercise` if `name` is blank.
    pub fn add_exercise(&mut self, name: &str) -> Result<usize, SessionError> {
        self.ensure_active()?;
        let exercise = custom_exercise(name)?;
        debug!(name = %exercise.name, "Exercise added to session");
        self.exercises.push(exercise);
        self.unsaved_record = None;
        Ok(self.exercises.len() - 1)
    }

    // --- Rest timer ---

    /// Starts or stops the rest timer. Does nothing once the workout is finished.
    /// Returns whether the timer is running afterwards.
    pub fn toggle_timer(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let running = self.timer.toggle(self.clock.now());
        debug!(running, "Rest timer toggled");
        running
    }

    pub fn reset_timer(&mut self) {
        self.timer.reset();
    }

    // --- Weight units ---

    pub fn toggle_weight_unit(&mut self) -> WeightUnit {
        self.weight_unit = self.weight_unit.toggled();
        self.weight_unit
    }

    pub fn set_weight_unit(&mut self, unit: WeightUnit) {
        self.weight_unit = unit;
    }

    /// A set's weight in the current display unit (one decimal for pounds).
    pub fn display_weight(&self, set: &WorkoutSet) -> String {
        match set.weight.parsed() {
            Some(kg) if self.weight_unit == WeightUnit::Lb => {
                format!("{:.1}", self.weight_unit.from_kg(kg))
            }
            _ => set.weight.to_string(),
        }
    }

    // --- Set logging ---

    /// Appends an empty set stamped with the current rest time, then resets the timer.
    /// Returns the index of the new set.
    /// # Errors
    /// `SessionError::AlreadyFinished` after the workout was saved.
    pub fn add_set(&mut self) -> Result<usize, SessionError> {
        self.ensure_active()?;
        let rest_time = self.timer.seconds(self.clock.now());
        self.current_sets.push(WorkoutSet {
            rest_time: Some(rest_time),
            ..WorkoutSet::default()
        });
        self.timer.reset();
        self.unsaved_record = None;
        Ok(self.current_sets.len() - 1)
    }

    /// Adds a set and fills in both fields, as typed in the current display unit.
    /// # Errors
    /// `SessionError::AlreadyFinished` after the workout was saved.
    pub fn log_set(&mut self, weight: &str, reps: &str) -> Result<usize, SessionError> {
        let index = self.add_set()?;
        self.update_set(index, SetField::Weight, weight)?;
        self.update_set(index, SetField::Reps, reps)?;
        Ok(index)
    }

    /// Edits one field of a pending set.
    ///
    /// Weights typed in pounds are stored as kilograms rounded to one decimal.
    /// Blank or non-numeric input is kept as typed and counts as 0.
    /// # Errors
    /// - `SessionError::AlreadyFinished` after the workout was saved.
    /// - `SessionError::SetIndexOutOfRange` if `index` is not a pending set.
    pub fn update_set(
        &mut self,
        index: usize,
        field: SetField,
        value: &str,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        let len = self.current_sets.len();
        let unit = self.weight_unit;
        let set = self
            .current_sets
            .get_mut(index)
            .ok_or(SessionError::SetIndexOutOfRange { index, len })?;
        match field {
            SetField::Weight => set.weight = canonical_weight(unit, value),
            SetField::Reps => set.reps = SetValue::from_input(value),
        }
        self.unsaved_record = None;
        Ok(())
    }

    // --- Progression ---

    fn current_time_total(&self, now: DateTime<Utc>) -> u64 {
        let rests: u64 = self.current_sets.iter().filter_map(|s| s.rest_time).sum();
        rests + self.timer.seconds(now)
    }

    /// Moves to the next exercise, or finishes the workout when on the last one.
    /// # Errors
    /// - `SessionError::AlreadyFinished` after the workout was saved.
    /// - `SessionError::Persistence` if finishing could not save the record.
    pub fn next_exercise(&mut self) -> Result<Advance, SessionError> {
        let index = self.ensure_active()?;
        if index + 1 >= self.exercises.len() {
            return self.finish_workout().map(Advance::Finished);
        }
        let name = self.exercises[index].name.clone();
        let time = self.current_time_total(self.clock.now());
        self.committed_sets
            .insert(name.clone(), mem::take(&mut self.current_sets));
        self.committed_time.insert(name, time);
        self.timer.reset();
        self.unsaved_record = None;
        self.state = SessionState::InProgress {
            exercise_index: index + 1,
        };
        debug!(exercise_index = index + 1, "Advanced to next exercise");
        Ok(Advance::Next {
            exercise_index: index + 1,
        })
    }

    fn build_record(&self, index: usize) -> WorkoutRecord {
        let now = self.clock.now();
        let mut sets = self.committed_sets.clone();
        let mut times = self.committed_time.clone();
        let current = &self.exercises[index].name;
        sets.insert(current.clone(), self.current_sets.clone());
        times.insert(current.clone(), self.current_time_total(now));

        let exercises = self
            .exercises
            .iter()
            .map(|exercise| ExerciseLog {
                name: exercise.name.clone(),
                sets: sets.get(&exercise.name).cloned().unwrap_or_default(),
                total_time: times.get(&exercise.name).copied(),
            })
            .collect();
        WorkoutRecord::new(
            generate_record_id(now),
            self.split_day.clone(),
            self.start_time,
            now,
            exercises,
        )
    }

    /// Saves the workout and ends the session.
    ///
    /// If saving fails the session stays in progress and keeps the built record,
    /// so calling this again retries with the same record.
    /// # Errors
    /// - `SessionError::AlreadyFinished` after the workout was saved.
    /// - `SessionError::Persistence` if the store rejected the write.
    pub fn finish_workout(&mut self) -> Result<WorkoutRecord, SessionError> {
        let index = self.ensure_active()?;
        let record = match self.unsaved_record.take() {
            Some(record) => record,
            None => self.build_record(index),
        };
        if let Err(e) = self.store.append_workout(&record) {
            error!(id = %record.id, error = %e, "Error saving workout");
            self.unsaved_record = Some(record);
            return Err(e.into());
        }
        self.timer.reset();
        self.state = SessionState::Finished;
        info!(
            id = %record.id,
            total_sets = record.total_sets,
            total_volume = record.total_volume,
            "Workout finished"
        );
        Ok(record)
    }

    /// Ends the session without saving anything.
    pub fn abandon(mut self) {
        self.timer.reset();
        info!(split_day = %self.split_day, "Workout session abandoned");
    }

    // --- History lookups ---

    /// Sets from the most recent stored workout containing `exercise_name`.
    /// # Errors
    /// `SessionError::Persistence` if the history can't be read.
    pub fn load_previous_performance(
        &self,
        exercise_name: &str,
    ) -> Result<Option<Vec<WorkoutSet>>, SessionError> {
        Ok(self.store.previous_performance(exercise_name)?)
    }

    /// Previous performance for the exercise currently being logged.
    /// # Errors
    /// `SessionError::Persistence` if the history can't be read.
    pub fn previous_performance(&self) -> Result<Option<Vec<WorkoutSet>>, SessionError> {
        match self.current_exercise() {
            Some(exercise) => self.load_previous_performance(&exercise.name),
            None => Ok(None),
        }
    }
}

fn canonical_weight(unit: WeightUnit, input: &str) -> SetValue {
    match unit {
        WeightUnit::Kg => SetValue::from_input(input),
        WeightUnit::Lb => match SetValue::from_input(input).parsed() {
            Some(lb) => SetValue::Number(unit.to_kg(lb)),
            None => SetValue::from_input(input),
        },
    }
}
