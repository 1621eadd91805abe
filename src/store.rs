use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{DbError, KeyValueStore};
use crate::models::{WorkoutRecord, WorkoutSet, WorkoutSplit};

pub const WORKOUTS_KEY: &str = "workouts";
pub const SPLIT_KEY: &str = "workoutSplit";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not read '{key}' from storage")]
    Read {
        key: &'static str,
        #[source]
        source: DbError,
    },
    #[error("Could not write '{key}' to storage")]
    Write {
        key: &'static str,
        #[source]
        source: DbError,
    },
    #[error("Stored value under '{key}' is corrupt: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize data for storage: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("A workout with id '{0}' is already stored")]
    DuplicateId(String),
}

/// Workout history and the active split on top of a key/value backend.
///
/// Writes are read-modify-write of the whole list. A single writer is assumed.
pub struct WorkoutStore {
    backend: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for WorkoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkoutStore").finish_non_exhaustive()
    }
}

impl WorkoutStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Raw JSON elements of the `workouts` array. Absent key is an empty list.
    fn load_raw_workouts(&self) -> Result<Vec<Value>, StoreError> {
        let blob = self
            .backend
            .get(WORKOUTS_KEY)
            .map_err(|source| StoreError::Read {
                key: WORKOUTS_KEY,
                source,
            })?;
        match blob {
            None => Ok(Vec::new()),
            Some(text) => serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                key: WORKOUTS_KEY,
                source,
            }),
        }
    }

    /// Loads every readable workout in insertion order.
    ///
    /// Elements that do not decode as a `WorkoutRecord` are skipped and logged.
    /// Missing ids and totals are filled in from the rest of the record.
    /// # Errors
    /// - `StoreError::Read` if the backend fails.
    /// - `StoreError::Corrupt` if the stored blob is not a JSON array.
    pub fn load_workouts(&self) -> Result<Vec<WorkoutRecord>, StoreError> {
        let raw = self.load_raw_workouts()?;
        let total = raw.len();
        let records: Vec<WorkoutRecord> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<WorkoutRecord>(value) {
                Ok(record) => Some(record.normalized()),
                Err(e) => {
                    warn!(index, error = %e, "Skipping unreadable workout record");
                    None
                }
            })
            .collect();
        debug!(loaded = records.len(), total, "Loaded workouts");
        Ok(records)
    }

    /// Appends a finished workout.
    ///
    /// Unreadable elements already in the list are written back untouched.
    /// On any error the stored list is left as it was.
    /// # Errors
    /// - `StoreError::Read` / `StoreError::Corrupt` if the existing list can't be read.
    /// - `StoreError::DuplicateId` if a stored record already uses `record.id`.
    /// - `StoreError::Serialize` / `StoreError::Write` if the new list can't be stored.
    pub fn append_workout(&self, record: &WorkoutRecord) -> Result<(), StoreError> {
        let mut raw = self.load_raw_workouts()?;
        let id_taken = raw
            .iter()
            .any(|value| value.get("id").and_then(Value::as_str) == Some(record.id.as_str()));
        if id_taken {
            return Err(StoreError::DuplicateId(record.id.clone()));
        }
        raw.push(serde_json::to_value(record).map_err(StoreError::Serialize)?);
        let blob = serde_json::to_string(&raw).map_err(StoreError::Serialize)?;
        self.backend
            .set(WORKOUTS_KEY, &blob)
            .map_err(|source| StoreError::Write {
                key: WORKOUTS_KEY,
                source,
            })?;
        info!(id = %record.id, count = raw.len(), "Workout saved");
        Ok(())
    }

    /// Up to `limit` workouts, most recent `start_time` first.
    /// # Errors
    /// Same as `load_workouts`.
    pub fn recent_workouts(&self, limit: usize) -> Result<Vec<WorkoutRecord>, StoreError> {
        let mut records = self.load_workouts()?;
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records.truncate(limit);
        Ok(records)
    }

    /// Looks up a stored workout by id.
    /// # Errors
    /// Same as `load_workouts`.
    pub fn find_workout(&self, id: &str) -> Result<Option<WorkoutRecord>, StoreError> {
        Ok(self.load_workouts()?.into_iter().find(|r| r.id == id))
    }

    /// Sets logged for `exercise_name` in the latest workout (by start time) that contains it.
    /// # Errors
    /// Same as `load_workouts`.
    pub fn previous_performance(
        &self,
        exercise_name: &str,
    ) -> Result<Option<Vec<WorkoutSet>>, StoreError> {
        let records = self.load_workouts()?;
        // `max_by_key` keeps the last of equal keys, so ties go to the later entry.
        let latest = records
            .iter()
            .filter(|r| r.exercise(exercise_name).is_some())
            .max_by_key(|r| r.start_time);
        Ok(latest
            .and_then(|r| r.exercise(exercise_name))
            .map(|log| log.sets.clone()))
    }

    /// The active split, `None` when no split has been configured yet.
    /// # Errors
    /// - `StoreError::Read` if the backend fails.
    /// - `StoreError::Corrupt` if the stored value is not a valid split.
    pub fn load_split(&self) -> Result<Option<WorkoutSplit>, StoreError> {
        let blob = self
            .backend
            .get(SPLIT_KEY)
            .map_err(|source| StoreError::Read {
                key: SPLIT_KEY,
                source,
            })?;
        blob.map(|text| {
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                key: SPLIT_KEY,
                source,
            })
        })
        .transpose()
    }

    /// Replaces the active split.
    /// # Errors
    /// `StoreError::Serialize` / `StoreError::Write` if it can't be stored.
    pub fn save_split(&self, split: &WorkoutSplit) -> Result<(), StoreError> {
        let blob = serde_json::to_string(split).map_err(StoreError::Serialize)?;
        self.backend
            .set(SPLIT_KEY, &blob)
            .map_err(|source| StoreError::Write {
                key: SPLIT_KEY,
                source,
            })?;
        info!(split_type = %split.split_type, days = split.days.len(), "Split saved");
        Ok(())
    }

    /// Removes all workouts and the split.
    /// # Errors
    /// `StoreError::Write` if the backend delete fails.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.backend
            .remove_all(&[WORKOUTS_KEY, SPLIT_KEY])
            .map_err(|source| StoreError::Write {
                key: WORKOUTS_KEY,
                source,
            })?;
        info!("All workout data cleared");
        Ok(())
    }
}
