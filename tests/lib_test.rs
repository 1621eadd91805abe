use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::cell::Cell;
use std::rc::Rc;
use liftlog_lib::{
    catalog, store, units, Advance, AppService, Clock, Config, CustomSplitBuilder, DbError, Exercise,
    ExerciseCategory, KeyValueStore, ManualClock, SessionError, SessionState, SetField, SetValue,
    SetupError, SqliteStore, StoreError, WeightUnit, WorkoutRecord, WorkoutSet, WorkoutSplit,
    WorkoutStore,
};

// Key/value backend whose writes can be made to fail on demand.
// Clones share the same database and flag.
#[derive(Clone)]
struct FlakyKv {
    inner: Rc<SqliteStore>,
    fail_writes: Rc<Cell<bool>>,
}

impl FlakyKv {
    fn new() -> Result<Self> {
        Ok(Self {
            inner: Rc::new(SqliteStore::open_in_memory()?),
            fail_writes: Rc::new(Cell::new(false)),
        })
    }

    fn write_error() -> DbError {
        DbError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }
}

impl KeyValueStore for FlakyKv {
    fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        if self.fail_writes.get() {
            return Err(Self::write_error());
        }
        self.inner.set(key, value)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), DbError> {
        if self.fail_writes.get() {
            return Err(Self::write_error());
        }
        self.inner.remove_all(keys)
    }
}

fn base_time() -> DateTime<Utc> {
    // Friday
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

// Helper function to create a test service with in-memory database and a manual clock
fn create_test_service() -> Result<(AppService, FlakyKv, ManualClock)> {
    let kv = FlakyKv::new()?;
    let clock = ManualClock::new(base_time());
    let service = AppService {
        config: Config::default(),
        store: WorkoutStore::new(kv.clone()),
        clock: Rc::new(clock.clone()),
        db_path: ":memory:".into(),
        config_path: "test_config.toml".into(),
    };
    Ok((service, kv, clock))
}

fn exercises(names: &[&str]) -> Vec<Exercise> {
    names
        .iter()
        .map(|n| Exercise::new(*n, ExerciseCategory::Compound))
        .collect()
}

fn stored_record(id: &str, start: DateTime<Utc>, exercise: &str, sets: Vec<WorkoutSet>) -> WorkoutRecord {
    let logs = vec![liftlog_lib::ExerciseLog {
        name: exercise.to_string(),
        sets,
        total_time: None,
    }];
    WorkoutRecord::new(id.to_string(), "Push", start, start + Duration::minutes(30), logs)
}

#[test]
fn test_start_session_without_exercises_is_refused() -> Result<()> {
    let (service, _, _) = create_test_service()?;
    let result = service.start_session("Push", Vec::new());
    assert!(matches!(result, Err(SessionError::NoExercisesSelected)));
    assert!(service.list_workouts()?.is_empty());
    Ok(())
}

#[test]
fn test_two_exercise_workout_totals() -> Result<()> {
    let (service, _, clock) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench", "Squat"]))?;

    session.log_set("60", "10")?;
    let advance = session.next_exercise()?;
    assert_eq!(advance, Advance::Next { exercise_index: 1 });
    assert_eq!(session.current_exercise().map(|e| e.name.as_str()), Some("Squat"));
    assert!(session.pending_sets().is_empty());

    session.log_set("100", "5")?;
    clock.advance(Duration::minutes(45));
    let record = match session.next_exercise()? {
        Advance::Finished(record) => record,
        other => panic!("Expected the workout to finish, got {other:?}"),
    };

    assert_eq!(record.total_exercises, 2);
    assert_eq!(record.total_sets, 2);
    assert_eq!(record.total_volume, 1100.0);
    assert_eq!(record.split_day, "Push");
    assert_eq!(record.duration_minutes(), 45);
    assert!(record.end_time >= record.start_time);
    assert_eq!(record.exercises[0].name, "Bench");
    assert_eq!(record.exercises[1].name, "Squat");
    assert!(session.is_finished());

    // Persisted exactly once
    let stored = service.list_workouts()?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], record);
    Ok(())
}

#[test]
fn test_totals_match_sets_with_blank_and_text_values() -> Result<()> {
    let (service, _, _) = create_test_service()?;
    let mut session = service.start_session("Pull", exercises(&["Rows", "Curls", "Shrugs"]))?;

    session.log_set("70.5", "8")?;
    session.add_set()?; // left blank on purpose
    session.log_set("heavy", "12")?;
    session.next_exercise()?;
    session.log_set("12.5", "10")?;
    session.next_exercise()?;
    let record = session.finish_workout()?;

    let expected_sets: usize = record.exercises.iter().map(|e| e.sets.len()).sum();
    let expected_volume: f64 = record
        .exercises
        .iter()
        .map(|e| e.sets.iter().map(|s| s.weight.number() * s.reps.number()).sum::<f64>())
        .sum();
    assert_eq!(record.total_sets, expected_sets);
    assert_eq!(record.total_sets, 4);
    assert_eq!(record.total_volume, expected_volume);
    assert_eq!(record.total_volume, 70.5 * 8.0 + 12.5 * 10.0);

    // Shrugs never got a set but still shows up
    assert_eq!(record.total_exercises, 3);
    assert!(record.exercises[2].sets.is_empty());
    Ok(())
}

#[test]
fn test_pound_input_is_stored_in_kilograms() -> Result<()> {
    let (service, _, _) = create_test_service()?;
    let mut session = service.start_session("Legs", exercises(&["Squat"]))?;

    assert_eq!(session.toggle_weight_unit(), WeightUnit::Lb);
    let index = session.add_set()?;
    session.update_set(index, SetField::Weight, "220")?;
    session.update_set(index, SetField::Reps, "5")?;

    let set = &session.pending_sets()[index];
    assert!((set.weight.number() - 99.8).abs() < 0.05);
    assert_eq!(set.reps, SetValue::from_input("5"));
    assert_eq!(session.display_weight(set), "220.0");

    // Switching the display unit leaves the stored value alone
    session.toggle_weight_unit();
    assert!((session.pending_sets()[index].weight.number() - 99.8).abs() < 0.05);
    assert_eq!(session.display_weight(&session.pending_sets()[index]), "99.8");
    Ok(())
}

#[test]
fn test_unit_round_trip_stays_within_tolerance() {
    let mut kg = 0.0;
    while kg <= 500.0 {
        let back = units::lb_to_kg(units::kg_to_lb(kg));
        assert!((back - kg).abs() <= 0.2, "{kg} kg came back as {back}");
        kg += 0.37;
    }
}

#[test]
fn test_rest_timer_lifecycle() -> Result<()> {
    let (service, _, clock) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench", "Dips"]))?;

    assert!(session.toggle_timer());
    clock.advance(Duration::seconds(30));
    assert_eq!(session.timer_seconds(), 30);

    // Adding a set records the rest and restarts the count from zero
    let index = session.add_set()?;
    assert_eq!(session.pending_sets()[index].rest_time, Some(30));
    assert_eq!(session.timer_seconds(), 0);
    assert!(!session.is_timer_running());

    // Stopped timers keep their value
    session.toggle_timer();
    clock.advance(Duration::seconds(12));
    assert!(!session.toggle_timer());
    clock.advance(Duration::seconds(100));
    assert_eq!(session.timer_seconds(), 12);

    session.reset_timer();
    assert_eq!(session.timer_seconds(), 0);

    // Moving on stops and clears a running timer
    session.toggle_timer();
    clock.advance(Duration::seconds(5));
    session.next_exercise()?;
    assert!(!session.is_timer_running());
    assert_eq!(session.timer_seconds(), 0);

    session.finish_workout()?;
    assert!(!session.toggle_timer());
    assert!(matches!(session.add_set(), Err(SessionError::AlreadyFinished)));
    Ok(())
}

#[test]
fn test_exercise_total_time_accumulates_rest() -> Result<()> {
    let (service, _, clock) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench"]))?;

    session.toggle_timer();
    clock.advance(Duration::seconds(90));
    session.log_set("60", "10")?;
    session.toggle_timer();
    clock.advance(Duration::seconds(20));
    let record = session.finish_workout()?;

    assert_eq!(record.exercises[0].total_time, Some(110));
    Ok(())
}

#[test]
fn test_exercise_added_mid_session_is_saved() -> Result<()> {
    let (service, _, clock) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench"]))?;

    assert!(matches!(
        session.add_exercise("  "),
        Err(SessionError::InvalidExercise(SetupError::BlankExerciseName))
    ));
    assert_eq!(session.add_exercise(" Farmer Walk ")?, 1);

    session.log_set("60", "10")?;
    assert_eq!(session.next_exercise()?, Advance::Next { exercise_index: 1 });
    session.toggle_timer();
    clock.advance(Duration::seconds(45));
    session.log_set("40", "3")?;
    let record = match session.next_exercise()? {
        Advance::Finished(record) => record,
        other => panic!("Expected the workout to finish, got {other:?}"),
    };

    assert_eq!(record.total_exercises, 2);
    assert_eq!(record.exercises[1].name, "Farmer Walk");
    assert_eq!(record.exercises[1].sets, vec![WorkoutSet {
        rest_time: Some(45),
        ..WorkoutSet::new("40", "3")
    }]);
    assert_eq!(record.exercises[1].total_time, Some(45));
    assert_eq!(record.total_volume, 720.0);
    assert_eq!(service.list_workouts()?, vec![record]);

    // No more exercises once saved
    assert!(matches!(
        session.add_exercise("Dips"),
        Err(SessionError::AlreadyFinished)
    ));
    Ok(())
}

#[test]
fn test_abandoned_session_saves_nothing() -> Result<()> {
    let (service, kv, clock) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench", "Dips"]))?;
    session.log_set("60", "10")?;
    session.next_exercise()?;
    session.toggle_timer();
    clock.advance(Duration::minutes(5));
    session.abandon();

    assert!(service.list_workouts()?.is_empty());
    assert_eq!(kv.inner.get(store::WORKOUTS_KEY)?, None);
    Ok(())
}

#[test]
fn test_update_set_out_of_range() -> Result<()> {
    let (service, _, _) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench"]))?;
    session.add_set()?;
    let result = session.update_set(3, SetField::Reps, "8");
    assert!(matches!(
        result,
        Err(SessionError::SetIndexOutOfRange { index: 3, len: 1 })
    ));
    Ok(())
}

#[test]
fn test_failed_save_keeps_session_for_retry() -> Result<()> {
    let (service, kv, clock) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench", "Dips"]))?;
    session.log_set("60", "10")?;
    session.next_exercise()?;
    session.log_set("0", "15")?;

    kv.fail_writes.set(true);
    let result = session.next_exercise();
    assert!(matches!(
        result,
        Err(SessionError::Persistence(StoreError::Write { .. }))
    ));
    assert_eq!(session.state(), SessionState::InProgress { exercise_index: 1 });
    assert_eq!(session.pending_sets().len(), 1);
    assert!(service.list_workouts()?.is_empty());

    let failed_at = clock.now();
    clock.advance(Duration::minutes(2));
    kv.fail_writes.set(false);
    let record = session.finish_workout()?;

    // The record built on the first attempt is the one that gets saved
    assert_eq!(record.end_time, failed_at);
    assert_eq!(record.total_sets, 2);
    assert_eq!(record.total_volume, 600.0);
    assert_eq!(service.list_workouts()?.len(), 1);
    Ok(())
}

#[test]
fn test_recent_workouts_sorted_by_start_time() -> Result<()> {
    let (service, _, _) = create_test_service()?;
    let t = base_time();
    for (id, days_ago) in [("a", 3), ("b", 1), ("c", 5), ("d", 2)] {
        let record = stored_record(id, t - Duration::days(days_ago), "Bench", Vec::new());
        service.store.append_workout(&record)?;
    }

    let recent = service.get_recent_workouts(10)?;
    let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "d", "a", "c"]);

    let limited = service.get_recent_workouts(2)?;
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, "b");
    Ok(())
}

#[test]
fn test_duplicate_id_is_rejected() -> Result<()> {
    let (service, _, _) = create_test_service()?;
    let record = stored_record("same", base_time(), "Bench", Vec::new());
    service.store.append_workout(&record)?;
    let result = service.store.append_workout(&record);
    assert!(matches!(result, Err(StoreError::DuplicateId(id)) if id == "same"));
    assert_eq!(service.list_workouts()?.len(), 1);
    Ok(())
}

#[test]
fn test_previous_performance_uses_latest_workout() -> Result<()> {
    let (service, _, _) = create_test_service()?;
    let t = base_time();
    let newer = stored_record("newer", t - Duration::days(1), "Bench", vec![WorkoutSet::new("65", "8")]);
    let older = stored_record("older", t - Duration::days(4), "Bench", vec![WorkoutSet::new("60", "10")]);
    // Insertion order deliberately differs from start order
    service.store.append_workout(&newer)?;
    service.store.append_workout(&older)?;

    let mut session = service.start_session("Push", exercises(&["Bench", "Dips"]))?;
    let previous = session.previous_performance()?;
    assert_eq!(previous, Some(vec![WorkoutSet::new("65", "8")]));

    session.next_exercise()?;
    assert_eq!(session.previous_performance()?, None);
    assert_eq!(session.load_previous_performance("Bench")?, previous);
    Ok(())
}

#[test]
fn test_malformed_records_are_skipped_and_preserved() -> Result<()> {
    let (service, kv, _) = create_test_service()?;
    let good = stored_record("good", base_time(), "Bench", vec![WorkoutSet::new(60.0, 10.0)]);
    let blob = format!(
        r#"[{{"id":"broken","exercises":"nope"}}, {}]"#,
        serde_json::to_string(&good)?
    );
    kv.inner.set(store::WORKOUTS_KEY, &blob)?;

    let loaded = service.list_workouts()?;
    assert_eq!(loaded, vec![good]);

    let extra = stored_record("extra", base_time(), "Dips", Vec::new());
    service.store.append_workout(&extra)?;
    assert_eq!(service.list_workouts()?.len(), 2);

    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&kv.inner.get(store::WORKOUTS_KEY)?.unwrap_or_default())?;
    assert_eq!(raw.len(), 3);
    assert_eq!(raw[0]["id"], "broken");
    Ok(())
}

#[test]
fn test_records_without_id_or_totals_are_loaded() -> Result<()> {
    let (service, kv, _) = create_test_service()?;
    let blob = r#"[{"splitDay":"Push","startTime":"2024-03-15T12:00:00.000Z","endTime":"2024-03-15T12:45:00.000Z","exercises":[{"name":"Bench","sets":[{"weight":"60","reps":"10","restTime":0}]}]}]"#;
    kv.inner.set(store::WORKOUTS_KEY, blob)?;

    let loaded = service.list_workouts()?;
    assert_eq!(loaded.len(), 1);
    let record = &loaded[0];
    assert_eq!(record.id, base_time().timestamp_millis().to_string());
    assert_eq!(record.total_exercises, 1);
    assert_eq!(record.total_sets, 1);
    assert_eq!(record.total_volume, 600.0);
    assert_eq!(record.duration_minutes(), 45);

    // Same id on every load, so it can be looked up
    assert!(service.get_workout(&record.id)?.is_some());
    let prev = service.previous_performance("Bench")?.unwrap_or_default();
    assert_eq!(prev.len(), 1);
    Ok(())
}

#[test]
fn test_corrupt_workout_blob_is_a_read_error() -> Result<()> {
    let (service, kv, _) = create_test_service()?;
    kv.inner.set(store::WORKOUTS_KEY, "{not json")?;
    let result = service.store.load_workouts();
    assert!(matches!(result, Err(StoreError::Corrupt { key, .. }) if key == store::WORKOUTS_KEY));

    // Appending must not overwrite the unreadable data
    let record = stored_record("x", base_time(), "Bench", Vec::new());
    assert!(service.store.append_workout(&record).is_err());
    assert_eq!(kv.inner.get(store::WORKOUTS_KEY)?.as_deref(), Some("{not json"));
    Ok(())
}

#[test]
fn test_stored_json_shape() -> Result<()> {
    let (service, kv, _) = create_test_service()?;
    let mut session = service.start_session("Push", exercises(&["Bench"]))?;
    session.log_set("60", "10")?;
    session.finish_workout()?;

    let raw: serde_json::Value =
        serde_json::from_str(&kv.inner.get(store::WORKOUTS_KEY)?.unwrap_or_default())?;
    let first = &raw[0];
    assert_eq!(first["splitDay"], "Push");
    assert_eq!(first["totalExercises"], 1);
    assert_eq!(first["totalSets"], 1);
    assert_eq!(first["exercises"][0]["sets"][0]["weight"], "60");
    assert_eq!(first["exercises"][0]["sets"][0]["reps"], "10");
    assert!(first["startTime"].is_string());
    Ok(())
}

#[test]
fn test_split_setup_and_clear_all() -> Result<()> {
    let (service, _, _) = create_test_service()?;

    // Nothing configured yet
    assert_eq!(service.get_split()?, None);
    let err = service.exercises_for_day("Push").unwrap_err();
    assert_eq!(err.downcast_ref::<SetupError>(), Some(&SetupError::NoSplitConfigured));

    let split = service.choose_preset("push/pull/legs")?;
    assert_eq!(split.split_type, "Push/Pull/Legs");
    assert_eq!(service.get_split()?, Some(split));
    assert_eq!(service.exercises_for_day("Push")?.len(), 12);
    assert!(service.exercises_for_day("Legs")?.is_empty());
    let err = service.exercises_for_day("Arms").unwrap_err();
    assert_eq!(
        err.downcast_ref::<SetupError>(),
        Some(&SetupError::UnknownSplitDay("Arms".to_string()))
    );

    // Replaced wholesale
    let mut builder = CustomSplitBuilder::new();
    assert!(builder.add_day("Arms"));
    assert!(!builder.add_day("Arms"));
    assert!(!builder.add_day("   "));
    assert!(builder.add_day("Legs"));
    assert!(builder.add_day("Core"));
    builder.remove_day("Legs");
    assert_eq!(builder.days(), ["Arms", "Core"]);
    let custom = builder.build()?;
    service.set_split(&custom)?;
    assert_eq!(
        service.get_split()?,
        Some(WorkoutSplit {
            split_type: "Custom".to_string(),
            days: vec!["Arms".to_string(), "Core".to_string()],
        })
    );

    let mut session = service.start_session("Arms", exercises(&["Curls"]))?;
    session.log_set("20", "12")?;
    session.finish_workout()?;
    assert_eq!(service.list_workouts()?.len(), 1);

    service.clear_all_data()?;
    assert!(service.list_workouts()?.is_empty());
    assert_eq!(service.get_split()?, None);
    Ok(())
}

#[test]
fn test_clear_all_failure_keeps_data() -> Result<()> {
    let (service, kv, _) = create_test_service()?;
    service.choose_preset("Upper/Lower")?;
    kv.fail_writes.set(true);
    assert!(service.clear_all_data().is_err());
    kv.fail_writes.set(false);
    assert!(service.get_split()?.is_some());
    Ok(())
}

#[test]
fn test_empty_custom_split_rejected() {
    assert_eq!(CustomSplitBuilder::new().build(), Err(SetupError::EmptySplit));
    assert!(catalog::find_preset("Nope").is_err());
    assert_eq!(catalog::custom_exercise("  "), Err(SetupError::BlankExerciseName));
    let custom = catalog::custom_exercise(" Farmer Walk ").unwrap();
    assert_eq!(custom.name, "Farmer Walk");
    assert_eq!(custom.category, ExerciseCategory::Custom);
}

#[test]
fn test_exercise_selection_toggles_by_name() {
    let mut selection = catalog::ExerciseSelection::new();
    let picks = catalog::default_exercises("Chest");
    assert!(selection.toggle(picks[0].clone()));
    assert!(selection.toggle(picks[2].clone()));
    assert!(!selection.toggle(picks[0].clone()));
    assert!(selection.is_selected(&picks[2].name));
    assert_eq!(selection.len(), 1);
}

#[test]
fn test_config_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.toml");

    // Missing file gets written with defaults
    let config = liftlog_lib::load_config_util(&path)?;
    assert_eq!(config, Config::default());
    assert!(path.exists());

    let updated = Config {
        default_unit: WeightUnit::Lb,
        weekly_workout_goal: 3,
        ..Config::default()
    };
    liftlog_lib::save_config_util(&path, &updated)?;
    assert_eq!(liftlog_lib::load_config_util(&path)?, updated);

    std::fs::write(&path, "weekly_workout_goal = 0\n")?;
    let result = liftlog_lib::load_config_util(&path);
    assert!(matches!(result, Err(liftlog_lib::ConfigError::InvalidWeeklyGoal(0))));
    Ok(())
}

#[test]
fn test_default_unit_applies_to_new_sessions() -> Result<()> {
    let (mut service, _, _) = create_test_service()?;
    service.config.default_unit = WeightUnit::Lb;
    let session = service.start_session("Push", exercises(&["Bench"]))?;
    assert_eq!(session.weight_unit(), WeightUnit::Lb);
    Ok(())
}
