//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use chrono::Local;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdin, stdout, BufRead, Write};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use liftlog_lib::{
    custom_exercise, format_time, parse_color, stats, Advance, AppService, CustomSplitBuilder,
    Exercise, ExerciseSelection, SessionError, SetField, WeekdaySeries, WeeklyStats, WeightUnit,
    WorkoutRecord, WorkoutSession, WorkoutSet, SPLIT_PRESETS,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args();

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();

        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    // Initialize the application service (loads config, opens the store)
    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color: Color = parse_color(&service.config.theme.header_color)
        .map(Color::from)
        .unwrap_or(Color::Green);

    // --- Execute Commands using AppService ---
    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        // --- Split Commands ---
        cli::Commands::Splits => print_presets_table(header_color),
        cli::Commands::Split { action } => match action {
            cli::SplitAction::Set { preset, custom } => {
                let split = if let Some(name) = preset {
                    service.choose_preset(&name)?
                } else {
                    let mut builder = CustomSplitBuilder::new();
                    for day in &custom {
                        if !builder.add_day(day) {
                            println!("Skipping blank or repeated day '{day}'.");
                        }
                    }
                    let split = builder.build()?;
                    service.set_split(&split)?;
                    split
                };
                println!(
                    "Training split set to '{}': {}",
                    split.split_type,
                    split.days.join(", ")
                );
            }
            cli::SplitAction::Show => match service.get_split()? {
                Some(split) => println!("{}: {}", split.split_type, split.days.join(", ")),
                None => println!("No split configured yet. Use 'split set <preset>' to choose one."),
            },
        },
        cli::Commands::Exercises { day } => {
            let exercises = service.exercises_for_day(&day)?;
            if exercises.is_empty() {
                println!("No suggestions for '{day}'. Add your own with 'start {day} -e <name>'.");
            } else {
                print_exercise_table(&exercises, header_color);
            }
        }

        // --- Session ---
        cli::Commands::Start { day, exercises, unit } => {
            let suggestions = service.exercises_for_day(&day)?;
            let selected = if exercises.is_empty() {
                prompt_exercise_selection(&suggestions, header_color)?
            } else {
                resolve_named_exercises(&exercises, &suggestions)?
            };

            let mut session = match service.start_session(&day, selected) {
                Ok(session) => session,
                Err(SessionError::NoExercisesSelected) => {
                    bail!("Please select at least one exercise to start a workout.")
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(unit) = unit {
                session.set_weight_unit(unit.into());
            }
            run_session(session, header_color)?;
        }

        // --- History ---
        cli::Commands::History { limit, export_csv } => {
            let limit = limit.unwrap_or(service.config.recent_limit);
            let workouts = service.get_recent_workouts(limit)?;
            if export_csv {
                write_workouts_csv(&workouts)?;
            } else if workouts.is_empty() {
                println!("No workouts logged yet.");
            } else {
                print_history_table(&workouts, header_color);
            }
        }
        cli::Commands::Show { id } => match service.get_workout(&id)? {
            Some(workout) => print_workout_details(&workout, header_color),
            None => bail!("Workout not found: ID {id}"),
        },
        cli::Commands::Stats => {
            let now = Local::now();
            let weekly = service.get_weekly_stats(&now)?;
            let series = service.get_weekday_series(&now)?;
            print_stats(&weekly, &series, header_color);
        }
        cli::Commands::Clear { yes } => {
            if !yes && !confirm("This deletes every workout and your split. Type 'yes' to continue: ")? {
                println!("Nothing deleted.");
                return Ok(());
            }
            service.clear_all_data()?;
            println!("All workout data cleared.");
        }

        // --- Config ---
        cli::Commands::SetUnit { unit } => {
            let unit: WeightUnit = unit.into();
            service.set_default_unit(unit)?;
            println!("New sessions will use {unit}.");
        }
        cli::Commands::SetWeeklyGoal { goal } => {
            service.set_weekly_goal(goal)?;
            println!("Weekly goal set to {goal} workouts.");
        }
        cli::Commands::DbPath => println!("Database file is located at: {:?}", service.get_db_path()),
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
        }
    }

    Ok(())
}

// --- Exercise selection ---

fn resolve_named_exercises(names: &[String], suggestions: &[Exercise]) -> Result<Vec<Exercise>> {
    let mut selection = ExerciseSelection::new();
    for name in names {
        let exercise = match suggestions
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
        {
            Some(known) => known.clone(),
            None => custom_exercise(name)?,
        };
        if !selection.toggle(exercise) {
            println!("'{}' was listed twice and has been deselected.", name.trim());
        }
    }
    Ok(selection.into_exercises())
}

fn prompt_exercise_selection(suggestions: &[Exercise], header_color: Color) -> Result<Vec<Exercise>> {
    if !suggestions.is_empty() {
        print_exercise_table(suggestions, header_color);
    }
    print!("Pick exercises (numbers or custom names, comma-separated): ");
    stdout().flush()?;

    let mut input = String::new();
    stdin().read_line(&mut input)?;

    let mut selection = ExerciseSelection::new();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let exercise = match token.parse::<usize>() {
            Ok(n) if (1..=suggestions.len()).contains(&n) => suggestions[n - 1].clone(),
            Ok(n) => {
                println!("No exercise #{n}, ignoring.");
                continue;
            }
            Err(_) => custom_exercise(token)?,
        };
        selection.toggle(exercise);
    }
    Ok(selection.into_exercises())
}

// --- Interactive session ---

const SESSION_HELP: &str = "Commands: set <weight> <reps> | add | edit <n> weight|reps <value> | exercise <name> | next | finish | timer | reset | unit [kg|lb] | prev | status | help | quit";

fn run_session(mut session: WorkoutSession<'_>, header_color: Color) -> Result<()> {
    println!("{SESSION_HELP}");
    print_session_status(&session, header_color);

    let stdin = stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        stdout().flush()?;
        let Some(line) = lines.next() else {
            println!("\nInput closed, workout discarded.");
            session.abandon();
            return Ok(());
        };
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();

        let outcome = match parts.as_slice() {
            [] => continue,
            ["help"] => {
                println!("{SESSION_HELP}");
                Ok(None)
            }
            ["set", weight, reps] => session.log_set(weight, reps).map(|_| None),
            ["add"] => session.add_set().map(|_| None),
            ["exercise", name @ ..] => session.add_exercise(&name.join(" ")).map(|index| {
                println!("Added as exercise {} of the workout.", index + 1);
                None
            }),
            ["edit", n, field, value] => match (n.parse::<usize>(), SetField::from_str(field)) {
                (Ok(n), Ok(field)) if n > 0 => session.update_set(n - 1, field, value).map(|()| None),
                _ => {
                    println!("Usage: edit <set number> weight|reps <value>");
                    Ok(None)
                }
            },
            ["next"] => session.next_exercise().map(|advance| match advance {
                Advance::Next { .. } => None,
                Advance::Finished(record) => Some(record),
            }),
            ["finish"] => session.finish_workout().map(Some),
            ["timer"] => {
                let running = session.toggle_timer();
                println!("Rest timer {}.", if running { "started" } else { "stopped" });
                Ok(None)
            }
            ["reset"] => {
                session.reset_timer();
                Ok(None)
            }
            ["unit"] => {
                println!("Showing weights in {}.", session.toggle_weight_unit());
                Ok(None)
            }
            ["unit", unit] => match WeightUnit::from_str(unit) {
                Ok(unit) => {
                    session.set_weight_unit(unit);
                    Ok(None)
                }
                Err(_) => {
                    println!("Unknown unit '{unit}'. Use kg or lb.");
                    Ok(None)
                }
            },
            ["prev"] => {
                match session.previous_performance() {
                    Ok(Some(sets)) => print_sets_table(&session, &sets, "Last time", header_color),
                    Ok(None) => println!("No previous data for this exercise."),
                    Err(e) => println!("Error loading previous data: {e}"),
                }
                Ok(None)
            }
            ["status"] => Ok(None),
            ["quit"] => {
                // stdin is locked by `lines`, so the confirmation is read from it too.
                print!("Discard this workout? Type 'yes' to quit: ");
                stdout().flush()?;
                let answer = lines.next().transpose()?.unwrap_or_default();
                if answer.trim().eq_ignore_ascii_case("yes") {
                    println!("Workout discarded.");
                    session.abandon();
                    return Ok(());
                }
                Ok(None)
            }
            _ => {
                println!("Unknown command. {SESSION_HELP}");
                continue;
            }
        };

        match outcome {
            Ok(Some(record)) => {
                print_workout_complete(&record, header_color);
                return Ok(());
            }
            Ok(None) => print_session_status(&session, header_color),
            Err(SessionError::Persistence(e)) => {
                eprintln!("Error: Could not save workout data ({e}). Try 'finish' again.");
            }
            Err(e) => println!("{e}"),
        }
    }
}

fn print_session_status(session: &WorkoutSession<'_>, header_color: Color) {
    let Some(exercise) = session.current_exercise() else {
        return;
    };
    let index = session.current_index().unwrap_or(0);
    println!(
        "\nExercise {}/{}: {} [{}]   Rest {}{}",
        index + 1,
        session.exercises().len(),
        exercise.name,
        exercise.category,
        format_time(session.timer_seconds()),
        if session.is_timer_running() { " (running)" } else { "" }
    );
    if !session.pending_sets().is_empty() {
        print_sets_table(session, session.pending_sets(), "Sets", header_color);
    }
}

fn print_sets_table(
    session: &WorkoutSession<'_>,
    sets: &[WorkoutSet],
    title: &str,
    header_color: Color,
) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new(title).fg(header_color),
            Cell::new(format!("Weight ({})", session.weight_unit())).fg(header_color),
            Cell::new("Reps").fg(header_color),
            Cell::new("Rest").fg(header_color),
        ]);
    for (i, set) in sets.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(session.display_weight(set)),
            Cell::new(set.reps.to_string()),
            Cell::new(set.rest_time.map_or("-".to_string(), format_time)),
        ]);
    }
    println!("{table}");
}

fn print_workout_complete(record: &WorkoutRecord, header_color: Color) {
    println!("\nWorkout complete! Saved as ID {}", record.id);
    print_workout_details(record, header_color);
}

// --- Tables ---

fn print_presets_table(header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Split").fg(header_color),
            Cell::new("Days").fg(header_color),
            Cell::new("Frequency").fg(header_color),
        ]);
    for preset in &SPLIT_PRESETS {
        let name = if preset.recommended {
            format!("{} (recommended)", preset.name)
        } else {
            preset.name.to_string()
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(preset.days.join(", ")),
            Cell::new(preset.description),
        ]);
    }
    println!("{table}");
}

fn print_exercise_table(exercises: &[Exercise], header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(header_color),
            Cell::new("Exercise").fg(header_color),
            Cell::new("Category").fg(header_color),
        ]);
    for (i, exercise) in exercises.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&exercise.name),
            Cell::new(exercise.category.to_string()),
        ]);
    }
    println!("{table}");
}

fn print_history_table(workouts: &[WorkoutRecord], header_color: Color) {
    let now = Local::now();
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(header_color),
            Cell::new("When").fg(header_color),
            Cell::new("Day").fg(header_color),
            Cell::new("Duration (min)").fg(header_color),
            Cell::new("Exercises").fg(header_color),
            Cell::new("Sets").fg(header_color),
            Cell::new("Volume (kg)").fg(header_color),
        ]);
    for workout in workouts {
        table.add_row(vec![
            Cell::new(&workout.id),
            Cell::new(stats::time_ago(workout.start_time, &now)),
            Cell::new(&workout.split_day),
            Cell::new(workout.duration_minutes()),
            Cell::new(workout.total_exercises),
            Cell::new(workout.total_sets),
            Cell::new(format!("{:.1}", workout.total_volume)),
        ]);
    }
    println!("{table}");
}

fn print_workout_details(record: &WorkoutRecord, header_color: Color) {
    let summary = stats::workout_summary(record);
    println!(
        "{} | {} | {} min | {} sets | {:.1} kg volume",
        record.split_day,
        record
            .start_time
            .with_timezone(&Local)
            .format("%A, %B %-d, %Y %H:%M"),
        summary.duration_minutes,
        summary.total_sets,
        summary.total_volume
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Exercise").fg(header_color),
            Cell::new("Sets").fg(header_color),
            Cell::new("Max Weight (kg)").fg(header_color),
            Cell::new("Max Reps").fg(header_color),
            Cell::new("Volume (kg)").fg(header_color),
            Cell::new("Logged").fg(header_color),
        ]);
    for (log, (_, ex_stats)) in record.exercises.iter().zip(&summary.exercises) {
        let logged: Vec<String> = log
            .sets
            .iter()
            .map(|s| format!("{}x{}", s.weight, s.reps))
            .collect();
        table.add_row(vec![
            Cell::new(&log.name),
            Cell::new(ex_stats.total_sets),
            Cell::new(ex_stats.max_weight),
            Cell::new(ex_stats.max_reps),
            Cell::new(format!("{:.1}", ex_stats.total_volume)),
            Cell::new(if logged.is_empty() { "-".to_string() } else { logged.join(", ") }),
        ]);
    }
    println!("{table}");
}

fn print_stats(weekly: &WeeklyStats, series: &WeekdaySeries, header_color: Color) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Workouts").fg(header_color),
            Cell::new("Minutes").fg(header_color),
            Cell::new("Exercises").fg(header_color),
            Cell::new("Calories (est.)").fg(header_color),
            Cell::new("Goal").fg(header_color),
        ])
        .add_row(vec![
            Cell::new(weekly.workouts),
            Cell::new(weekly.total_minutes),
            Cell::new(weekly.total_exercises),
            Cell::new(weekly.total_calories),
            Cell::new(format!("{:.0}%", weekly.workout_goal_progress)),
        ]);
    println!("Last 7 days\n{table}");

    let mut chart = Table::new();
    chart
        .load_preset(UTF8_FULL)
        .set_header(series.labels.iter().map(|l| Cell::new(l).fg(header_color)))
        .add_row(series.data.iter().map(|m| Cell::new(m)));
    println!("Minutes per day\n{chart}");
}

fn write_workouts_csv(workouts: &[WorkoutRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(stdout());
    writer.write_record([
        "id",
        "split_day",
        "start_time",
        "end_time",
        "duration_minutes",
        "total_exercises",
        "total_sets",
        "total_volume",
    ])?;
    for w in workouts {
        writer.write_record([
            w.id.clone(),
            w.split_day.clone(),
            w.start_time.to_rfc3339(),
            w.end_time.to_rfc3339(),
            w.duration_minutes().to_string(),
            w.total_exercises.to_string(),
            w.total_sets.to_string(),
            w.total_volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("yes"))
}
