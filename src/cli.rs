// src/cli.rs
use clap::{Command, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use liftlog_lib::WeightUnit;

#[derive(Parser, Debug)]
#[command(author, version, about = "Track split-based strength workouts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitCli {
    Kg,
    Lb,
}

impl From<UnitCli> for WeightUnit {
    fn from(value: UnitCli) -> Self {
        match value {
            UnitCli::Kg => WeightUnit::Kg,
            UnitCli::Lb => WeightUnit::Lb,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the ready-made training splits
    Splits,
    /// Show or change the active training split
    Split {
        #[command(subcommand)]
        action: SplitAction,
    },
    /// List suggested exercises for a day of the active split
    Exercises {
        /// Split day (e.g., "Push")
        day: String,
    },
    /// Start an interactive workout session
    Start {
        /// Split day to train (e.g., "Push")
        day: String,
        /// Exercise to include, in order. Repeat for several. Prompts if omitted.
        #[arg(short, long = "exercise")]
        exercises: Vec<String>,
        /// Unit to enter and show weights in (defaults to config)
        #[arg(short, long, value_enum)]
        unit: Option<UnitCli>,
    },
    /// List recent workouts, newest first
    History {
        /// Show only the last N workouts (defaults to config)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Write the list as CSV to stdout instead of a table
        #[arg(long)]
        export_csv: bool,
    },
    /// Show one workout with per-exercise stats
    Show {
        /// Workout ID as shown by 'history'
        id: String,
    },
    /// Show this week's totals and minutes per day
    Stats,
    /// Delete all workouts and the split
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Set the unit new sessions start in
    SetUnit {
        #[arg(value_enum)]
        unit: UnitCli,
    },
    /// Set how many workouts per week count as 100% of the goal
    SetWeeklyGoal { goal: u32 },
    /// Show the path to the database file
    DbPath,
    /// Show the path to the config file
    ConfigPath,
    /// Generate shell completion script
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum SplitAction {
    /// Use a preset split, or define custom days
    Set {
        /// Preset name (see 'splits')
        #[arg(required_unless_present = "custom")]
        preset: Option<String>,
        /// Custom split days, in order
        #[arg(long, num_args = 1.., conflicts_with = "preset")]
        custom: Vec<String>,
    },
    /// Show the active split
    Show,
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> Command {
    Cli::command()
}
