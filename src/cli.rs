// src/cli.rs
use chrono::{Duration, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use workout_journal_lib::BodyPart;

#[derive(Parser, Debug)]
#[command(author, version, about = "Track exercises, readings and workout sheets", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Print listings as CSV instead of tables
    #[arg(long, global = true)]
    pub export_csv: bool,
}

/// Dates are local calendar days.
pub fn parse_date_shorthand(s: &str) -> Result<NaiveDate, String> {
    let today = Local::now().date_naive();
    match s.to_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        _ => ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .ok_or_else(|| {
                format!(
                    "Invalid date format: '{s}'. Use 'today', 'yesterday', YYYY-MM-DD, DD.MM.YYYY, DD/MM/YYYY or YYYY/MM/DD."
                )
            }),
    }
}

/// `name=value` pairs for parameter readings.
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected name=value, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Missing parameter name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyPartCli {
    Arms,
    Shoulders,
    Back,
    Chest,
    Abs,
    Glutes,
    Legs,
    Cardio,
}

impl From<BodyPartCli> for BodyPart {
    fn from(value: BodyPartCli) -> Self {
        match value {
            BodyPartCli::Arms => Self::Arms,
            BodyPartCli::Shoulders => Self::Shoulders,
            BodyPartCli::Back => Self::Back,
            BodyPartCli::Chest => Self::Chest,
            BodyPartCli::Abs => Self::Abs,
            BodyPartCli::Glutes => Self::Glutes,
            BodyPartCli::Legs => Self::Legs,
            BodyPartCli::Cardio => Self::Cardio,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage exercise categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Manage exercises
    Exercise {
        #[command(subcommand)]
        action: ExerciseCommand,
    },
    /// Record a reading for an exercise; a comment also goes to its diary
    Document {
        /// Exercise name or id
        exercise: String,
        /// Parameter reading, repeatable (e.g. -p weight=80 -p reps=8)
        #[arg(short = 'p', long = "param", value_parser = parse_param, required = true)]
        params: Vec<(String, String)>,
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Browse and edit recorded readings
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Free-text notes per exercise
    Diary {
        #[command(subcommand)]
        action: DiaryCommand,
    },
    /// Manage workout sheets
    Sheet {
        #[command(subcommand)]
        action: SheetCommand,
    },
    /// Run a workout from a sheet interactively
    Workout {
        /// Sheet name or id
        sheet: String,
    },
    /// Set the rest countdown started after each completed set
    SetRest {
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        secs: u32,
    },
    /// Show the path to the config file
    ConfigPath,
    /// Show which store backend is in use
    StoreInfo,
    /// Generate shell completion scripts
    Completion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    List {
        /// Match name or description
        #[arg(short, long)]
        search: Option<String>,
    },
    Edit {
        /// Category name or id
        identifier: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a category with all of its exercises, history and diary
    Delete {
        identifier: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExerciseCommand {
    Add {
        name: String,
        /// Category name or id
        #[arg(short, long)]
        category: String,
        #[arg(short, long, value_enum)]
        body_part: BodyPartCli,
        /// Comma-separated parameter names (e.g. "weight,reps")
        #[arg(short, long, value_delimiter = ',')]
        params: Vec<String>,
    },
    List {
        /// Category name or id
        #[arg(short, long)]
        category: Option<String>,
        /// Match name, body part or category
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show an exercise with its history and diary
    Show { identifier: String },
    Edit {
        identifier: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long, value_enum)]
        body_part: Option<BodyPartCli>,
        /// Replaces the parameter names
        #[arg(short, long, value_delimiter = ',')]
        params: Option<Vec<String>>,
    },
    /// Delete an exercise with its history and diary
    Delete {
        identifier: String,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    List {
        /// Match exercise name, category name or comment
        #[arg(short, long)]
        search: Option<String>,
        /// Exercise name or id
        #[arg(short, long)]
        exercise: Option<String>,
        /// Only entries on this day
        #[arg(short, long, value_parser = parse_date_shorthand)]
        date: Option<NaiveDate>,
        /// One flat list instead of groups per day
        #[arg(long)]
        no_group: bool,
    },
    Edit {
        exercise: String,
        entry_id: String,
        /// Replaces the whole reading
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        #[arg(short, long, conflicts_with = "clear_comment")]
        comment: Option<String>,
        #[arg(long)]
        clear_comment: bool,
    },
    Delete {
        exercise: String,
        entry_id: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Values of one parameter over time
    Chart { exercise: String, parameter: String },
}

#[derive(Subcommand, Debug)]
pub enum DiaryCommand {
    Add { exercise: String, comment: String },
    List { exercise: String },
    Edit {
        exercise: String,
        entry_id: String,
        comment: String,
    },
    Delete {
        exercise: String,
        entry_id: String,
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SheetCommand {
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Estimated duration in minutes
        #[arg(long)]
        duration: Option<u32>,
    },
    List,
    Show { identifier: String },
    Edit {
        identifier: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_duration")]
        duration: Option<u32>,
        #[arg(long)]
        clear_duration: bool,
    },
    Delete {
        identifier: String,
        #[arg(short, long)]
        yes: bool,
    },
    AddExercise {
        sheet: String,
        exercise: String,
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        sets: Option<u32>,
        #[arg(short, long, default_value = "")]
        reps: String,
        #[arg(short, long)]
        weight: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    RemoveExercise {
        sheet: String,
        /// 1-based position as shown by `sheet show`
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
