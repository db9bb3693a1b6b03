//src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdin, stdout, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use workout_journal_lib::compare::compare_readings;
use workout_journal_lib::dialogs::{is_yes, Dialog, RunnerPrompt};
use workout_journal_lib::history_view::{format_timestamp, sheet_summary, Catalog};
use workout_journal_lib::{
    format_clock, AppService, Category, CategoryUpdate, DiaryEntry, Exercise, ExerciseUpdate,
    HistoryEntry, HistoryFilter, HistoryGroup, HistoryUpdate, NewExercise, NewWorkoutSheet,
    Parameters, SessionEvent, SessionSnapshot, SessionStatus, SetToggle, SheetExercise,
    SheetUpdate, WorkoutSheet,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::Completion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;
    let header_color = service.config.header_color();

    match cli_args.command {
        cli::Commands::Completion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Category { action } => {
            handle_category(&service, action, export_csv, header_color).await?;
        }
        cli::Commands::Exercise { action } => {
            handle_exercise(&service, action, export_csv, header_color).await?;
        }
        cli::Commands::Document {
            exercise,
            params,
            comment,
        } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            for (name, _) in &params {
                if !exercise.parameters.contains_key(name) {
                    eprintln!(
                        "Warning: '{name}' is not a parameter of '{}' (known: {})",
                        exercise.name,
                        exercise.parameter_names().collect::<Vec<_>>().join(", ")
                    );
                }
            }
            let parameters: Parameters = params.into_iter().collect();
            match service
                .add_documentation(&exercise.id, parameters, comment.as_deref())
                .await
            {
                Ok(doc) => {
                    println!(
                        "Documented '{}' (entry {}): {}",
                        exercise.name,
                        doc.history.id,
                        format_reading(&doc.history)
                    );
                    if doc.diary.is_some() {
                        println!("Comment added to the diary.");
                    }
                }
                Err(e) => bail!("Error documenting exercise: {e:#}"),
            }
        }
        cli::Commands::History { action } => {
            handle_history(&service, action, export_csv, header_color).await?;
        }
        cli::Commands::Diary { action } => {
            handle_diary(&service, action, export_csv, header_color).await?;
        }
        cli::Commands::Sheet { action } => {
            handle_sheet(&mut service, action, export_csv, header_color).await?;
        }
        cli::Commands::Workout { sheet } => {
            run_workout(&mut service, &sheet).await?;
        }
        cli::Commands::SetRest { secs } => match service.set_rest_duration(secs) {
            Ok(()) => println!(
                "Rest duration set to {secs}s. Config saved to {:?}",
                service.get_config_path()
            ),
            Err(e) => bail!("Error setting rest duration: {e}"),
        },
        cli::Commands::ConfigPath => {
            println!("{}", service.get_config_path().display());
        }
        cli::Commands::StoreInfo => {
            println!("{}", service.store_description());
        }
    }

    Ok(())
}

/// Asks before deleting unless `yes` was passed. Returns the target when the
/// deletion should go ahead.
fn confirm_delete<T>(target: T, label: &str, yes: bool) -> Result<Option<T>> {
    let mut dialog = Dialog::ConfirmingDelete(target);
    if yes {
        return Ok(dialog.answer_delete("y"));
    }
    print!("Delete {label}? [y/N] ");
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    Ok(dialog.answer_delete(&input))
}

async fn handle_category(
    service: &AppService,
    action: cli::CategoryCommand,
    export_csv: bool,
    header_color: Color,
) -> Result<()> {
    match action {
        cli::CategoryCommand::Add { name, description } => {
            let category = service.create_category(&name, &description).await?;
            println!("Created category '{}' (ID: {})", category.name, category.id);
        }
        cli::CategoryCommand::List { search } => {
            let categories = match search {
                Some(text) => service.search_categories(&text).await?,
                None => service.list_categories().await?,
            };
            if categories.is_empty() {
                println!("No categories found.");
            } else if export_csv {
                print_category_csv(&categories)?;
            } else {
                print_category_table(&categories, header_color);
            }
        }
        cli::CategoryCommand::Edit {
            identifier,
            name,
            description,
        } => {
            let category = service.resolve_category(&identifier).await?;
            service
                .update_category(&category.id, CategoryUpdate { name, description })
                .await?;
            println!("Updated category '{}'.", category.name);
        }
        cli::CategoryCommand::Delete { identifier, yes } => {
            let category = service.resolve_category(&identifier).await?;
            let exercises = service.list_exercises(Some(&category.id)).await?;
            let label = format!(
                "category '{}' and its {} exercise(s) with all their history and diary",
                category.name,
                exercises.len()
            );
            if let Some(category) = confirm_delete(category, &label, yes)? {
                let removed = service.delete_category(&category.id).await?;
                println!("Deleted category '{}' and {removed} exercise(s).", category.name);
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

async fn handle_exercise(
    service: &AppService,
    action: cli::ExerciseCommand,
    export_csv: bool,
    header_color: Color,
) -> Result<()> {
    match action {
        cli::ExerciseCommand::Add {
            name,
            category,
            body_part,
            params,
        } => {
            let category = service.resolve_category(&category).await?;
            let exercise = service
                .create_exercise(NewExercise {
                    name,
                    category_id: category.id,
                    body_part: body_part.into(),
                    parameter_names: params,
                })
                .await?;
            println!(
                "Created exercise '{}' in '{}' (ID: {})",
                exercise.name, category.name, exercise.id
            );
        }
        cli::ExerciseCommand::List { category, search } => {
            let category_id = match category {
                Some(identifier) => Some(service.resolve_category(&identifier).await?.id),
                None => None,
            };
            let mut exercises = match &search {
                Some(text) => service.search_exercises(text).await?,
                None => service.list_exercises(category_id.as_deref()).await?,
            };
            if let (Some(_), Some(id)) = (&search, &category_id) {
                exercises.retain(|e| &e.category_id == id);
            }
            let catalog = service.catalog().await?;
            if exercises.is_empty() {
                println!("No exercises found.");
            } else if export_csv {
                print_exercise_csv(&exercises, &catalog)?;
            } else {
                print_exercise_table(&exercises, &catalog, header_color);
            }
        }
        cli::ExerciseCommand::Show { identifier } => {
            let exercise = service.resolve_exercise(&identifier).await?;
            let detail = service.exercise_detail(&exercise.id).await?;
            if export_csv {
                print_history_csv(&detail.history, &service.catalog().await?)?;
                return Ok(());
            }
            println!(
                "{} [{}] in {} | parameters: {}",
                detail.exercise.name,
                detail.exercise.body_part,
                detail.category_name,
                detail.exercise.parameter_names().collect::<Vec<_>>().join(", ")
            );
            if detail.history.is_empty() {
                println!("No history yet.");
            } else {
                let catalog = service.catalog().await?;
                print_history_table(&detail.history, &catalog, header_color);
            }
            if !detail.diary.is_empty() {
                print_diary_table(&detail.diary, header_color);
            }
        }
        cli::ExerciseCommand::Edit {
            identifier,
            name,
            category,
            body_part,
            params,
        } => {
            let exercise = service.resolve_exercise(&identifier).await?;
            let category_id = match category {
                Some(identifier) => Some(service.resolve_category(&identifier).await?.id),
                None => None,
            };
            service
                .update_exercise(
                    &exercise.id,
                    ExerciseUpdate {
                        name,
                        category_id,
                        body_part: body_part.map(Into::into),
                        parameter_names: params,
                    },
                )
                .await?;
            println!("Updated exercise '{}'.", exercise.name);
        }
        cli::ExerciseCommand::Delete { identifier, yes } => {
            let exercise = service.resolve_exercise(&identifier).await?;
            let label = format!("exercise '{}' with its history and diary", exercise.name);
            if let Some(exercise) = confirm_delete(exercise, &label, yes)? {
                service.delete_exercise(&exercise.id).await?;
                println!("Deleted exercise '{}'.", exercise.name);
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

async fn handle_history(
    service: &AppService,
    action: cli::HistoryCommand,
    export_csv: bool,
    header_color: Color,
) -> Result<()> {
    match action {
        cli::HistoryCommand::List {
            search,
            exercise,
            date,
            no_group,
        } => {
            let exercise_id = match exercise {
                Some(identifier) => Some(service.resolve_exercise(&identifier).await?.id),
                None => None,
            };
            let filter = HistoryFilter {
                search,
                exercise_id,
                date,
            };
            let groups = service.list_history(&filter, !no_group).await?;
            let catalog = service.catalog().await?;
            if groups.iter().all(|g| g.entries.is_empty()) {
                println!("No history entries found.");
            } else if export_csv {
                let entries: Vec<HistoryEntry> =
                    groups.into_iter().flat_map(|g| g.entries).collect();
                print_history_csv(&entries, &catalog)?;
            } else {
                print_history_groups(&groups, &catalog, header_color);
            }
        }
        cli::HistoryCommand::Edit {
            exercise,
            entry_id,
            params,
            comment,
            clear_comment,
        } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            let comment = if clear_comment {
                Some(None)
            } else {
                comment.map(Some)
            };
            let parameters = (!params.is_empty()).then(|| params.into_iter().collect());
            service
                .update_history_entry(
                    &exercise.id,
                    &entry_id,
                    HistoryUpdate {
                        parameters,
                        comment,
                    },
                )
                .await?;
            println!("Updated history entry {entry_id} of '{}'.", exercise.name);
        }
        cli::HistoryCommand::Delete {
            exercise,
            entry_id,
            yes,
        } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            let label = format!("history entry {entry_id} of '{}'", exercise.name);
            if let Some(entry_id) = confirm_delete(entry_id, &label, yes)? {
                service.delete_history_entry(&exercise.id, &entry_id).await?;
                println!("Deleted history entry {entry_id}.");
            } else {
                println!("Cancelled.");
            }
        }
        cli::HistoryCommand::Chart {
            exercise,
            parameter,
        } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            let points = service.chart_series(&exercise.id, &parameter).await?;
            if points.is_empty() {
                println!("No '{parameter}' readings for '{}'.", exercise.name);
            } else if export_csv {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.write_record(["Timestamp", parameter.as_str()])?;
                for (ts, value) in points {
                    writer.write_record(&[ts.to_string(), value.to_string()])?;
                }
                writer.flush()?;
            } else {
                print_chart_table(&points, &parameter, header_color);
            }
        }
    }
    Ok(())
}

async fn handle_diary(
    service: &AppService,
    action: cli::DiaryCommand,
    export_csv: bool,
    header_color: Color,
) -> Result<()> {
    match action {
        cli::DiaryCommand::Add { exercise, comment } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            let entry = service.add_diary_entry(&exercise.id, &comment).await?;
            println!("Added diary entry {} to '{}'.", entry.id, exercise.name);
        }
        cli::DiaryCommand::List { exercise } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            let entries = service.list_diary(&exercise.id).await?;
            if entries.is_empty() {
                println!("No diary entries for '{}'.", exercise.name);
            } else if export_csv {
                let mut writer = csv::Writer::from_writer(io::stdout());
                writer.write_record(["ID", "Timestamp", "Comment"])?;
                for entry in entries {
                    writer.write_record(&[entry.id, entry.timestamp.to_string(), entry.comment])?;
                }
                writer.flush()?;
            } else {
                print_diary_table(&entries, header_color);
            }
        }
        cli::DiaryCommand::Edit {
            exercise,
            entry_id,
            comment,
        } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            service
                .update_diary_entry(&exercise.id, &entry_id, &comment)
                .await?;
            println!("Updated diary entry {entry_id}.");
        }
        cli::DiaryCommand::Delete {
            exercise,
            entry_id,
            yes,
        } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            let label = format!("diary entry {entry_id} of '{}'", exercise.name);
            if let Some(entry_id) = confirm_delete(entry_id, &label, yes)? {
                service.delete_diary_entry(&exercise.id, &entry_id).await?;
                println!("Deleted diary entry {entry_id}.");
            } else {
                println!("Cancelled.");
            }
        }
    }
    Ok(())
}

async fn handle_sheet(
    service: &mut AppService,
    action: cli::SheetCommand,
    export_csv: bool,
    header_color: Color,
) -> Result<()> {
    match action {
        cli::SheetCommand::Create {
            name,
            description,
            duration,
        } => {
            let sheet = service
                .create_sheet(NewWorkoutSheet {
                    name,
                    description,
                    estimated_duration: duration,
                    exercises: Vec::new(),
                })
                .await?;
            println!("Created sheet '{}' (ID: {})", sheet.name, sheet.id);
        }
        cli::SheetCommand::List => {
            let sheets = service.list_sheets().await?;
            if sheets.is_empty() {
                println!("No workout sheets found.");
            } else if export_csv {
                print_sheet_csv(&sheets)?;
            } else {
                print_sheet_table(&sheets, header_color);
            }
        }
        cli::SheetCommand::Show { identifier } => {
            let sheet = service.resolve_sheet(&identifier).await?;
            let catalog = service.catalog().await?;
            print_sheet_detail(&sheet, &catalog, header_color);
        }
        cli::SheetCommand::Edit {
            identifier,
            name,
            description,
            duration,
            clear_duration,
        } => {
            let sheet = service.resolve_sheet(&identifier).await?;
            let estimated_duration = if clear_duration {
                Some(None)
            } else {
                duration.map(Some)
            };
            service
                .update_sheet(
                    &sheet.id,
                    SheetUpdate {
                        name,
                        description,
                        estimated_duration,
                        exercises: None,
                    },
                )
                .await?;
            println!("Updated sheet '{}'.", sheet.name);
        }
        cli::SheetCommand::Delete { identifier, yes } => {
            let sheet = service.resolve_sheet(&identifier).await?;
            let label = format!("sheet '{}'", sheet.name);
            if let Some(sheet) = confirm_delete(sheet, &label, yes)? {
                service.delete_sheet(&sheet.id).await?;
                println!("Deleted sheet '{}'.", sheet.name);
            } else {
                println!("Cancelled.");
            }
        }
        cli::SheetCommand::AddExercise {
            sheet,
            exercise,
            sets,
            reps,
            weight,
            notes,
        } => {
            let exercise = service.resolve_exercise(&exercise).await?;
            let sheet = service
                .add_sheet_exercise(
                    &sheet,
                    SheetExercise {
                        exercise_id: exercise.id,
                        sets: sets.unwrap_or(0),
                        reps: reps.trim().to_string(),
                        weight: weight.filter(|w| !w.trim().is_empty()),
                        notes: notes.filter(|n| !n.trim().is_empty()),
                    },
                )
                .await?;
            println!(
                "Added '{}' to '{}' (position {}).",
                exercise.name,
                sheet.name,
                sheet.exercises.len()
            );
        }
        cli::SheetCommand::RemoveExercise { sheet, position } => {
            let index = usize::try_from(position)?.saturating_sub(1);
            let removed = service.remove_sheet_exercise(&sheet, index).await?;
            let name = service
                .resolve_exercise(&removed.exercise_id)
                .await
                .map_or_else(|_| "Unknown exercise".to_string(), |e| e.name);
            println!("Removed '{name}' from position {position}.");
        }
    }
    Ok(())
}

// --- Workout runner ---

enum RunnerStep {
    Continue,
    AskStop,
}

fn print_runner_help() {
    println!("Commands:");
    println!("  done <exercise#> <set#>  toggle a set (e.g. 'done 1 2')");
    println!("  go <exercise#>           focus an exercise");
    println!("  pause                    pause or resume the workout clock");
    println!("  rest [secs]              start the rest countdown");
    println!("  skip                     skip the current rest");
    println!("  status                   show progress (or just press enter)");
    println!("  stop                     end the workout");
}

fn parse_position(arg: Option<&str>, what: &str) -> Result<usize> {
    let raw = arg.with_context(|| format!("Missing {what} number"))?;
    let n: usize = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a valid {what} number"))?;
    if n == 0 {
        bail!("{what} numbers start at 1");
    }
    Ok(n - 1)
}

fn handle_runner_command(service: &mut AppService, sheet: &WorkoutSheet, catalog: &Catalog, line: &str) -> Result<RunnerStep> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or("status").to_lowercase();
    match command.as_str() {
        "help" | "?" => print_runner_help(),
        "status" | "s" => print_runner_status(&service.session_snapshot(), sheet, catalog, service),
        "done" | "d" => {
            let index = parse_position(words.next(), "exercise")?;
            let set = parse_position(words.next(), "set")?;
            let item = sheet
                .exercises
                .get(index)
                .with_context(|| format!("There is no exercise #{}", index + 1))?;
            let set_index = u32::try_from(set)?;
            let name = catalog.exercise_name(&item.exercise_id).to_string();
            match service.session().complete_set(&item.exercise_id, set_index)? {
                SetToggle::Completed => println!("✔ {name} set {}", set + 1),
                SetToggle::Reopened => println!("↺ {name} set {} reopened", set + 1),
            }
            println!("Progress {:.0}%", service.session_snapshot().progress);
        }
        "go" | "g" => {
            let index = parse_position(words.next(), "exercise")?;
            service.session().select_exercise(index)?;
            println!("Now on: {}", catalog.exercise_name(&sheet.exercises[index].exercise_id));
        }
        "pause" | "p" | "resume" => match service.session().toggle_pause()? {
            SessionStatus::Paused => println!("Paused at {}", format_clock(service.session_snapshot().elapsed_secs)),
            _ => println!("Resumed."),
        },
        "rest" | "r" => {
            let secs = match words.next() {
                Some(raw) => raw
                    .parse::<u32>()
                    .with_context(|| format!("'{raw}' is not a number of seconds"))?,
                None => service.config.rest_duration_secs,
            };
            service.session().start_rest(secs);
        }
        "skip" => {
            service.session().skip_rest();
            println!("Rest skipped.");
        }
        "stop" | "quit" | "q" => return Ok(RunnerStep::AskStop),
        other => println!("Unknown command '{other}'. Type 'help' for the list."),
    }
    Ok(RunnerStep::Continue)
}

async fn run_workout(service: &mut AppService, sheet_identifier: &str) -> Result<()> {
    let mut events = service
        .take_session_events()
        .context("Workout events are already being consumed")?;
    let snapshot = service.start_workout(sheet_identifier).await?;
    let sheet = service
        .session()
        .sheet()
        .context("Workout did not start")?;
    let catalog = service.catalog().await?;

    println!(
        "Started '{}' ({} sets). Type 'help' for commands.",
        sheet.name, snapshot.total_sets
    );
    print_runner_status(&snapshot, &sheet, &catalog, service);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut prompt = RunnerPrompt::None;
    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                SessionEvent::RestStarted { secs } => println!("Rest {}", format_clock(u64::from(secs))),
                SessionEvent::RestFinished => println!("\x07Rest finished! Next set."),
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    let _ = service.session().stop(true);
                    println!("Input closed; workout discarded.");
                    break;
                };
                if prompt == RunnerPrompt::ConfirmStop {
                    prompt = RunnerPrompt::None;
                    if is_yes(&line) {
                        let done = service.session_snapshot();
                        service.session().stop(true)?;
                        println!(
                            "Workout finished: {} elapsed, {:.0}% complete ({}/{} sets).",
                            format_clock(done.elapsed_secs),
                            done.progress,
                            done.completed_sets,
                            done.total_sets
                        );
                        break;
                    }
                    println!("Continuing.");
                    continue;
                }
                match handle_runner_command(service, &sheet, &catalog, &line) {
                    Ok(RunnerStep::Continue) => {}
                    Ok(RunnerStep::AskStop) => {
                        prompt = RunnerPrompt::ConfirmStop;
                        if let Some(text) = prompt.text() {
                            println!("{text}");
                        }
                    }
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
        }
    }
    Ok(())
}

fn print_runner_status(snapshot: &SessionSnapshot, sheet: &WorkoutSheet, catalog: &Catalog, service: &AppService) {
    let status = match snapshot.status {
        SessionStatus::Idle => "Idle",
        SessionStatus::Running => "Running",
        SessionStatus::Paused => "Paused",
    };
    let rest = if snapshot.rest_active {
        format!(" | Rest {}", format_clock(u64::from(snapshot.rest_remaining)))
    } else {
        String::new()
    };
    println!(
        "{} [{status}] {:.0}% ({}/{} sets){rest}",
        format_clock(snapshot.elapsed_secs),
        snapshot.progress,
        snapshot.completed_sets,
        snapshot.total_sets
    );
    for (i, item) in sheet.exercises.iter().enumerate() {
        let marker = if i == snapshot.current_exercise_index { '>' } else { ' ' };
        let sets: String = (0..item.effective_sets())
            .map(|s| {
                if service.is_set_completed(&item.exercise_id, s) {
                    '✔'
                } else {
                    '·'
                }
            })
            .collect();
        println!(
            "{marker} {}. {} {}x{}{} [{sets}]",
            i + 1,
            catalog.exercise_name(&item.exercise_id),
            item.effective_sets(),
            item.reps,
            item.weight.as_deref().map_or(String::new(), |w| format!(" @ {w}")),
        );
    }
}

// --- Output ---

fn format_reading(entry: &HistoryEntry) -> String {
    let directions = compare_readings(entry);
    entry
        .parameters
        .iter()
        .map(|(name, value)| {
            let arrow = directions.get(name).map_or("", |d| d.symbol());
            if arrow.is_empty() {
                format!("{name}: {value}")
            } else {
                format!("{name}: {value} {arrow}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_parameters(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn new_table(header: Vec<&str>, header_color: Color) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.into_iter().map(|h| Cell::new(h).fg(header_color)));
    table
}

fn print_category_table(categories: &[Category], header_color: Color) {
    let mut table = new_table(vec!["ID", "Name", "Description"], header_color);
    for category in categories {
        table.add_row(vec![
            Cell::new(&category.id),
            Cell::new(&category.name),
            Cell::new(if category.description.is_empty() { "-" } else { category.description.as_str() }),
        ]);
    }
    println!("{table}");
}

fn print_exercise_table(exercises: &[Exercise], catalog: &Catalog, header_color: Color) {
    let mut table = new_table(vec!["ID", "Name", "Category", "Body Part", "Parameters"], header_color);
    for exercise in exercises {
        table.add_row(vec![
            Cell::new(&exercise.id),
            Cell::new(&exercise.name),
            Cell::new(catalog.category_name(&exercise.category_id)),
            Cell::new(exercise.body_part.to_string()),
            Cell::new(exercise.parameter_names().collect::<Vec<_>>().join(", ")),
        ]);
    }
    println!("{table}");
}

fn print_history_table(entries: &[HistoryEntry], catalog: &Catalog, header_color: Color) {
    let mut table = new_table(vec!["ID", "Time", "Exercise", "Category", "Reading", "Comment"], header_color);
    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.id),
            Cell::new(format_timestamp(entry.timestamp, TIME_FORMAT)),
            Cell::new(catalog.exercise_name(&entry.exercise_id)),
            Cell::new(catalog.category_of_exercise(&entry.exercise_id)),
            Cell::new(format_reading(entry)),
            Cell::new(entry.comment.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_history_groups(groups: &[HistoryGroup], catalog: &Catalog, header_color: Color) {
    for group in groups {
        if !group.label.is_empty() {
            println!("== {} ({} entries) ==", group.label, group.entries.len());
        }
        print_history_table(&group.entries, catalog, header_color);
    }
}

fn print_diary_table(entries: &[DiaryEntry], header_color: Color) {
    let mut table = new_table(vec!["ID", "Time", "Comment"], header_color);
    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.id),
            Cell::new(format_timestamp(entry.timestamp, TIME_FORMAT)),
            Cell::new(&entry.comment),
        ]);
    }
    println!("{table}");
}

fn print_chart_table(points: &[(i64, f64)], parameter: &str, header_color: Color) {
    const BAR_WIDTH: f64 = 30.0;
    let max = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let mut table = new_table(vec!["Time", parameter, ""], header_color);
    for (ts, value) in points {
        let len = if max > 0.0 { (value / max * BAR_WIDTH).round() as usize } else { 0 };
        table.add_row(vec![
            Cell::new(format_timestamp(*ts, TIME_FORMAT)),
            Cell::new(value.to_string()),
            Cell::new("█".repeat(len)),
        ]);
    }
    println!("{table}");
}

fn print_sheet_table(sheets: &[WorkoutSheet], header_color: Color) {
    let mut table = new_table(vec!["ID", "Name", "Exercises", "Total Sets", "Est. (min)", "Description"], header_color);
    for sheet in sheets {
        let summary = sheet_summary(sheet);
        table.add_row(vec![
            Cell::new(&sheet.id),
            Cell::new(&sheet.name),
            Cell::new(summary.exercise_count),
            Cell::new(summary.total_sets),
            Cell::new(sheet.estimated_duration.map_or("-".to_string(), |d| d.to_string())),
            Cell::new(if sheet.description.is_empty() { "-" } else { sheet.description.as_str() }),
        ]);
    }
    println!("{table}");
}

fn print_sheet_detail(sheet: &WorkoutSheet, catalog: &Catalog, header_color: Color) {
    let summary = sheet_summary(sheet);
    println!(
        "{} | {} exercise(s), {} set(s){}",
        sheet.name,
        summary.exercise_count,
        summary.total_sets,
        sheet.estimated_duration.map_or(String::new(), |d| format!(", ~{d} min"))
    );
    if !sheet.description.is_empty() {
        println!("{}", sheet.description);
    }
    let mut table = new_table(vec!["#", "Exercise", "Sets", "Reps", "Weight", "Notes"], header_color);
    for (i, item) in sheet.exercises.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(catalog.exercise_name(&item.exercise_id)),
            Cell::new(item.effective_sets()),
            Cell::new(if item.reps.is_empty() { "-" } else { item.reps.as_str() }),
            Cell::new(item.weight.as_deref().unwrap_or("-")),
            Cell::new(item.notes.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

fn print_category_csv(categories: &[Category]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Name", "Description", "Created_ms", "Updated_ms"])?;
    for category in categories {
        writer.write_record(&[
            category.id.clone(),
            category.name.clone(),
            category.description.clone(),
            category.created_at.to_string(),
            category.updated_at.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_exercise_csv(exercises: &[Exercise], catalog: &Catalog) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Name", "Category", "Body_Part", "Parameters"])?;
    for exercise in exercises {
        writer.write_record(&[
            exercise.id.clone(),
            exercise.name.clone(),
            catalog.category_name(&exercise.category_id).to_string(),
            exercise.body_part.to_string(),
            exercise.parameter_names().collect::<Vec<_>>().join(";"),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_history_csv(entries: &[HistoryEntry], catalog: &Catalog) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "ID",
        "Timestamp_ms",
        "Exercise",
        "Category",
        "Parameters",
        "Previous_Parameters",
        "Comment",
    ])?;
    for entry in entries {
        writer.write_record(&[
            entry.id.clone(),
            entry.timestamp.to_string(),
            catalog.exercise_name(&entry.exercise_id).to_string(),
            catalog.category_of_exercise(&entry.exercise_id).to_string(),
            format_parameters(&entry.parameters),
            format_parameters(&entry.previous_parameters),
            entry.comment.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_sheet_csv(sheets: &[WorkoutSheet]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["ID", "Name", "Exercises", "Total_Sets", "Estimated_min", "Description"])?;
    for sheet in sheets {
        let summary = sheet_summary(sheet);
        writer.write_record(&[
            sheet.id.clone(),
            sheet.name.clone(),
            summary.exercise_count.to_string(),
            summary.total_sets.to_string(),
            sheet.estimated_duration.map_or(String::new(), |d| d.to_string()),
            sheet.description.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
