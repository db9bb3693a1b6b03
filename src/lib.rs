use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

// --- Declare modules ---
pub mod compare;
mod config;
pub mod dialogs;
pub mod history_view;
pub mod journal;
pub mod models;
pub mod repository;
pub mod session;
pub mod store;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Backend, Config, ConfigError, StandardColor, StoreConfig,
    ThemeConfig, CONFIG_ENV_VAR,
};
pub use history_view::{Catalog, HistoryFilter, HistoryGroup, SheetSummary};
pub use journal::Documented;
pub use models::{
    BodyPart, Category, CategoryUpdate, DiaryEntry, Exercise, ExerciseUpdate, HistoryEntry,
    HistoryUpdate, NewCategory, NewExercise, NewWorkoutSheet, Parameters, SheetExercise,
    SheetUpdate, WorkoutSheet,
};
pub use repository::Error as RepositoryError;
pub use session::{
    format_clock, SessionDriver, SessionError, SessionEvent, SessionSnapshot, SessionStatus,
    SetToggle,
};
pub use store::{AnyStore, MemoryStore, RestStore, SqliteStore, TreeStore};

use repository::{category, diary, exercise, history, sheet};

/// One exercise with everything recorded against it, newest first.
#[derive(Debug, Clone)]
pub struct ExerciseDetail {
    pub exercise: Exercise,
    pub category_name: String,
    pub history: Vec<HistoryEntry>,
    pub diary: Vec<DiaryEntry>,
}

/// Opens the backend named in the config.
/// # Errors
/// Returns `anyhow::Error` if the sqlite file cannot be opened or the rest
/// backend has no URL.
pub fn open_store(config: &Config, config_path: &Path) -> Result<AnyStore> {
    let store = &config.store;
    Ok(match store.backend {
        Backend::Memory => AnyStore::Memory(MemoryStore::new()),
        Backend::Sqlite => {
            let path = store
                .sqlite_path()
                .context("Failed to determine sqlite store path")?;
            let sqlite = SqliteStore::open(&path)
                .with_context(|| format!("Failed to open sqlite store at {path:?}"))?;
            AnyStore::Sqlite(sqlite)
        }
        Backend::Rest => {
            let url = store
                .rest_url
                .clone()
                .ok_or_else(|| ConfigError::MissingRestUrl(config_path.to_path_buf()))?;
            AnyStore::Rest(RestStore::new(url, store.auth_token.clone()))
        }
    })
}

// Identifiers that cannot form a key path are names, never ids.
fn by_id<T>(lookup: Result<Option<T>, RepositoryError>) -> Result<Option<T>> {
    match lookup {
        Ok(found) => Ok(found),
        Err(RepositoryError::Store(store::Error::InvalidPath { .. })) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct AppService<S: TreeStore = AnyStore> {
    pub config: Config,
    pub config_path: PathBuf,
    store: S,
    session: SessionDriver,
    session_events: Option<UnboundedReceiver<SessionEvent>>,
}

impl AppService<AnyStore> {
    /// Initializes the application service from the config file.
    /// # Errors
    /// Returns `anyhow::Error` if config path determination, loading, or
    /// opening the store fails.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;
        let store = open_store(&config, &config_path)?;
        info!(%store, "store ready");
        Ok(Self::with_store(store, config, config_path))
    }

    pub fn store_description(&self) -> String {
        self.store.to_string()
    }
}

impl<S: TreeStore> AppService<S> {
    pub fn with_store(store: S, config: Config, config_path: PathBuf) -> Self {
        let (session, events) = SessionDriver::new(config.rest_duration_secs);
        Self {
            config,
            config_path,
            store,
            session,
            session_events: Some(events),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the default rest countdown and applies it to the session.
    /// # Errors
    /// - `ConfigError::InvalidRestDuration` if `secs` is 0.
    /// - `ConfigError` variants if saving fails.
    pub fn set_rest_duration(&mut self, secs: u32) -> Result<(), ConfigError> {
        if secs == 0 {
            return Err(ConfigError::InvalidRestDuration(secs));
        }
        self.config.rest_duration_secs = secs;
        self.session.set_rest_duration(secs);
        self.save_config()
    }

    // --- Categories ---

    pub async fn create_category(&self, name: &str, description: &str) -> Result<Category> {
        category::create(
            &self.store,
            NewCategory {
                name: name.to_string(),
                description: description.to_string(),
            },
        )
        .await
        .with_context(|| format!("Failed to create category '{}'", name.trim()))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        category::list(&self.store)
            .await
            .context("Failed to list categories")
    }

    /// Finds a category by id, then by case-insensitive name.
    pub async fn resolve_category(&self, identifier: &str) -> Result<Category> {
        if let Some(found) = by_id(category::get(&self.store, identifier).await)? {
            return Ok(found);
        }
        let wanted = identifier.trim();
        self.list_categories()
            .await?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RepositoryError::CategoryNotFound(wanted.to_string()).into())
    }

    pub async fn update_category(&self, id: &str, changes: CategoryUpdate) -> Result<()> {
        category::update(&self.store, id, changes)
            .await
            .with_context(|| format!("Failed to update category {id}"))
    }

    /// Deletes a category with its exercises and their history and diary.
    /// Returns how many exercises were removed.
    pub async fn delete_category(&self, id: &str) -> Result<usize> {
        journal::delete_category(&self.store, id)
            .await
            .with_context(|| format!("Failed to delete category {id}"))
    }

    pub async fn search_categories(&self, text: &str) -> Result<Vec<Category>> {
        let categories = self.list_categories().await?;
        Ok(history_view::search_categories(&categories, text)
            .into_iter()
            .cloned()
            .collect())
    }

    // --- Exercises ---

    pub async fn create_exercise(&self, new: NewExercise) -> Result<Exercise> {
        let name = new.name.trim().to_string();
        journal::create_exercise(&self.store, new)
            .await
            .with_context(|| format!("Failed to create exercise '{name}'"))
    }

    pub async fn list_exercises(&self, category_id: Option<&str>) -> Result<Vec<Exercise>> {
        let exercises = match category_id {
            Some(id) => exercise::list_by_category(&self.store, id).await,
            None => exercise::list(&self.store).await,
        };
        exercises.context("Failed to list exercises")
    }

    /// Finds an exercise by id, then by case-insensitive name.
    pub async fn resolve_exercise(&self, identifier: &str) -> Result<Exercise> {
        if let Some(found) = by_id(exercise::get(&self.store, identifier).await)? {
            return Ok(found);
        }
        let wanted = identifier.trim();
        self.list_exercises(None)
            .await?
            .into_iter()
            .find(|e| e.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RepositoryError::ExerciseNotFound(wanted.to_string()).into())
    }

    pub async fn update_exercise(&self, id: &str, changes: ExerciseUpdate) -> Result<()> {
        journal::update_exercise(&self.store, id, changes)
            .await
            .with_context(|| format!("Failed to update exercise {id}"))
    }

    /// Deletes an exercise, its history and its diary.
    pub async fn delete_exercise(&self, id: &str) -> Result<()> {
        journal::delete_exercise(&self.store, id)
            .await
            .with_context(|| format!("Failed to delete exercise {id}"))
    }

    pub async fn search_exercises(&self, text: &str) -> Result<Vec<Exercise>> {
        let catalog = self.catalog().await?;
        let exercises = self.list_exercises(None).await?;
        Ok(history_view::search_exercises(&exercises, &catalog, text)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn exercise_detail(&self, id: &str) -> Result<ExerciseDetail> {
        let exercise = exercise::get(&self.store, id)
            .await?
            .ok_or_else(|| RepositoryError::ExerciseNotFound(id.to_string()))?;
        let category_name = match category::get(&self.store, &exercise.category_id).await? {
            Some(category) => category.name,
            None => history_view::UNCATEGORIZED.to_string(),
        };
        let history = history::list_for_exercise(&self.store, id)
            .await
            .context("Failed to load exercise history")?;
        let diary = diary::list_for_exercise(&self.store, id)
            .await
            .context("Failed to load exercise diary")?;
        Ok(ExerciseDetail {
            exercise,
            category_name,
            history,
            diary,
        })
    }

    /// Categories and exercises loaded for name lookups.
    pub async fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::new(
            self.list_categories().await?,
            self.list_exercises(None).await?,
        ))
    }

    // --- History ---

    /// Records a reading against the exercise's latest one. A comment is
    /// mirrored into the diary.
    pub async fn add_documentation(
        &self,
        exercise_id: &str,
        parameters: Parameters,
        comment: Option<&str>,
    ) -> Result<Documented> {
        journal::add_documentation(&self.store, exercise_id, parameters, comment)
            .await
            .with_context(|| format!("Failed to document exercise {exercise_id}"))
    }

    /// Filtered history, newest first, grouped by date when the config says
    /// so.
    pub async fn list_history(&self, filter: &HistoryFilter, group: bool) -> Result<Vec<HistoryGroup>> {
        let catalog = self.catalog().await?;
        let entries = match &filter.exercise_id {
            Some(id) => history::list_for_exercise(&self.store, id).await,
            None => history::list_all(&self.store).await,
        }
        .context("Failed to load history")?;
        let kept = filter.apply(entries, &catalog);
        Ok(history_view::group_by_date(
            kept,
            &self.config.date_format,
            group && self.config.group_history_by_date,
        ))
    }

    pub async fn update_history_entry(&self, exercise_id: &str, entry_id: &str, changes: HistoryUpdate) -> Result<()> {
        history::update(&self.store, exercise_id, entry_id, changes)
            .await
            .with_context(|| format!("Failed to update history entry {entry_id}"))
    }

    pub async fn delete_history_entry(&self, exercise_id: &str, entry_id: &str) -> Result<()> {
        history::delete(&self.store, exercise_id, entry_id)
            .await
            .with_context(|| format!("Failed to delete history entry {entry_id}"))
    }

    pub async fn chart_series(&self, exercise_id: &str, parameter: &str) -> Result<Vec<(models::Timestamp, f64)>> {
        let entries = history::list_for_exercise(&self.store, exercise_id)
            .await
            .context("Failed to load history")?;
        Ok(history_view::chart_series(&entries, parameter))
    }

    // --- Diary ---

    pub async fn add_diary_entry(&self, exercise_id: &str, comment: &str) -> Result<DiaryEntry> {
        if exercise::get(&self.store, exercise_id).await?.is_none() {
            bail!(RepositoryError::ExerciseNotFound(exercise_id.to_string()));
        }
        diary::add(&self.store, exercise_id, comment, models::now_ms())
            .await
            .context("Failed to add diary entry")
    }

    pub async fn list_diary(&self, exercise_id: &str) -> Result<Vec<DiaryEntry>> {
        diary::list_for_exercise(&self.store, exercise_id)
            .await
            .context("Failed to list diary")
    }

    pub async fn update_diary_entry(&self, exercise_id: &str, entry_id: &str, comment: &str) -> Result<()> {
        diary::update(&self.store, exercise_id, entry_id, comment)
            .await
            .with_context(|| format!("Failed to update diary entry {entry_id}"))
    }

    pub async fn delete_diary_entry(&self, exercise_id: &str, entry_id: &str) -> Result<()> {
        diary::delete(&self.store, exercise_id, entry_id)
            .await
            .with_context(|| format!("Failed to delete diary entry {entry_id}"))
    }

    // --- Workout sheets ---

    pub async fn create_sheet(&self, new: NewWorkoutSheet) -> Result<WorkoutSheet> {
        let name = new.name.trim().to_string();
        sheet::create(&self.store, new)
            .await
            .with_context(|| format!("Failed to create sheet '{name}'"))
    }

    pub async fn list_sheets(&self) -> Result<Vec<WorkoutSheet>> {
        sheet::list(&self.store)
            .await
            .context("Failed to list workout sheets")
    }

    /// Finds a sheet by id, then by case-insensitive name.
    pub async fn resolve_sheet(&self, identifier: &str) -> Result<WorkoutSheet> {
        if let Some(found) = by_id(sheet::get(&self.store, identifier).await)? {
            return Ok(found);
        }
        let wanted = identifier.trim();
        self.list_sheets()
            .await?
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RepositoryError::SheetNotFound(wanted.to_string()).into())
    }

    pub async fn update_sheet(&self, id: &str, changes: SheetUpdate) -> Result<()> {
        sheet::update(&self.store, id, changes)
            .await
            .with_context(|| format!("Failed to update sheet {id}"))
    }

    /// Appends an exercise to a sheet after checking the exercise exists.
    pub async fn add_sheet_exercise(&self, sheet_id: &str, item: SheetExercise) -> Result<WorkoutSheet> {
        if exercise::get(&self.store, &item.exercise_id).await?.is_none() {
            bail!(RepositoryError::ExerciseNotFound(item.exercise_id));
        }
        let mut current = self.resolve_sheet(sheet_id).await?;
        current.exercises.push(item);
        self.update_sheet(
            &current.id,
            SheetUpdate {
                exercises: Some(current.exercises.clone()),
                ..Default::default()
            },
        )
        .await?;
        Ok(current)
    }

    /// Removes the exercise at `index` (0-based) from a sheet.
    pub async fn remove_sheet_exercise(&self, sheet_id: &str, index: usize) -> Result<SheetExercise> {
        let mut current = self.resolve_sheet(sheet_id).await?;
        if index >= current.exercises.len() {
            bail!(
                "Sheet '{}' has {} exercises; position {} does not exist",
                current.name,
                current.exercises.len(),
                index + 1
            );
        }
        let removed = current.exercises.remove(index);
        self.update_sheet(
            &current.id,
            SheetUpdate {
                exercises: Some(current.exercises),
                ..Default::default()
            },
        )
        .await?;
        Ok(removed)
    }

    /// Deletes a sheet. A workout running from it is discarded.
    pub async fn delete_sheet(&mut self, id: &str) -> Result<()> {
        sheet::delete(&self.store, id)
            .await
            .with_context(|| format!("Failed to delete sheet {id}"))?;
        if self.session.discard_if_sheet(id) {
            info!(sheet_id = %id, "discarded running workout");
        }
        Ok(())
    }

    // --- Workout session ---

    /// Starts a workout from a stored sheet.
    pub async fn start_workout(&mut self, sheet_id: &str) -> Result<SessionSnapshot> {
        let sheet = self.resolve_sheet(sheet_id).await?;
        Ok(self.session.start(sheet)?)
    }

    pub fn session(&mut self) -> &mut SessionDriver {
        &mut self.session
    }

    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn is_set_completed(&self, exercise_id: &str, set_index: u32) -> bool {
        self.session.is_set_completed(exercise_id, set_index)
    }

    /// Hands out the receiving end of session events. Only the first call
    /// gets it.
    pub fn take_session_events(&mut self) -> Option<UnboundedReceiver<SessionEvent>> {
        self.session_events.take()
    }
}
