//src/session/mod.rs
//! The running-workout state machine. `WorkoutSession` is plain data driven
//! by explicit ticks; `SessionDriver` owns the one-second clocks that feed
//! it.

use crate::models::{now_ms, Timestamp, WorkoutSheet};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

mod driver;

pub use driver::{SessionDriver, SessionEvent};

pub const DEFAULT_REST_SECS: u32 = 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A workout is already in progress ({0})")]
    AlreadyActive(String),
    #[error("No workout in progress")]
    NoSession,
    #[error("Workout is not running")]
    NotRunning,
    #[error("Workout is not paused")]
    NotPaused,
    #[error("Stopping a workout needs confirmation")]
    ConfirmationRequired,
    #[error("Set {set_index} of exercise {exercise_id} is not part of this workout")]
    UnknownSet { exercise_id: String, set_index: u32 },
    #[error("Exercise position {0} is out of range")]
    UnknownExercise(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
}

/// Result of toggling a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetToggle {
    Completed,
    Reopened,
}

/// Result of one rest tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestTick {
    Counting(u32),
    Finished,
    Inactive,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    sheet: WorkoutSheet,
    start_time: Timestamp,
    completed_sets: BTreeSet<String>,
    current_exercise_index: usize,
    paused: bool,
}

fn set_key(exercise_id: &str, set_index: u32) -> String {
    format!("{exercise_id}_{set_index}")
}

/// What a front end needs to draw the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub sheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub start_time: Option<Timestamp>,
    pub elapsed_secs: u64,
    pub rest_remaining: u32,
    pub rest_active: bool,
    pub rest_duration: u32,
    pub progress: f64,
    pub completed_sets: usize,
    pub total_sets: u32,
    pub current_exercise_index: usize,
}

#[derive(Debug, Clone)]
pub struct WorkoutSession {
    active: Option<ActiveSession>,
    elapsed_secs: u64,
    rest_remaining: u32,
    rest_active: bool,
    rest_duration: u32,
}

impl Default for WorkoutSession {
    fn default() -> Self {
        Self::new(DEFAULT_REST_SECS)
    }
}

impl WorkoutSession {
    pub fn new(rest_duration: u32) -> Self {
        Self {
            active: None,
            elapsed_secs: 0,
            rest_remaining: 0,
            rest_active: false,
            rest_duration,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match &self.active {
            None => SessionStatus::Idle,
            Some(a) if a.paused => SessionStatus::Paused,
            Some(_) => SessionStatus::Running,
        }
    }

    fn active_mut(&mut self) -> Result<&mut ActiveSession, SessionError> {
        self.active.as_mut().ok_or(SessionError::NoSession)
    }

    pub fn sheet(&self) -> Option<&WorkoutSheet> {
        self.active.as_ref().map(|a| &a.sheet)
    }

    pub fn start(&mut self, sheet: WorkoutSheet) -> Result<(), SessionError> {
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyActive(active.sheet.name.clone()));
        }
        info!(sheet_id = %sheet.id, sheet = %sheet.name, "workout started");
        self.active = Some(ActiveSession {
            sheet,
            start_time: now_ms(),
            completed_sets: BTreeSet::new(),
            current_exercise_index: 0,
            paused: false,
        });
        self.elapsed_secs = 0;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        let active = self.active_mut()?;
        if active.paused {
            return Err(SessionError::NotRunning);
        }
        active.paused = true;
        info!(elapsed = self.elapsed_secs, "workout paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        let active = self.active_mut()?;
        if !active.paused {
            return Err(SessionError::NotPaused);
        }
        active.paused = false;
        info!(elapsed = self.elapsed_secs, "workout resumed");
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<SessionStatus, SessionError> {
        match self.status() {
            SessionStatus::Idle => return Err(SessionError::NoSession),
            SessionStatus::Running => self.pause()?,
            SessionStatus::Paused => self.resume()?,
        }
        Ok(self.status())
    }

    /// Ends the session. Without confirmation nothing changes.
    pub fn stop(&mut self, confirmed: bool) -> Result<(), SessionError> {
        if self.active.is_none() {
            return Err(SessionError::NoSession);
        }
        if !confirmed {
            return Err(SessionError::ConfirmationRequired);
        }
        self.reset();
        info!("workout stopped");
        Ok(())
    }

    fn reset(&mut self) {
        self.active = None;
        self.elapsed_secs = 0;
        self.rest_remaining = 0;
        self.rest_active = false;
    }

    /// Drops the session without confirmation when it runs `sheet_id`.
    pub fn discard_if_sheet(&mut self, sheet_id: &str) -> bool {
        let runs_sheet = self.active.as_ref().is_some_and(|a| a.sheet.id == sheet_id);
        if runs_sheet {
            self.reset();
            info!(%sheet_id, "workout discarded with its sheet");
        }
        runs_sheet
    }

    /// Toggles one set. Marking it done starts the rest countdown at the
    /// configured duration; un-marking leaves the rest timer alone.
    pub fn complete_set(&mut self, exercise_id: &str, set_index: u32) -> Result<SetToggle, SessionError> {
        let active = self.active_mut()?;
        let sets = active
            .sheet
            .exercises
            .iter()
            .filter(|e| e.exercise_id == exercise_id)
            .map(|e| e.effective_sets())
            .max();
        if !sets.is_some_and(|sets| set_index < sets) {
            return Err(SessionError::UnknownSet {
                exercise_id: exercise_id.to_string(),
                set_index,
            });
        }
        let key = set_key(exercise_id, set_index);
        if active.completed_sets.remove(&key) {
            debug!(%key, "set reopened");
            return Ok(SetToggle::Reopened);
        }
        active.completed_sets.insert(key);
        debug!(%exercise_id, set_index, "set completed");
        let duration = self.rest_duration;
        self.start_rest(duration);
        Ok(SetToggle::Completed)
    }

    pub fn is_set_completed(&self, exercise_id: &str, set_index: u32) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.completed_sets.contains(&set_key(exercise_id, set_index)))
    }

    /// (Re)starts the rest countdown. A zero duration leaves it inactive.
    pub fn start_rest(&mut self, duration: u32) {
        self.rest_remaining = duration;
        self.rest_active = duration > 0;
        debug!(duration, "rest started");
    }

    pub fn skip_rest(&mut self) {
        self.rest_remaining = 0;
        self.rest_active = false;
    }

    pub fn set_rest_duration(&mut self, secs: u32) {
        self.rest_duration = secs;
    }

    pub fn rest_duration(&self) -> u32 {
        self.rest_duration
    }

    pub fn select_exercise(&mut self, index: usize) -> Result<(), SessionError> {
        let active = self.active_mut()?;
        if index >= active.sheet.exercises.len() {
            return Err(SessionError::UnknownExercise(index));
        }
        active.current_exercise_index = index;
        Ok(())
    }

    /// Advances the workout clock by one second while running. Returns
    /// whether the clock is still meant to tick.
    pub fn tick_elapsed(&mut self) -> bool {
        if self.status() != SessionStatus::Running {
            return false;
        }
        self.elapsed_secs += 1;
        true
    }

    /// Counts the rest timer down by one second, stopping it at zero.
    pub fn tick_rest(&mut self) -> RestTick {
        if !self.rest_active {
            return RestTick::Inactive;
        }
        self.rest_remaining = self.rest_remaining.saturating_sub(1);
        if self.rest_remaining == 0 {
            self.rest_active = false;
            info!("rest finished");
            return RestTick::Finished;
        }
        RestTick::Counting(self.rest_remaining)
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn rest_remaining(&self) -> u32 {
        self.rest_remaining
    }

    pub fn is_rest_active(&self) -> bool {
        self.rest_active
    }

    /// Completed sets over total sets as a percentage; 0 for an empty sheet
    /// or no session.
    pub fn progress(&self) -> f64 {
        let Some(active) = &self.active else {
            return 0.0;
        };
        let total = active.sheet.total_sets();
        if total == 0 {
            return 0.0;
        }
        active.completed_sets.len() as f64 / f64::from(total) * 100.0
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let active = self.active.as_ref();
        SessionSnapshot {
            status: self.status(),
            sheet_id: active.map(|a| a.sheet.id.clone()),
            sheet_name: active.map(|a| a.sheet.name.clone()),
            start_time: active.map(|a| a.start_time),
            elapsed_secs: self.elapsed_secs,
            rest_remaining: self.rest_remaining,
            rest_active: self.rest_active,
            rest_duration: self.rest_duration,
            progress: self.progress(),
            completed_sets: active.map_or(0, |a| a.completed_sets.len()),
            total_sets: active.map_or(0, |a| a.sheet.total_sets()),
            current_exercise_index: active.map_or(0, |a| a.current_exercise_index),
        }
    }
}

/// `MM:SS`, minutes unbounded.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SheetExercise;

    fn sheet(sets: &[(&str, u32)]) -> WorkoutSheet {
        WorkoutSheet {
            id: "s1".into(),
            name: "Push day".into(),
            description: String::new(),
            estimated_duration: Some(45),
            exercises: sets
                .iter()
                .map(|(id, sets)| SheetExercise {
                    exercise_id: (*id).to_string(),
                    sets: *sets,
                    reps: "8".into(),
                    weight: None,
                    notes: None,
                })
                .collect(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn completing_a_set_updates_progress_and_starts_rest() {
        let mut session = WorkoutSession::new(90);
        session.start(sheet(&[("bench", 3), ("dips", 1)])).unwrap();
        assert_eq!(session.complete_set("bench", 0).unwrap(), SetToggle::Completed);
        assert!((session.progress() - 25.0).abs() < f64::EPSILON);
        assert!(session.is_rest_active());
        assert_eq!(session.rest_remaining(), 90);
    }

    #[test]
    fn reopening_a_set_leaves_rest_alone() {
        let mut session = WorkoutSession::new(60);
        session.start(sheet(&[("bench", 2)])).unwrap();
        session.complete_set("bench", 1).unwrap();
        session.skip_rest();
        assert_eq!(session.complete_set("bench", 1).unwrap(), SetToggle::Reopened);
        assert_eq!(session.progress(), 0.0);
        assert!(!session.is_rest_active());
        assert_eq!(session.rest_remaining(), 0);
    }

    #[test]
    fn zero_sets_count_as_one() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[("plank", 0)])).unwrap();
        assert_eq!(session.snapshot().total_sets, 1);
        session.complete_set("plank", 0).unwrap();
        assert!((session.progress() - 100.0).abs() < f64::EPSILON);
        assert!(session.complete_set("plank", 1).is_err());
    }

    #[test]
    fn unknown_sets_are_rejected() {
        let mut session = WorkoutSession::default();
        assert_eq!(session.complete_set("bench", 0), Err(SessionError::NoSession));
        session.start(sheet(&[("bench", 3)])).unwrap();
        assert!(matches!(
            session.complete_set("squat", 0),
            Err(SessionError::UnknownSet { .. })
        ));
        assert!(session.complete_set("bench", 3).is_err());
    }

    #[test]
    fn empty_sheet_has_zero_progress() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[])).unwrap();
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn only_one_session_at_a_time() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[("bench", 1)])).unwrap();
        assert!(matches!(
            session.start(sheet(&[("bench", 1)])),
            Err(SessionError::AlreadyActive(_))
        ));
    }

    #[test]
    fn pause_freezes_elapsed() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[("bench", 1)])).unwrap();
        assert!(session.tick_elapsed());
        session.pause().unwrap();
        assert!(!session.tick_elapsed());
        assert_eq!(session.elapsed_secs(), 1);
        assert_eq!(session.pause(), Err(SessionError::NotRunning));
        assert_eq!(session.toggle_pause().unwrap(), SessionStatus::Running);
        assert_eq!(session.resume(), Err(SessionError::NotPaused));
        session.tick_elapsed();
        assert_eq!(session.elapsed_secs(), 2);
    }

    #[test]
    fn stop_needs_confirmation_and_resets() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[("bench", 2)])).unwrap();
        session.tick_elapsed();
        session.complete_set("bench", 0).unwrap();
        assert_eq!(session.stop(false), Err(SessionError::ConfirmationRequired));
        assert_eq!(session.status(), SessionStatus::Running);

        session.stop(true).unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.elapsed_secs(), 0);
        assert!(!session.is_rest_active());

        session.start(sheet(&[("bench", 2)])).unwrap();
        assert!(!session.is_set_completed("bench", 0));
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn rest_counts_down_to_inactive() {
        let mut session = WorkoutSession::default();
        session.start_rest(30);
        for _ in 0..29 {
            assert!(matches!(session.tick_rest(), RestTick::Counting(_)));
        }
        assert_eq!(session.tick_rest(), RestTick::Finished);
        assert_eq!(session.rest_remaining(), 0);
        assert!(!session.is_rest_active());
        assert_eq!(session.tick_rest(), RestTick::Inactive);

        session.start_rest(0);
        assert!(!session.is_rest_active());
    }

    #[test]
    fn rest_keeps_running_while_paused() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[("bench", 1)])).unwrap();
        session.start_rest(10);
        session.pause().unwrap();
        assert_eq!(session.tick_rest(), RestTick::Counting(9));
    }

    #[test]
    fn discarding_only_matches_the_running_sheet() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[("bench", 1)])).unwrap();
        assert!(!session.discard_if_sheet("other"));
        assert!(session.discard_if_sheet("s1"));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn select_exercise_stays_in_range() {
        let mut session = WorkoutSession::default();
        session.start(sheet(&[("bench", 1), ("dips", 1)])).unwrap();
        session.select_exercise(1).unwrap();
        assert_eq!(session.snapshot().current_exercise_index, 1);
        assert_eq!(session.select_exercise(2), Err(SessionError::UnknownExercise(2)));
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(75 * 60 + 3), "75:03");
    }
}
