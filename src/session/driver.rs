//src/session/driver.rs
use super::{RestTick, SessionError, SessionSnapshot, SessionStatus, SetToggle, WorkoutSession};
use crate::models::WorkoutSheet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RestStarted { secs: u32 },
    RestFinished,
}

/// Owns a `WorkoutSession` and the two one-second clocks that tick it. The
/// workout clock runs exactly while the session is running; the rest clock
/// exactly while a countdown is active. Must be used inside a tokio runtime.
pub struct SessionDriver {
    session: Arc<Mutex<WorkoutSession>>,
    workout_clock: Option<JoinHandle<()>>,
    rest_clock: Option<JoinHandle<()>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

fn lock(session: &Mutex<WorkoutSession>) -> MutexGuard<'_, WorkoutSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn stop_clock(clock: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = clock.take() {
        handle.abort();
    }
}

fn is_live(clock: &Option<JoinHandle<()>>) -> bool {
    clock.as_ref().is_some_and(|h| !h.is_finished())
}

impl SessionDriver {
    pub fn new(rest_duration: u32) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let driver = Self {
            session: Arc::new(Mutex::new(WorkoutSession::new(rest_duration))),
            workout_clock: None,
            rest_clock: None,
            events,
        };
        (driver, rx)
    }

    fn session(&self) -> MutexGuard<'_, WorkoutSession> {
        lock(&self.session)
    }

    fn spawn_workout_clock(&mut self) {
        stop_clock(&mut self.workout_clock);
        let session = Arc::clone(&self.session);
        self.workout_clock = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                let running = lock(&session).tick_elapsed();
                if !running {
                    break;
                }
            }
            debug!("workout clock stopped");
        }));
    }

    fn spawn_rest_clock(&mut self) {
        stop_clock(&mut self.rest_clock);
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        self.rest_clock = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                let tick = lock(&session).tick_rest();
                match tick {
                    RestTick::Counting(_) => {}
                    RestTick::Finished => {
                        // Receiver may be gone; the countdown still ends.
                        let _ = events.send(SessionEvent::RestFinished);
                        break;
                    }
                    RestTick::Inactive => break,
                }
            }
            debug!("rest clock stopped");
        }));
    }

    // Brings the clocks in line with the session state.
    fn sync_workout_clock(&mut self) {
        let running = self.session().status() == SessionStatus::Running;
        if running && !is_live(&self.workout_clock) {
            self.spawn_workout_clock();
        } else if !running {
            stop_clock(&mut self.workout_clock);
        }
    }

    fn restart_rest_clock(&mut self) {
        let (active, secs) = {
            let session = self.session();
            (session.is_rest_active(), session.rest_remaining())
        };
        if active {
            self.spawn_rest_clock();
            let _ = self.events.send(SessionEvent::RestStarted { secs });
        } else {
            stop_clock(&mut self.rest_clock);
        }
    }

    pub fn start(&mut self, sheet: WorkoutSheet) -> Result<SessionSnapshot, SessionError> {
        self.session().start(sheet)?;
        self.sync_workout_clock();
        Ok(self.snapshot())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.session().pause()?;
        self.sync_workout_clock();
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.session().resume()?;
        self.sync_workout_clock();
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<SessionStatus, SessionError> {
        let status = self.session().toggle_pause()?;
        self.sync_workout_clock();
        Ok(status)
    }

    pub fn stop(&mut self, confirmed: bool) -> Result<(), SessionError> {
        self.session().stop(confirmed)?;
        stop_clock(&mut self.workout_clock);
        stop_clock(&mut self.rest_clock);
        Ok(())
    }

    pub fn discard_if_sheet(&mut self, sheet_id: &str) -> bool {
        let discarded = self.session().discard_if_sheet(sheet_id);
        if discarded {
            stop_clock(&mut self.workout_clock);
            stop_clock(&mut self.rest_clock);
        }
        discarded
    }

    pub fn complete_set(&mut self, exercise_id: &str, set_index: u32) -> Result<SetToggle, SessionError> {
        let toggle = self.session().complete_set(exercise_id, set_index)?;
        if toggle == SetToggle::Completed {
            self.restart_rest_clock();
        }
        Ok(toggle)
    }

    pub fn start_rest(&mut self, secs: u32) {
        self.session().start_rest(secs);
        self.restart_rest_clock();
    }

    pub fn skip_rest(&mut self) {
        self.session().skip_rest();
        stop_clock(&mut self.rest_clock);
    }

    pub fn set_rest_duration(&mut self, secs: u32) {
        self.session().set_rest_duration(secs);
    }

    pub fn select_exercise(&mut self, index: usize) -> Result<(), SessionError> {
        self.session().select_exercise(index)
    }

    pub fn is_set_completed(&self, exercise_id: &str, set_index: u32) -> bool {
        self.session().is_set_completed(exercise_id, set_index)
    }

    pub fn sheet(&self) -> Option<WorkoutSheet> {
        self.session().sheet().cloned()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session().snapshot()
    }

    pub fn is_workout_clock_active(&self) -> bool {
        is_live(&self.workout_clock)
    }

    pub fn is_rest_clock_active(&self) -> bool {
        is_live(&self.rest_clock)
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        stop_clock(&mut self.workout_clock);
        stop_clock(&mut self.rest_clock);
    }
}
