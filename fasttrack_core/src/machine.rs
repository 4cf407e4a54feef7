//! Fasting session state machine.
//!
//! The machine owns the running fast. It moves between two phases:
//!
//! - `Idle`: no active fast
//! - `Fasting`: active fast with a recorded start instant
//!
//! `start` and `stop` are the only transitions between them and both are
//! no-ops when the machine is already in the target phase. `tick` samples
//! the clock while fasting, derives the current stage and raises a
//! milestone whenever the stage advances past the last one observed, so a
//! skipped sample never loses a milestone.
//!
//! Every transition is written through to the store before the in-memory
//! phase changes, so a reload always restores what the user last saw.

use crate::clock::{format_duration, local_date_label, Clock};
use crate::history::HistoryLog;
use crate::notify::{Notification, Notifier};
use crate::stage::{classify, stage};
use crate::store::{keys, KeyValueStore};
use crate::{FastingSession, Result, RunningFastState};

/// Current phase of the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FastPhase {
    Idle,
    Fasting { start_time: i64 },
}

/// Result of calling [`FastingMachine::start`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started { start_time: i64 },
    AlreadyFasting { start_time: i64 },
}

/// A fast that was just ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedFast {
    pub start_time: i64,
    pub end_time: i64,
    pub duration: u64,
    /// Whether a history entry was there to finalize
    pub recorded: bool,
}

/// Result of calling [`FastingMachine::stop`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Completed(CompletedFast),
    NotFasting,
}

/// One clock sample taken while fasting
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickSample {
    pub elapsed_secs: u64,
    pub stage: usize,
    /// Stage entered on this sample, if any
    pub milestone: Option<usize>,
}

/// Read-only view of the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FastStatus {
    pub phase: FastPhase,
    pub elapsed_secs: u64,
    pub stage: usize,
}

impl FastStatus {
    pub fn is_fasting(&self) -> bool {
        matches!(self.phase, FastPhase::Fasting { .. })
    }
}

/// Read the running-fast snapshot from the store
///
/// A store that claims a fast is running but has no usable start instant
/// restores as idle.
pub fn load_running_state<S: KeyValueStore + ?Sized>(store: &S) -> RunningFastState {
    let is_fasting = store.get(keys::IS_FASTING).as_deref() == Some("true");
    if !is_fasting {
        return RunningFastState::idle();
    }

    let start_time = store
        .get(keys::FASTING_START_TIME)
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    match start_time {
        Some(start_time) => RunningFastState::fasting_since(start_time),
        None => {
            tracing::warn!("Stored fast is marked running but has no start time, treating as idle");
            RunningFastState::idle()
        }
    }
}

/// Write the running-fast snapshot to the store
pub fn save_running_state<S: KeyValueStore + ?Sized>(
    store: &mut S,
    state: &RunningFastState,
) -> Result<()> {
    match (state.is_fasting, state.start_time) {
        (true, Some(start_time)) => {
            store.set(keys::FASTING_START_TIME, &start_time.to_string())?;
            store.set(keys::IS_FASTING, "true")?;
        }
        _ => {
            store.set(keys::IS_FASTING, "false")?;
            store.remove(keys::FASTING_START_TIME)?;
        }
    }
    Ok(())
}

/// Whole seconds from `start_time` to `now`, never negative
fn elapsed_secs(start_time: i64, now: i64) -> u64 {
    (now.saturating_sub(start_time).max(0) / 1000) as u64
}

/// The fasting lifecycle, wired to its collaborators
pub struct FastingMachine<S, C, N> {
    store: S,
    clock: C,
    notifier: N,
    phase: FastPhase,
    elapsed_secs: u64,
    stage: usize,
    last_stage: usize,
}

impl<S, C, N> FastingMachine<S, C, N>
where
    S: KeyValueStore,
    C: Clock,
    N: Notifier,
{
    /// Build the machine, restoring any fast already in progress
    pub fn new(store: S, clock: C, notifier: N) -> Self {
        let mut machine = Self {
            store,
            clock,
            notifier,
            phase: FastPhase::Idle,
            elapsed_secs: 0,
            stage: 0,
            last_stage: 0,
        };
        machine.resync();
        machine
    }

    /// Re-read the running state from the store
    ///
    /// Stages already passed at restore time are treated as observed, so
    /// reloading never re-announces old milestones.
    pub fn resync(&mut self) {
        let running = load_running_state(&self.store);
        let phase = match running.start_time {
            Some(start_time) if running.is_fasting => FastPhase::Fasting { start_time },
            _ => FastPhase::Idle,
        };

        if phase == self.phase {
            return;
        }

        self.phase = phase;
        match phase {
            FastPhase::Fasting { start_time } => {
                self.elapsed_secs = elapsed_secs(start_time, self.clock.now_millis());
                self.stage = classify(self.elapsed_secs);
                self.last_stage = self.stage;
                tracing::info!(
                    "Restored fast started at {} ({} elapsed)",
                    start_time,
                    format_duration(self.elapsed_secs)
                );
            }
            FastPhase::Idle => self.reset_progress(),
        }
    }

    /// Begin a fast
    pub fn start(&mut self) -> Result<StartOutcome> {
        if let FastPhase::Fasting { start_time } = self.phase {
            tracing::debug!("start ignored, already fasting since {}", start_time);
            return Ok(StartOutcome::AlreadyFasting { start_time });
        }

        let start_time = self.clock.now_millis();

        save_running_state(&mut self.store, &RunningFastState::fasting_since(start_time))?;

        let mut history = HistoryLog::load(&self.store);
        history.append(FastingSession::started(
            start_time,
            local_date_label(start_time),
        ));
        if let Err(e) = history.save(&mut self.store) {
            self.rollback_running_state(RunningFastState::idle());
            return Err(e);
        }

        self.phase = FastPhase::Fasting { start_time };
        self.reset_progress();

        tracing::info!("Fast started at {}", start_time);
        self.notifier.notify(Notification::new("Fasting started"));

        Ok(StartOutcome::Started { start_time })
    }

    /// End the current fast
    pub fn stop(&mut self) -> Result<StopOutcome> {
        let FastPhase::Fasting { start_time } = self.phase else {
            tracing::debug!("stop ignored, not fasting");
            return Ok(StopOutcome::NotFasting);
        };

        let end_time = self.clock.now_millis();
        let duration = elapsed_secs(start_time, end_time);

        save_running_state(&mut self.store, &RunningFastState::idle())?;

        // Only an in-progress entry belongs to this fast; completed ones are never rewritten
        let mut history = HistoryLog::load(&self.store);
        let recorded = history.last().is_some_and(|last| last.is_in_progress())
            && history.finalize_last(end_time, duration);
        if recorded {
            if let Err(e) = history.save(&mut self.store) {
                self.rollback_running_state(RunningFastState::fasting_since(start_time));
                return Err(e);
            }
        } else {
            tracing::warn!("No history entry to finalize for fast started at {}", start_time);
        }

        self.phase = FastPhase::Idle;
        self.reset_progress();

        tracing::info!("Fast completed after {} seconds", duration);
        self.notifier.notify(
            Notification::new("Fasting completed!")
                .with_description(format!("You fasted for {}", format_duration(duration))),
        );

        Ok(StopOutcome::Completed(CompletedFast {
            start_time,
            end_time,
            duration,
            recorded,
        }))
    }

    /// Sample the clock while fasting
    ///
    /// Returns `None` while idle.
    pub fn tick(&mut self) -> Option<TickSample> {
        let FastPhase::Fasting { start_time } = self.phase else {
            return None;
        };

        self.elapsed_secs = elapsed_secs(start_time, self.clock.now_millis());
        self.stage = classify(self.elapsed_secs);

        let milestone = if self.stage > self.last_stage {
            let entered = stage(self.stage);
            tracing::info!("Entered fasting stage {} ({})", self.stage, entered.title);
            self.notifier.notify(
                Notification::new("Fasting milestone reached!").with_description(format!(
                    "You've entered a new fasting stage: {} ({})",
                    entered.title, entered.label
                )),
            );
            Some(self.stage)
        } else {
            None
        };
        // A clock moved backwards lowers the stage silently
        self.last_stage = self.stage;

        Some(TickSample {
            elapsed_secs: self.elapsed_secs,
            stage: self.stage,
            milestone,
        })
    }

    pub fn status(&self) -> FastStatus {
        FastStatus {
            phase: self.phase,
            elapsed_secs: self.elapsed_secs,
            stage: self.stage,
        }
    }

    pub fn phase(&self) -> FastPhase {
        self.phase
    }

    pub fn is_fasting(&self) -> bool {
        matches!(self.phase, FastPhase::Fasting { .. })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Put the running state back after a failed history write
    ///
    /// Store and history then agree again; a second failure is only logged.
    fn rollback_running_state(&mut self, previous: RunningFastState) {
        if let Err(e) = save_running_state(&mut self.store, &previous) {
            tracing::error!("Failed to restore running state: {}", e);
        }
    }

    fn reset_progress(&mut self) {
        self.elapsed_secs = 0;
        self.stage = 0;
        self.last_stage = 0;
    }
}
