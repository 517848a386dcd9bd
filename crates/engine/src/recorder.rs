//! Recorder scheduling and bookkeeping.
//!
//! [`AsyncActionSchedule`] indexes the scoped async actions of a task by the
//! step that opens and closes their window. [`RecorderRegistry`] tracks the
//! recorders started per task; it performs no I/O, the device side belongs to
//! whoever drives it.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use taskflow_types::{AsyncActionConfiguration, Task};
use tracing::{debug, info};

use crate::error::RecorderError;

/// Async actions of a task keyed by the steps that start and stop them.
#[derive(Debug, Clone, Default)]
pub struct AsyncActionSchedule {
    starting: HashMap<String, Vec<AsyncActionConfiguration>>,
    stopping: HashMap<String, Vec<AsyncActionConfiguration>>,
    unscoped: Vec<AsyncActionConfiguration>,
}

impl AsyncActionSchedule {
    pub fn new(task: &Task) -> Self {
        let mut schedule = Self::default();
        for action in &task.async_actions {
            match action.start_step_identifier() {
                Some(start) => schedule.starting.entry(start.to_string()).or_default().push(action.clone()),
                None => schedule.unscoped.push(action.clone()),
            }
            if let Some(stop) = action.stop_step_identifier() {
                schedule.stopping.entry(stop.to_string()).or_default().push(action.clone());
            }
        }
        schedule
    }

    /// Actions whose window opens when `step` is entered.
    pub fn starting_at(&self, step: &str) -> &[AsyncActionConfiguration] {
        self.starting.get(step).map(Vec::as_slice).unwrap_or_default()
    }

    /// Recorders whose window closes when `step` is left.
    pub fn stopping_at(&self, step: &str) -> &[AsyncActionConfiguration] {
        self.stopping.get(step).map(Vec::as_slice).unwrap_or_default()
    }

    /// Actions without a start step; they run for the whole task.
    pub fn unscoped(&self) -> &[AsyncActionConfiguration] {
        &self.unscoped
    }
}

/// Lifecycle state of a registered recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Recording,
    Stopped,
    Cancelled,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecorderState::Recording => "recording",
            RecorderState::Stopped => "stopped",
            RecorderState::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecorderEntry {
    kind: String,
    state: RecorderState,
}

/// Recorders per task, in the order they were first started.
#[derive(Debug, Default)]
pub struct RecorderRegistry {
    tasks: HashMap<String, IndexMap<String, RecorderEntry>>,
}

impl RecorderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `recorder`, registering it on first use and restarting it otherwise.
    pub fn start(&mut self, task: &str, recorder: &str, kind: &str) {
        let recorders = self.tasks.entry(task.to_string()).or_default();
        let entry = recorders.entry(recorder.to_string()).or_insert_with(|| RecorderEntry {
            kind: kind.to_string(),
            state: RecorderState::Stopped,
        });
        entry.kind = kind.to_string();
        entry.state = RecorderState::Recording;
        info!(task = %task, recorder = %recorder, kind = %kind, "recorder started");
    }

    /// Stops a started recorder.
    ///
    /// # Errors
    ///
    /// [`RecorderError::InvalidArgument`] when the recorder was never started.
    pub fn stop(&mut self, task: &str, recorder: &str) -> Result<(), RecorderError> {
        let entry = self.entry_mut(task, recorder, "cannot stop a recorder that was never started")?;
        entry.state = RecorderState::Stopped;
        info!(task = %task, recorder = %recorder, "recorder stopped");
        Ok(())
    }

    /// Cancels a started recorder, discarding what it captured.
    ///
    /// # Errors
    ///
    /// [`RecorderError::InvalidArgument`] when the recorder was never started.
    pub fn cancel(&mut self, task: &str, recorder: &str) -> Result<(), RecorderError> {
        let entry = self.entry_mut(task, recorder, "cannot cancel a recorder that was never started")?;
        entry.state = RecorderState::Cancelled;
        info!(task = %task, recorder = %recorder, "recorder cancelled");
        Ok(())
    }

    pub fn state(&self, task: &str, recorder: &str) -> Option<RecorderState> {
        self.tasks.get(task)?.get(recorder).map(|entry| entry.state)
    }

    /// Recorder type (`motion`, `distance`, ...) the recorder was last started as.
    pub fn kind(&self, task: &str, recorder: &str) -> Option<&str> {
        self.tasks.get(task)?.get(recorder).map(|entry| entry.kind.as_str())
    }

    /// Identifiers of the recorders of `task` currently recording.
    pub fn active_recorders(&self, task: &str) -> Vec<&str> {
        self.tasks
            .get(task)
            .map(|recorders| {
                recorders
                    .iter()
                    .filter(|(_, entry)| entry.state == RecorderState::Recording)
                    .map(|(identifier, _)| identifier.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Starts the task-wide recorders of `schedule`.
    pub fn begin_task(&mut self, task: &str, schedule: &AsyncActionSchedule) {
        self.start_all(task, schedule.unscoped());
    }

    /// Starts the recorders whose window opens at `step`.
    pub fn enter_step(&mut self, task: &str, schedule: &AsyncActionSchedule, step: &str) {
        self.start_all(task, schedule.starting_at(step));
    }

    /// Stops the running recorders whose window closes at `step`.
    ///
    /// Recorders that never started (their start step was skipped) are left alone.
    pub fn leave_step(&mut self, task: &str, schedule: &AsyncActionSchedule, step: &str) {
        for action in schedule.stopping_at(step) {
            if self.state(task, action.identifier()) != Some(RecorderState::Recording) {
                debug!(task = %task, recorder = %action.identifier(), step = %step, "recorder not running at its stop step");
                continue;
            }
            if let Some(entry) = self
                .tasks
                .get_mut(task)
                .and_then(|recorders| recorders.get_mut(action.identifier()))
            {
                entry.state = RecorderState::Stopped;
                info!(task = %task, recorder = %action.identifier(), step = %step, "recorder stopped");
            }
        }
    }

    fn start_all(&mut self, task: &str, actions: &[AsyncActionConfiguration]) {
        for action in actions.iter().filter(|action| action.is_recorder()) {
            self.start(task, action.identifier(), action.type_name());
        }
    }

    fn entry_mut(&mut self, task: &str, recorder: &str, reason: &str) -> Result<&mut RecorderEntry, RecorderError> {
        self.tasks
            .get_mut(task)
            .and_then(|recorders| recorders.get_mut(recorder))
            .ok_or_else(|| RecorderError::InvalidArgument {
                task: task.to_string(),
                recorder: recorder.to_string(),
                reason: reason.to_string(),
            })
    }
}
