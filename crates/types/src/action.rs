//! Participant-facing step actions.
//!
//! Steps may customize the buttons shown to a participant. The only action with
//! navigation semantics is the skip-to-step action, which names the step the
//! participant jumps to when they trigger it.

use serde::{Deserialize, Serialize};

/// Slots a step action can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    /// Advance to the next step.
    GoForward,
    /// Return to the previous step.
    GoBackward,
    /// Skip the current step.
    Skip,
    /// Abandon the task.
    Cancel,
    /// Show supplementary material.
    LearnMore,
}

/// Button configuration for a single action slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_icon_name: Option<String>,
    /// Step the participant is taken to when this action is triggered.
    ///
    /// Written relative to the declaring step; resolved against enclosing
    /// sections at navigation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_to_step_identifier: Option<String>,
}

impl StepAction {
    /// Returns true when triggering this action jumps to another step.
    pub fn is_skip_to_step(&self) -> bool {
        self.skip_to_step_identifier.is_some()
    }
}
