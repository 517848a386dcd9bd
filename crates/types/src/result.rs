//! Participant results accumulated while a task runs.
//!
//! Navigation only reads these records; the presentation layer appends to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ActionType;

/// Outcome of a single visit to a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Qualified identifier of the visited step.
    pub identifier: String,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Answer payload collected by the step, `null` when the step collects nothing.
    #[serde(default)]
    pub answer: Value,
    /// Action the participant used to leave the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_action: Option<ActionType>,
}

impl StepResult {
    pub fn new(identifier: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            identifier: identifier.into(),
            start_date: now,
            end_date: Some(now),
            answer: Value::Null,
            navigation_action: None,
        }
    }

    pub fn with_answer(mut self, answer: Value) -> Self {
        self.answer = answer;
        self
    }

    pub fn with_navigation_action(mut self, action: ActionType) -> Self {
        self.navigation_action = Some(action);
        self
    }
}

/// Ordered record of everything the participant did during one task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub identifier: String,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub step_history: Vec<StepResult>,
}

impl TaskResult {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            start_date: Utc::now(),
            end_date: None,
            step_history: Vec::new(),
        }
    }

    /// Appends a step visit.
    pub fn append(&mut self, result: StepResult) {
        self.step_history.push(result);
    }

    /// Builder form of [`TaskResult::append`].
    pub fn with_step_result(mut self, result: StepResult) -> Self {
        self.append(result);
        self
    }

    /// Latest result recorded for `identifier`.
    pub fn result_for(&self, identifier: &str) -> Option<&StepResult> {
        self.step_history.iter().rev().find(|result| result.identifier == identifier)
    }

    pub fn visited(&self, identifier: &str) -> bool {
        self.result_for(identifier).is_some()
    }

    /// Identifier of the step visited immediately before the latest visit to `identifier`.
    pub fn visited_before(&self, identifier: &str) -> Option<&str> {
        let position = self.step_history.iter().rposition(|result| result.identifier == identifier)?;
        position
            .checked_sub(1)
            .map(|previous| self.step_history[previous].identifier.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_for_returns_latest_visit() {
        let result = TaskResult::new("survey")
            .with_step_result(StepResult::new("mood").with_answer(json!("sad")))
            .with_step_result(StepResult::new("sleep"))
            .with_step_result(StepResult::new("mood").with_answer(json!("happy")));

        assert_eq!(result.result_for("mood").map(|r| &r.answer), Some(&json!("happy")));
        assert!(result.visited("sleep"));
        assert!(!result.visited("exercise"));
    }

    #[test]
    fn visited_before_uses_history_order() {
        let result = TaskResult::new("survey")
            .with_step_result(StepResult::new("a"))
            .with_step_result(StepResult::new("c"));

        assert_eq!(result.visited_before("c"), Some("a"));
        assert_eq!(result.visited_before("a"), None);
        assert_eq!(result.visited_before("b"), None);
    }
}
