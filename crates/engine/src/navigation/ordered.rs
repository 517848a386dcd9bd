use std::collections::HashMap;
use std::sync::Arc;

use taskflow_types::{LeafStep, Task, TaskResult};

use super::{Progress, StepNavigator};

/// Walks the leaves of a resolved task in document order.
///
/// Positional advancement is strictly monotonic: `next_step` never offers a
/// step at or before `current`, which is what decorators rely on to terminate.
#[derive(Debug, Clone)]
pub struct OrderedStepNavigator {
    task: Arc<Task>,
    leaves: Vec<LeafStep>,
    positions: HashMap<String, usize>,
}

impl OrderedStepNavigator {
    pub fn new(task: Arc<Task>) -> Self {
        let leaves: Vec<LeafStep> = task.leaves().into_iter().cloned().collect();
        let positions = leaves
            .iter()
            .enumerate()
            .map(|(index, leaf)| (leaf.identifier.clone(), index))
            .collect();
        Self { task, leaves, positions }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Leaves in the order they are offered.
    pub fn leaves(&self) -> &[LeafStep] {
        &self.leaves
    }

    fn position(&self, step: &LeafStep) -> Option<usize> {
        self.positions.get(&step.identifier).copied()
    }
}

impl StepNavigator for OrderedStepNavigator {
    fn next_step(&self, current: Option<&LeafStep>, _result: &TaskResult) -> Option<&LeafStep> {
        match current {
            None => self.leaves.first(),
            Some(step) => self.leaves.get(self.position(step)? + 1),
        }
    }

    fn previous_step(&self, current: &LeafStep, result: &TaskResult) -> Option<&LeafStep> {
        let from_history = if result.visited(&current.identifier) {
            result.visited_before(&current.identifier)
        } else {
            result.step_history.last().map(|visit| visit.identifier.as_str())
        };
        if let Some(identifier) = from_history
            && identifier != current.identifier
            && let Some(step) = self.step(identifier)
        {
            return Some(step);
        }

        let position = self.position(current)?;
        position.checked_sub(1).and_then(|index| self.leaves.get(index))
    }

    /// Sections resolve to their first leaf.
    fn step(&self, identifier: &str) -> Option<&LeafStep> {
        if let Some(&index) = self.positions.get(identifier) {
            return self.leaves.get(index);
        }
        let first_leaf = self.task.find_step(identifier)?.first_leaf()?;
        self.positions
            .get(&first_leaf.identifier)
            .and_then(|&index| self.leaves.get(index))
    }

    fn progress(&self, current: &LeafStep, _result: &TaskResult) -> Option<Progress> {
        let position = self.position(current)?;
        Some(Progress {
            current: position + 1,
            total: self.leaves.len(),
            is_estimated: false,
        })
    }
}
