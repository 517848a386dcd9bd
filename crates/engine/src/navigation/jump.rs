use std::sync::Arc;

use taskflow_types::identifier::qualified_candidates;
use taskflow_types::{LeafStep, TaskResult};
use tracing::{debug, warn};

use super::rule::{NavigationRuleFactory, NextStepRule};
use super::{Progress, StepNavigator};

/// Consults explicit jump rules before positional order.
///
/// Targets are written relative to the step that declares them and are looked
/// up among its siblings first, then in each enclosing section. A target that
/// names a section lands on its first leaf. Targets that match nothing are
/// logged and ignored.
pub struct JumpStepNavigatorDecorator {
    inner: Box<dyn StepNavigator>,
    rules: Arc<dyn NavigationRuleFactory<dyn NextStepRule>>,
}

impl JumpStepNavigatorDecorator {
    pub fn new(inner: Box<dyn StepNavigator>, rules: Arc<dyn NavigationRuleFactory<dyn NextStepRule>>) -> Self {
        Self { inner, rules }
    }

    fn jump_target(&self, current: &LeafStep, result: &TaskResult) -> Option<&LeafStep> {
        let rule = self.rules.create(current)?;
        let target = rule.next_step_identifier(current, result)?;

        let resolved = qualified_candidates(&current.identifier, &target)
            .iter()
            .find_map(|candidate| self.inner.step(candidate));
        match resolved {
            Some(step) => {
                debug!(from = %current.identifier, target = %target, to = %step.identifier, "jumping to step");
                Some(step)
            }
            None => {
                warn!(
                    from = %current.identifier,
                    target = %target,
                    "jump target does not name a step in this task; continuing in order"
                );
                None
            }
        }
    }
}

impl StepNavigator for JumpStepNavigatorDecorator {
    fn next_step(&self, current: Option<&LeafStep>, result: &TaskResult) -> Option<&LeafStep> {
        if let Some(step) = current
            && let Some(target) = self.jump_target(step, result)
        {
            return Some(target);
        }
        self.inner.next_step(current, result)
    }

    fn previous_step(&self, current: &LeafStep, result: &TaskResult) -> Option<&LeafStep> {
        self.inner.previous_step(current, result)
    }

    fn step(&self, identifier: &str) -> Option<&LeafStep> {
        self.inner.step(identifier)
    }

    fn progress(&self, current: &LeafStep, result: &TaskResult) -> Option<Progress> {
        self.inner.progress(current, result).map(Progress::estimated)
    }
}
