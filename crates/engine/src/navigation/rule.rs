//! Navigation rules and the factories that attach them to steps.
//!
//! A factory inspects a step and yields at most one rule for it; `None` means
//! no rule applies, which decorators treat as "leave the step alone". Plain
//! closures implement both the rule and the factory traits, so ad hoc rules do
//! not need a named type.

use std::collections::BTreeMap;

use taskflow_types::{ActionType, LeafStep, TaskResult};
use tracing::debug;

use super::condition::eval_condition;

/// Decides whether a candidate step should be bypassed.
pub trait SkipRule {
    fn should_skip(&self, step: &LeafStep, result: &TaskResult) -> bool;
}

/// Chooses an explicit successor for a step, overriding positional order.
pub trait NextStepRule {
    /// Identifier of the step to jump to, as authored (local or qualified).
    fn next_step_identifier(&self, step: &LeafStep, result: &TaskResult) -> Option<String>;
}

/// Produces zero or one rule of kind `R` for a step.
pub trait NavigationRuleFactory<R: ?Sized>: Send + Sync {
    fn create(&self, step: &LeafStep) -> Option<Box<R>>;
}

impl<F> SkipRule for F
where
    F: Fn(&LeafStep, &TaskResult) -> bool,
{
    fn should_skip(&self, step: &LeafStep, result: &TaskResult) -> bool {
        self(step, result)
    }
}

impl<F> NextStepRule for F
where
    F: Fn(&LeafStep, &TaskResult) -> Option<String>,
{
    fn next_step_identifier(&self, step: &LeafStep, result: &TaskResult) -> Option<String> {
        self(step, result)
    }
}

impl<R, F> NavigationRuleFactory<R> for F
where
    R: ?Sized,
    F: Fn(&LeafStep) -> Option<Box<R>> + Send + Sync,
{
    fn create(&self, step: &LeafStep) -> Option<Box<R>> {
        self(step)
    }
}

/// Skips steps whose `skipIf` condition holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionSkipRuleFactory;

impl NavigationRuleFactory<dyn SkipRule> for ConditionSkipRuleFactory {
    fn create(&self, step: &LeafStep) -> Option<Box<dyn SkipRule>> {
        let expression = step.skip_if.clone()?;
        Some(Box::new(ConditionSkipRule { expression }))
    }
}

struct ConditionSkipRule {
    expression: String,
}

impl SkipRule for ConditionSkipRule {
    fn should_skip(&self, step: &LeafStep, result: &TaskResult) -> bool {
        let skip = eval_condition(&self.expression, &step.identifier, result);
        debug!(step = %step.identifier, condition = %self.expression, skip, "evaluated skip condition");
        skip
    }
}

/// Follows `skipToStepIdentifier` of the action the participant used to leave a step.
///
/// The triggering action is read from the latest result recorded for the step
/// (`StepResult::navigation_action`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipToStepRuleFactory;

impl NavigationRuleFactory<dyn NextStepRule> for SkipToStepRuleFactory {
    fn create(&self, step: &LeafStep) -> Option<Box<dyn NextStepRule>> {
        let targets: BTreeMap<ActionType, String> = step
            .actions
            .iter()
            .filter_map(|(action_type, action)| {
                let target = action.skip_to_step_identifier.clone()?;
                Some((*action_type, target))
            })
            .collect();
        if targets.is_empty() {
            return None;
        }
        Some(Box::new(SkipToStepRule { targets }))
    }
}

struct SkipToStepRule {
    targets: BTreeMap<ActionType, String>,
}

impl NextStepRule for SkipToStepRule {
    fn next_step_identifier(&self, step: &LeafStep, result: &TaskResult) -> Option<String> {
        let action = result.result_for(&step.identifier)?.navigation_action?;
        self.targets.get(&action).cloned()
    }
}
