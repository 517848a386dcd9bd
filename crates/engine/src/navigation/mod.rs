//! Step navigation over a resolved task.
//!
//! A [`StepNavigator`] answers "which step comes next" given the current step
//! and the participant's [`TaskResult`]. `None` from [`StepNavigator::next_step`]
//! is the normal end-of-task signal, never an error.
//!
//! The base [`OrderedStepNavigator`] walks leaves in document order. Decorators
//! wrap any navigator and intercept its candidates:
//!
//! - [`SkipStepNavigatorDecorator`] bypasses steps whose skip rule holds;
//! - [`JumpStepNavigatorDecorator`] follows explicit jump rules before
//!   positional order.
//!
//! Decorator order changes behaviour (a skip wrapping a jump can skip the jump
//! target; a jump wrapping a skip cannot), so stacks are built with [`compose`]
//! from an explicit list chosen at the call site.

pub mod condition;
mod jump;
mod ordered;
pub mod rule;
mod skip;

use std::sync::Arc;

use serde::Serialize;
use taskflow_types::{LeafStep, TaskResult};

pub use jump::JumpStepNavigatorDecorator;
pub use ordered::OrderedStepNavigator;
pub use rule::{
    ConditionSkipRuleFactory, NavigationRuleFactory, NextStepRule, SkipRule, SkipToStepRuleFactory,
};
pub use skip::SkipStepNavigatorDecorator;

/// Position of a step within the task, for progress indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// 1-based position of the current step.
    pub current: usize,
    pub total: usize,
    /// Set when rules may change how many steps are actually shown.
    pub is_estimated: bool,
}

impl Progress {
    pub fn estimated(self) -> Self {
        Self {
            is_estimated: true,
            ..self
        }
    }
}

/// State machine over the leaves of a resolved task.
pub trait StepNavigator: Send + Sync {
    /// Step after `current`, or the first step when `current` is `None`.
    ///
    /// Returns `None` when the task is complete.
    fn next_step(&self, current: Option<&LeafStep>, result: &TaskResult) -> Option<&LeafStep>;

    /// Step the participant returns to when going back from `current`.
    fn previous_step(&self, current: &LeafStep, result: &TaskResult) -> Option<&LeafStep>;

    /// Looks up a step by qualified identifier.
    fn step(&self, identifier: &str) -> Option<&LeafStep>;

    fn progress(&self, current: &LeafStep, result: &TaskResult) -> Option<Progress>;
}

/// A decorator applied by [`compose`].
#[derive(Clone)]
pub enum NavigatorLayer {
    Skip {
        rules: Arc<dyn NavigationRuleFactory<dyn SkipRule>>,
        guard_revisits: bool,
    },
    Jump {
        rules: Arc<dyn NavigationRuleFactory<dyn NextStepRule>>,
    },
}

impl NavigatorLayer {
    /// Skip layer with the revisit guard enabled.
    pub fn skip(rules: impl NavigationRuleFactory<dyn SkipRule> + 'static) -> Self {
        Self::Skip {
            rules: Arc::new(rules),
            guard_revisits: true,
        }
    }

    pub fn jump(rules: impl NavigationRuleFactory<dyn NextStepRule> + 'static) -> Self {
        Self::Jump { rules: Arc::new(rules) }
    }

    /// Sets the revisit guard of a skip layer; jump layers are returned unchanged.
    pub fn with_guard_revisits(self, enabled: bool) -> Self {
        match self {
            Self::Skip { rules, .. } => Self::Skip {
                rules,
                guard_revisits: enabled,
            },
            jump @ Self::Jump { .. } => jump,
        }
    }
}

/// Wraps `base` with `layers` in list order: the first layer is innermost.
pub fn compose(base: Box<dyn StepNavigator>, layers: Vec<NavigatorLayer>) -> Box<dyn StepNavigator> {
    layers.into_iter().fold(base, |navigator, layer| match layer {
        NavigatorLayer::Skip { rules, guard_revisits } => {
            Box::new(SkipStepNavigatorDecorator::new(navigator, rules).with_guard_revisits(guard_revisits))
        }
        NavigatorLayer::Jump { rules } => Box::new(JumpStepNavigatorDecorator::new(navigator, rules)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use taskflow_types::{ActionType, ResolvedStep, StepAction, StepResult, Task};

    fn task() -> Arc<Task> {
        let jump = StepAction {
            button_title: None,
            button_icon_name: None,
            skip_to_step_identifier: Some("c".into()),
        };
        Arc::new(Task {
            identifier: "t".into(),
            steps: vec![
                ResolvedStep::Leaf(LeafStep::new("a").with_action(ActionType::Skip, jump)),
                ResolvedStep::Leaf(LeafStep::new("b")),
                ResolvedStep::Leaf(LeafStep::new("c").with_skip_if("true")),
                ResolvedStep::Leaf(LeafStep::new("d")),
            ],
            async_actions: IndexSet::new(),
            title: None,
            icon_name: None,
        })
    }

    fn after_a(navigator: &dyn StepNavigator) -> Option<String> {
        let result = TaskResult::new("t").with_step_result(StepResult::new("a").with_navigation_action(ActionType::Skip));
        let a = navigator.step("a")?;
        navigator.next_step(Some(a), &result).map(|step| step.identifier.clone())
    }

    #[test]
    fn composition_order_is_observable() {
        let skip_after_jump = compose(
            Box::new(OrderedStepNavigator::new(task())),
            vec![
                NavigatorLayer::jump(SkipToStepRuleFactory),
                NavigatorLayer::skip(ConditionSkipRuleFactory),
            ],
        );
        let jump_after_skip = compose(
            Box::new(OrderedStepNavigator::new(task())),
            vec![
                NavigatorLayer::skip(ConditionSkipRuleFactory),
                NavigatorLayer::jump(SkipToStepRuleFactory),
            ],
        );

        assert_eq!(after_a(skip_after_jump.as_ref()).as_deref(), Some("d"));
        assert_eq!(after_a(jump_after_skip.as_ref()).as_deref(), Some("c"));
    }

    #[test]
    fn empty_layer_list_returns_the_base() {
        let navigator = compose(Box::new(OrderedStepNavigator::new(task())), Vec::new());
        let a = navigator.step("a").expect("a");

        assert_eq!(
            navigator.next_step(Some(a), &TaskResult::new("t")).map(|s| s.identifier.as_str()),
            Some("b")
        );
    }
}
