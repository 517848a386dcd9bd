use std::collections::HashSet;
use std::sync::Arc;

use taskflow_types::{LeafStep, TaskResult};
use tracing::{debug, warn};

use super::rule::{NavigationRuleFactory, SkipRule};
use super::{Progress, StepNavigator};

/// Bypasses candidate steps whose skip rule holds.
///
/// After the wrapped navigator offers a candidate, the factory is asked for a
/// rule for it. While a rule exists and says "skip", the wrapped navigator is
/// queried again starting from the skipped candidate. A `None` from the wrapped
/// navigator ends the task as usual.
///
/// # Preconditions
///
/// The wrapped navigator must advance monotonically: asking for the step after
/// a skipped candidate must never re-offer a step already skipped in the same
/// call. With `guard_revisits` enabled a repeated candidate ends navigation
/// with `None` and a warning; without it such a navigator loops forever.
pub struct SkipStepNavigatorDecorator {
    inner: Box<dyn StepNavigator>,
    rules: Arc<dyn NavigationRuleFactory<dyn SkipRule>>,
    guard_revisits: bool,
}

impl SkipStepNavigatorDecorator {
    pub fn new(inner: Box<dyn StepNavigator>, rules: Arc<dyn NavigationRuleFactory<dyn SkipRule>>) -> Self {
        Self {
            inner,
            rules,
            guard_revisits: true,
        }
    }

    pub fn with_guard_revisits(mut self, guard_revisits: bool) -> Self {
        self.guard_revisits = guard_revisits;
        self
    }

    fn should_skip(&self, step: &LeafStep, result: &TaskResult) -> bool {
        self.rules
            .create(step)
            .is_some_and(|rule| rule.should_skip(step, result))
    }
}

impl StepNavigator for SkipStepNavigatorDecorator {
    fn next_step(&self, current: Option<&LeafStep>, result: &TaskResult) -> Option<&LeafStep> {
        let mut skipped: HashSet<&str> = HashSet::new();
        let mut candidate = self.inner.next_step(current, result)?;

        while self.should_skip(candidate, result) {
            debug!(step = %candidate.identifier, "skipping step");
            if self.guard_revisits && !skipped.insert(candidate.identifier.as_str()) {
                warn!(
                    step = %candidate.identifier,
                    task = %result.identifier,
                    "navigator offered an already skipped step again; ending navigation"
                );
                return None;
            }
            candidate = self.inner.next_step(Some(candidate), result)?;
        }
        Some(candidate)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::OrderedStepNavigator;
    use indexmap::IndexSet;
    use taskflow_types::{ResolvedStep, Task};

    fn navigator(identifiers: &[&str]) -> Box<dyn StepNavigator> {
        let task = Task {
            identifier: "t".into(),
            steps: identifiers
                .iter()
                .map(|identifier| ResolvedStep::Leaf(LeafStep::new(*identifier)))
                .collect(),
            async_actions: IndexSet::new(),
            title: None,
            icon_name: None,
        };
        Box::new(OrderedStepNavigator::new(Arc::new(task)))
    }

    fn skipping(identifiers: &'static [&'static str]) -> Arc<dyn NavigationRuleFactory<dyn SkipRule>> {
        Arc::new(move |step: &LeafStep| -> Option<Box<dyn SkipRule>> {
            identifiers
                .contains(&step.identifier.as_str())
                .then(|| Box::new(|_: &LeafStep, _: &TaskResult| true) as Box<dyn SkipRule>)
        })
    }

    /// Offers `a`, then keeps offering `b` forever.
    struct StuckNavigator {
        a: LeafStep,
        b: LeafStep,
    }

    impl StepNavigator for StuckNavigator {
        fn next_step(&self, current: Option<&LeafStep>, _result: &TaskResult) -> Option<&LeafStep> {
            match current {
                None => Some(&self.a),
                Some(_) => Some(&self.b),
            }
        }

        fn previous_step(&self, _current: &LeafStep, _result: &TaskResult) -> Option<&LeafStep> {
            None
        }

        fn step(&self, _identifier: &str) -> Option<&LeafStep> {
            None
        }

        fn progress(&self, _current: &LeafStep, _result: &TaskResult) -> Option<Progress> {
            None
        }
    }

    #[test]
    fn skips_marked_candidates() {
        let decorator = SkipStepNavigatorDecorator::new(navigator(&["x", "y", "z"]), skipping(&["y"]));
        let result = TaskResult::new("t");
        let x = decorator.step("x").expect("x");

        assert_eq!(decorator.next_step(Some(x), &result).map(|s| s.identifier.as_str()), Some("z"));
    }

    #[test]
    fn skipping_the_tail_ends_the_task() {
        let decorator = SkipStepNavigatorDecorator::new(navigator(&["x", "y", "z"]), skipping(&["y", "z"]));
        let result = TaskResult::new("t");
        let x = decorator.step("x").expect("x");

        assert!(decorator.next_step(Some(x), &result).is_none());
    }

    #[test]
    fn without_rules_matches_the_wrapped_navigator() {
        let plain = navigator(&["x", "y", "z"]);
        let decorator = SkipStepNavigatorDecorator::new(navigator(&["x", "y", "z"]), skipping(&[]));
        let result = TaskResult::new("t");

        let mut expected = plain.next_step(None, &result);
        let mut actual = decorator.next_step(None, &result);
        while let (Some(e), Some(a)) = (expected, actual) {
            assert_eq!(e, a);
            expected = plain.next_step(Some(e), &result);
            actual = decorator.next_step(Some(a), &result);
        }
        assert!(expected.is_none() && actual.is_none());
    }

    #[test]
    fn guard_stops_non_monotonic_navigators() {
        let stuck = StuckNavigator {
            a: LeafStep::new("a"),
            b: LeafStep::new("b"),
        };
        let decorator = SkipStepNavigatorDecorator::new(Box::new(stuck), skipping(&["b"]));
        let result = TaskResult::new("t");
        let a = decorator.next_step(None, &result).expect("a").clone();

        assert!(decorator.next_step(Some(&a), &result).is_none());
    }

    #[test]
    fn progress_becomes_estimated() {
        let decorator = SkipStepNavigatorDecorator::new(navigator(&["x", "y"]), skipping(&[]));
        let x = decorator.step("x").expect("x");

        let progress = decorator.progress(x, &TaskResult::new("t")).expect("progress");
        assert!(progress.is_estimated);
        assert_eq!((progress.current, progress.total), (1, 2));
    }
}
