//! Async action scope inference.
//!
//! Declarations that omit their window inherit it from the enclosing section:
//! the start is the section's leftmost leaf and, for recorders, the stop is its
//! rightmost leaf. Actions declared on top-level steps have no enclosing
//! section and keep unset bounds, which means "active for the whole task".
//!
//! Explicit bounds are written in local form, like skip targets. They are
//! looked up from the declaring step outwards: a section looks among its own
//! children first, a leaf among its siblings. A bound naming a section starts
//! at its first leaf or stops at its last. A bound that names no step is kept
//! as written.
//!
//! The bounds are computed once per visited section by descending its first
//! and last children, so the cost is O(depth) per section rather than per
//! action.

use std::collections::HashMap;

use indexmap::IndexSet;
use taskflow_types::identifier::{child_prefix, qualified_candidates, qualify};
use taskflow_types::{AsyncActionConfiguration, ResolvedStep, SectionStep, Step};
use tracing::{debug, warn};

/// Collects every async action declared in `steps` with its inferred scope.
///
/// Structurally equal declarations collapse into one entry; the set keeps the
/// order in which actions were first reached in a preorder walk.
pub fn compute_scopes(steps: &[ResolvedStep]) -> IndexSet<AsyncActionConfiguration> {
    let index = StepIndex::new(steps);
    let mut accumulator = IndexSet::new();
    collect_scoped_actions(steps, None, &index, &mut accumulator);
    accumulator
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    Stop,
}

/// Every step of a resolved tree by qualified identifier.
struct StepIndex<'a> {
    steps: HashMap<&'a str, &'a ResolvedStep>,
}

impl<'a> StepIndex<'a> {
    fn new(roots: &'a [ResolvedStep]) -> Self {
        let mut index = Self { steps: HashMap::new() };
        index.insert_all(roots);
        index
    }

    fn insert_all(&mut self, steps: &'a [ResolvedStep]) {
        for step in steps {
            self.steps.insert(step.identifier(), step);
            if let ResolvedStep::Section(section) = step {
                self.insert_all(&section.steps);
            }
        }
    }

    /// Qualified leaf identifier for a bound written as `local` on `declaring`.
    fn qualify_bound(&self, declaring: &ResolvedStep, local: &str, bound: Bound) -> String {
        let mut candidates = Vec::new();
        if let ResolvedStep::Section(section) = declaring {
            candidates.push(qualify(&child_prefix(&section.identifier), local));
        }
        candidates.extend(qualified_candidates(declaring.identifier(), local));

        let target = candidates.iter().find_map(|candidate| self.steps.get(candidate.as_str()));
        let leaf = target.and_then(|step| match bound {
            Bound::Start => step.first_leaf(),
            Bound::Stop => step.last_leaf(),
        });
        match leaf {
            Some(leaf) => leaf.identifier.clone(),
            None => {
                warn!(
                    step = %declaring.identifier(),
                    bound = %local,
                    "async action bound names no step; keeping it as written"
                );
                local.to_string()
            }
        }
    }
}

fn collect_scoped_actions(
    steps: &[ResolvedStep],
    parent: Option<&SectionStep<ResolvedStep>>,
    index: &StepIndex<'_>,
    accumulator: &mut IndexSet<AsyncActionConfiguration>,
) {
    let parent_start_identifier = parent.and_then(section_start_identifier);
    let parent_stop_identifier = parent.and_then(section_stop_identifier);

    for step in steps {
        for action in step.async_actions() {
            let scoped = apply_scope(
                action,
                step,
                index,
                parent_start_identifier.as_deref(),
                parent_stop_identifier.as_deref(),
            );
            debug!(
                action = %scoped.identifier(),
                step = %step.identifier(),
                start = ?scoped.start_step_identifier(),
                stop = ?scoped.stop_step_identifier(),
                "scoped async action"
            );
            accumulator.insert(scoped);
        }

        if let ResolvedStep::Section(section) = step {
            collect_scoped_actions(&section.steps, Some(section), index, accumulator);
        }
    }
}

fn apply_scope(
    action: &AsyncActionConfiguration,
    declaring: &ResolvedStep,
    index: &StepIndex<'_>,
    start: Option<&str>,
    stop: Option<&str>,
) -> AsyncActionConfiguration {
    let start = match action.start_step_identifier() {
        Some(local) => Some(index.qualify_bound(declaring, local, Bound::Start)),
        None => start.map(str::to_string),
    };
    let mut scoped = action.copy_with_start_step_identifier(start);
    if scoped.is_recorder() {
        let stop = match action.stop_step_identifier() {
            Some(local) => Some(index.qualify_bound(declaring, local, Bound::Stop)),
            None => stop.map(str::to_string),
        };
        scoped = scoped.copy_with_stop_step_identifier(stop);
    }
    scoped
}

fn section_start_identifier(section: &SectionStep<ResolvedStep>) -> Option<String> {
    section
        .steps
        .first()
        .and_then(ResolvedStep::first_leaf)
        .map(|leaf| leaf.identifier.clone())
}

fn section_stop_identifier(section: &SectionStep<ResolvedStep>) -> Option<String> {
    section
        .steps
        .last()
        .and_then(ResolvedStep::last_leaf)
        .map(|leaf| leaf.identifier.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskflow_types::{AsyncActionBase, LeafStep, RecorderConfiguration};

    fn leaf(identifier: &str) -> ResolvedStep {
        ResolvedStep::Leaf(LeafStep::new(identifier))
    }

    fn motion(identifier: &str) -> AsyncActionConfiguration {
        AsyncActionConfiguration::Motion(RecorderConfiguration::new(identifier))
    }

    #[test]
    fn recorder_inherits_enclosing_section_bounds() {
        let section = SectionStep::new(
            "s",
            vec![
                leaf("s.a"),
                ResolvedStep::Leaf(LeafStep::new("s.b").with_async_action(motion("motion"))),
                leaf("s.c"),
            ],
        );

        let scopes = compute_scopes(&[ResolvedStep::Section(section)]);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(scopes.len(), 1);
        assert_eq!(action.start_step_identifier(), Some("s.a"));
        assert_eq!(action.stop_step_identifier(), Some("s.c"));
    }

    #[test]
    fn bounds_descend_through_nested_sections() {
        let inner_first = SectionStep::new("s.x", vec![leaf("s.x.1"), leaf("s.x.2")]);
        let inner_last = SectionStep::new("s.y", vec![leaf("s.y.1"), leaf("s.y.2")]);
        let section = SectionStep::new(
            "s",
            vec![
                ResolvedStep::Section(inner_first),
                ResolvedStep::Leaf(LeafStep::new("s.mid").with_async_action(motion("motion"))),
                ResolvedStep::Section(inner_last),
            ],
        );

        let scopes = compute_scopes(&[ResolvedStep::Section(section)]);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), Some("s.x.1"));
        assert_eq!(action.stop_step_identifier(), Some("s.y.2"));
    }

    #[test]
    fn explicit_bounds_are_preserved() {
        let declared = AsyncActionConfiguration::Distance(RecorderConfiguration {
            identifier: "distance".into(),
            start_step_identifier: Some("s.b".into()),
            stop_step_identifier: None,
        });
        let section = SectionStep::new(
            "s",
            vec![leaf("s.a"), ResolvedStep::Leaf(LeafStep::new("s.b").with_async_action(declared)), leaf("s.c")],
        );

        let scopes = compute_scopes(&[ResolvedStep::Section(section)]);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), Some("s.b"));
        assert_eq!(action.stop_step_identifier(), Some("s.c"));
    }

    #[test]
    fn local_bounds_resolve_against_the_declaring_step() {
        let declared = AsyncActionConfiguration::Motion(RecorderConfiguration {
            identifier: "motion".into(),
            start_step_identifier: Some("b".into()),
            stop_step_identifier: Some("done".into()),
        });
        let section = SectionStep::new(
            "s",
            vec![leaf("s.a"), ResolvedStep::Leaf(LeafStep::new("s.b").with_async_action(declared)), leaf("s.c")],
        );

        let scopes = compute_scopes(&[ResolvedStep::Section(section), leaf("done")]);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), Some("s.b"));
        assert_eq!(action.stop_step_identifier(), Some("done"));
    }

    #[test]
    fn section_bounds_look_among_children_and_map_to_leaves() {
        let declared = AsyncActionConfiguration::Distance(RecorderConfiguration {
            identifier: "distance".into(),
            start_step_identifier: Some("inner".into()),
            stop_step_identifier: Some("inner".into()),
        });
        let inner = SectionStep::new("s.inner", vec![leaf("s.inner.a"), leaf("s.inner.b")]);
        let section = SectionStep::new("s", vec![leaf("s.intro"), ResolvedStep::Section(inner), leaf("s.end")])
            .with_async_action(declared);

        let scopes = compute_scopes(&[ResolvedStep::Section(section)]);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), Some("s.inner.a"));
        assert_eq!(action.stop_step_identifier(), Some("s.inner.b"));
    }

    #[test]
    fn unknown_bounds_are_kept_as_written() {
        let weather = AsyncActionConfiguration::Weather(AsyncActionBase::new("weather"))
            .copy_with_start_step_identifier(Some("nowhere".into()));
        let steps = vec![ResolvedStep::Leaf(LeafStep::new("a").with_async_action(weather))];

        let scopes = compute_scopes(&steps);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), Some("nowhere"));
    }

    #[test]
    fn non_recorders_only_receive_a_start() {
        let weather = AsyncActionConfiguration::Weather(AsyncActionBase::new("weather"));
        let section = SectionStep::new("s", vec![ResolvedStep::Leaf(LeafStep::new("s.a").with_async_action(weather)), leaf("s.b")]);

        let scopes = compute_scopes(&[ResolvedStep::Section(section)]);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), Some("s.a"));
        assert_eq!(action.stop_step_identifier(), None);
    }

    #[test]
    fn top_level_declarations_stay_unscoped() {
        let steps = vec![ResolvedStep::Leaf(LeafStep::new("a").with_async_action(motion("motion"))), leaf("b")];

        let scopes = compute_scopes(&steps);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), None);
        assert_eq!(action.stop_step_identifier(), None);
    }

    #[test]
    fn section_declarations_use_the_outer_context() {
        let inner = SectionStep::new("outer.inner", vec![leaf("outer.inner.a"), leaf("outer.inner.b")]).with_async_action(motion("motion"));
        let outer = SectionStep::new("outer", vec![leaf("outer.intro"), ResolvedStep::Section(inner)]);

        let scopes = compute_scopes(&[ResolvedStep::Section(outer)]);
        let action = scopes.first().expect("one scoped action");

        assert_eq!(action.start_step_identifier(), Some("outer.intro"));
        assert_eq!(action.stop_step_identifier(), Some("outer.inner.b"));
    }

    #[test]
    fn equal_declarations_merge() {
        let section = SectionStep::new(
            "s",
            vec![
                ResolvedStep::Leaf(LeafStep::new("s.a").with_async_action(motion("motion"))),
                ResolvedStep::Leaf(LeafStep::new("s.b").with_async_action(motion("motion"))),
            ],
        );

        let scopes = compute_scopes(&[ResolvedStep::Section(section)]);
        assert_eq!(scopes.len(), 1);
    }
}
