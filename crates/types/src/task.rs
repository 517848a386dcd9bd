//! Task definitions, resolved tasks, and task metadata.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::async_action::AsyncActionConfiguration;
use crate::step::{LeafStep, RawStep, ResolvedStep, Step, collect_leaves};

/// Task as authored, before transformers are expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub identifier: String,
    pub steps: Vec<RawStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
}

/// Fully resolved task ready for navigation.
///
/// Holds no transformers, every step identifier is unique, and `async_actions`
/// carries the scoped set computed from the declarations in `steps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub identifier: String,
    pub steps: Vec<ResolvedStep>,
    pub async_actions: IndexSet<AsyncActionConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
}

impl Task {
    pub fn copy_with_steps(&self, steps: Vec<ResolvedStep>) -> Self {
        Self {
            steps,
            ..self.clone()
        }
    }

    pub fn copy_with_async_actions(&self, async_actions: IndexSet<AsyncActionConfiguration>) -> Self {
        Self {
            async_actions,
            ..self.clone()
        }
    }

    /// Leaves in document order; the sequence a participant walks through.
    pub fn leaves(&self) -> Vec<&LeafStep> {
        let mut leaves = Vec::new();
        collect_leaves(&self.steps, &mut leaves);
        leaves
    }

    /// Finds a step (leaf or section) by qualified identifier.
    pub fn find_step(&self, identifier: &str) -> Option<&ResolvedStep> {
        self.steps.iter().find_map(|step| step.find(identifier))
    }

    /// Every step identifier in preorder, sections included.
    pub fn identifiers(&self) -> Vec<&str> {
        fn walk<'a>(steps: &'a [ResolvedStep], identifiers: &mut Vec<&'a str>) {
            for step in steps {
                identifiers.push(step.identifier());
                if let ResolvedStep::Section(section) = step {
                    walk(&section.steps, identifiers);
                }
            }
        }

        let mut identifiers = Vec::new();
        walk(&self.steps, &mut identifiers);
        identifiers
    }
}

impl From<Task> for TaskDefinition {
    fn from(task: Task) -> Self {
        Self {
            identifier: task.identifier,
            steps: task.steps.into_iter().map(RawStep::from).collect(),
            title: task.title,
            icon_name: task.icon_name,
        }
    }
}

/// Descriptive metadata shown before a task starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    /// Expected time to complete, in minutes.
    #[serde(default, rename = "estimatedDuration", skip_serializing_if = "Option::is_none")]
    pub estimated_duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::SectionStep;
    use serde_json::json;

    fn resolved_task() -> Task {
        Task {
            identifier: "t1".into(),
            steps: vec![
                ResolvedStep::Section(SectionStep::new(
                    "intro",
                    vec![
                        ResolvedStep::Leaf(LeafStep::new("intro.welcome")),
                        ResolvedStep::Leaf(LeafStep::new("intro.consent")),
                    ],
                )),
                ResolvedStep::Leaf(LeafStep::new("done")),
            ],
            async_actions: IndexSet::new(),
            title: None,
            icon_name: None,
        }
    }

    #[test]
    fn leaves_follow_document_order() {
        let task = resolved_task();
        let leaves: Vec<&str> = task.leaves().iter().map(|leaf| leaf.identifier.as_str()).collect();
        assert_eq!(leaves, vec!["intro.welcome", "intro.consent", "done"]);
        assert_eq!(task.identifiers(), vec!["intro", "intro.welcome", "intro.consent", "done"]);
    }

    #[test]
    fn find_step_reaches_nested_leaves() {
        let task = resolved_task();
        assert!(task.find_step("intro.consent").and_then(ResolvedStep::as_leaf).is_some());
        assert!(task.find_step("consent").is_none());
    }

    #[test]
    fn deserializes_task_definition() {
        let definition: TaskDefinition = serde_json::from_value(json!({
            "identifier": "tapping",
            "title": "Tapping",
            "steps": [
                { "identifier": "overview", "type": "overview" },
                { "identifier": "right", "type": "transform", "resourceName": "hand.json" }
            ]
        }))
        .expect("deserialize task");

        assert_eq!(definition.identifier, "tapping");
        assert_eq!(definition.steps.len(), 2);
        assert!(matches!(definition.steps[1], RawStep::Transformer(_)));
    }

    #[test]
    fn deserializes_task_info() {
        let info: TaskInfo = serde_json::from_value(json!({
            "identifier": "tapping",
            "title": "Finger Tapping",
            "estimatedDuration": 2
        }))
        .expect("deserialize task info");

        assert_eq!(info.estimated_duration_minutes, Some(2));
        assert_eq!(info.subtitle, None);
    }
}
