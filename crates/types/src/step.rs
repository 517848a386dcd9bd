//! Step model.
//!
//! Authored documents deserialize into [`RawStep`] trees, which may still hold
//! [`TransformerStep`] placeholders. Resolution is the only way to obtain a
//! [`ResolvedStep`] tree, so "no transformer after resolution" holds by
//! construction. Every step type is an immutable value: the `copy_with_*`
//! helpers return new values and leave the receiver untouched.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::action::{ActionType, StepAction};
use crate::async_action::AsyncActionConfiguration;
use crate::identifier::{child_prefix, localize};

/// `type` tag of section steps.
pub const SECTION_STEP_TYPE: &str = "section";
/// `type` tag of transformer steps.
pub const TRANSFORMER_STEP_TYPE: &str = "transform";
/// `type` assumed for leaf steps that omit one.
pub const DEFAULT_STEP_TYPE: &str = "instruction";

/// Behaviour shared by every step variant.
pub trait Step {
    fn identifier(&self) -> &str;

    /// Async actions declared directly on this step.
    fn async_actions(&self) -> &[AsyncActionConfiguration];

    /// Returns a copy of this step carrying `identifier`.
    fn copy_with_identifier(&self, identifier: impl Into<String>) -> Self
    where
        Self: Sized;
}

/// A step presented to the participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafStep {
    pub identifier: String,
    /// Presentation kind (`instruction`, `form`, `active`, ...). Opaque to navigation.
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: BTreeMap<ActionType, StepAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub async_actions: Vec<AsyncActionConfiguration>,
    /// Condition over the task result; the step is bypassed while it holds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<String>,
}

impl LeafStep {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            step_type: DEFAULT_STEP_TYPE.to_string(),
            title: None,
            text: None,
            detail: None,
            actions: BTreeMap::new(),
            async_actions: Vec::new(),
            skip_if: None,
        }
    }

    pub fn with_async_action(mut self, action: AsyncActionConfiguration) -> Self {
        self.async_actions.push(action);
        self
    }

    pub fn with_action(mut self, action_type: ActionType, action: StepAction) -> Self {
        self.actions.insert(action_type, action);
        self
    }

    pub fn with_skip_if(mut self, condition: impl Into<String>) -> Self {
        self.skip_if = Some(condition.into());
        self
    }

    pub fn action(&self, action_type: ActionType) -> Option<&StepAction> {
        self.actions.get(&action_type)
    }
}

impl Step for LeafStep {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn async_actions(&self) -> &[AsyncActionConfiguration] {
        &self.async_actions
    }

    fn copy_with_identifier(&self, identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..self.clone()
        }
    }
}

/// Ordered composite of steps, generic over the child representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionStep<S> {
    pub identifier: String,
    pub steps: Vec<S>,
    pub async_actions: Vec<AsyncActionConfiguration>,
}

impl<S> SectionStep<S> {
    pub fn new(identifier: impl Into<String>, steps: Vec<S>) -> Self {
        Self {
            identifier: identifier.into(),
            steps,
            async_actions: Vec::new(),
        }
    }

    pub fn with_async_action(mut self, action: AsyncActionConfiguration) -> Self {
        self.async_actions.push(action);
        self
    }

    /// Returns a section with the same identifier and actions holding `steps`.
    ///
    /// The child type may change, which is how resolution turns a raw section
    /// into a resolved one.
    pub fn copy_with_steps<T>(&self, steps: Vec<T>) -> SectionStep<T> {
        SectionStep {
            identifier: self.identifier.clone(),
            steps,
            async_actions: self.async_actions.clone(),
        }
    }
}

impl<S: Clone> Step for SectionStep<S> {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn async_actions(&self) -> &[AsyncActionConfiguration] {
        &self.async_actions
    }

    fn copy_with_identifier(&self, identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            steps: self.steps.clone(),
            async_actions: self.async_actions.clone(),
        }
    }
}

impl<S: Serialize> Serialize for SectionStep<S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        let field_count = if self.async_actions.is_empty() { 3 } else { 4 };
        let mut state = serializer.serialize_struct("SectionStep", field_count)?;
        state.serialize_field("identifier", &self.identifier)?;
        state.serialize_field("type", SECTION_STEP_TYPE)?;
        state.serialize_field("steps", &self.steps)?;
        if !self.async_actions.is_empty() {
            state.serialize_field("asyncActions", &self.async_actions)?;
        }
        state.end()
    }
}

/// Placeholder for a section stored as a separate resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformerStep {
    pub identifier: String,
    /// Name of the transformer resource holding the section definition.
    pub resource_name: String,
}

impl TransformerStep {
    pub fn new(identifier: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            resource_name: resource_name.into(),
        }
    }
}

impl Step for TransformerStep {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn async_actions(&self) -> &[AsyncActionConfiguration] {
        &[]
    }

    fn copy_with_identifier(&self, identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            resource_name: self.resource_name.clone(),
        }
    }
}

impl Serialize for TransformerStep {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        let mut state = serializer.serialize_struct("TransformerStep", 3)?;
        state.serialize_field("identifier", &self.identifier)?;
        state.serialize_field("type", TRANSFORMER_STEP_TYPE)?;
        state.serialize_field("resourceName", &self.resource_name)?;
        state.end()
    }
}

/// Authored step tree node; may still contain transformers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RawStep {
    Leaf(LeafStep),
    Section(SectionStep<RawStep>),
    Transformer(TransformerStep),
}

/// Step tree node after resolution. Contains no transformers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ResolvedStep {
    Leaf(LeafStep),
    Section(SectionStep<ResolvedStep>),
}

impl Step for RawStep {
    fn identifier(&self) -> &str {
        match self {
            Self::Leaf(step) => step.identifier(),
            Self::Section(section) => section.identifier(),
            Self::Transformer(transformer) => transformer.identifier(),
        }
    }

    fn async_actions(&self) -> &[AsyncActionConfiguration] {
        match self {
            Self::Leaf(step) => step.async_actions(),
            Self::Section(section) => section.async_actions(),
            Self::Transformer(transformer) => transformer.async_actions(),
        }
    }

    fn copy_with_identifier(&self, identifier: impl Into<String>) -> Self {
        match self {
            Self::Leaf(step) => Self::Leaf(step.copy_with_identifier(identifier)),
            Self::Section(section) => Self::Section(section.copy_with_identifier(identifier)),
            Self::Transformer(transformer) => Self::Transformer(transformer.copy_with_identifier(identifier)),
        }
    }
}

impl Step for ResolvedStep {
    fn identifier(&self) -> &str {
        match self {
            Self::Leaf(step) => step.identifier(),
            Self::Section(section) => section.identifier(),
        }
    }

    fn async_actions(&self) -> &[AsyncActionConfiguration] {
        match self {
            Self::Leaf(step) => step.async_actions(),
            Self::Section(section) => section.async_actions(),
        }
    }

    fn copy_with_identifier(&self, identifier: impl Into<String>) -> Self {
        match self {
            Self::Leaf(step) => Self::Leaf(step.copy_with_identifier(identifier)),
            Self::Section(section) => Self::Section(section.copy_with_identifier(identifier)),
        }
    }
}

impl ResolvedStep {
    pub fn as_section(&self) -> Option<&SectionStep<ResolvedStep>> {
        match self {
            Self::Section(section) => Some(section),
            Self::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafStep> {
        match self {
            Self::Leaf(step) => Some(step),
            Self::Section(_) => None,
        }
    }

    /// Leftmost leaf, reached by repeatedly descending into first children.
    pub fn first_leaf(&self) -> Option<&LeafStep> {
        let mut current = self;
        loop {
            match current {
                Self::Leaf(step) => return Some(step),
                Self::Section(section) => current = section.steps.first()?,
            }
        }
    }

    /// Rightmost leaf, reached by repeatedly descending into last children.
    pub fn last_leaf(&self) -> Option<&LeafStep> {
        let mut current = self;
        loop {
            match current {
                Self::Leaf(step) => return Some(step),
                Self::Section(section) => current = section.steps.last()?,
            }
        }
    }

    /// Leaves of this subtree in document order.
    pub fn leaves(&self) -> Vec<&LeafStep> {
        let mut leaves = Vec::new();
        collect_leaves(std::slice::from_ref(self), &mut leaves);
        leaves
    }

    /// Finds the step (leaf or section) with `identifier` in this subtree.
    pub fn find(&self, identifier: &str) -> Option<&ResolvedStep> {
        if self.identifier() == identifier {
            return Some(self);
        }
        match self {
            Self::Leaf(_) => None,
            Self::Section(section) => section.steps.iter().find_map(|child| child.find(identifier)),
        }
    }
}

/// Appends the leaves of `steps` to `leaves` in document order.
pub fn collect_leaves<'a>(steps: &'a [ResolvedStep], leaves: &mut Vec<&'a LeafStep>) {
    for step in steps {
        match step {
            ResolvedStep::Leaf(leaf) => leaves.push(leaf),
            ResolvedStep::Section(section) => collect_leaves(&section.steps, leaves),
        }
    }
}

/// Turns a top-level resolved step back into its authored form.
///
/// Identifiers are reduced to their local form, so resolving the result again
/// reproduces the original tree.
impl From<ResolvedStep> for RawStep {
    fn from(step: ResolvedStep) -> Self {
        RawStep::from_resolved(step, "")
    }
}

impl RawStep {
    /// Authored form of a resolved step whose enclosing sections qualify it with `prefix`.
    pub fn from_resolved(step: ResolvedStep, prefix: &str) -> Self {
        match step {
            ResolvedStep::Leaf(leaf) => {
                let local = localize(prefix, &leaf.identifier).to_string();
                RawStep::Leaf(LeafStep {
                    identifier: local,
                    ..leaf
                })
            }
            ResolvedStep::Section(section) => {
                let children = child_prefix(&section.identifier);
                let steps = section
                    .steps
                    .into_iter()
                    .map(|child| RawStep::from_resolved(child, &children))
                    .collect();
                RawStep::Section(SectionStep {
                    identifier: localize(prefix, &section.identifier).to_string(),
                    steps,
                    async_actions: section.async_actions,
                })
            }
        }
    }
}

/// Structural problems in an authored step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StepDefinitionError {
    #[error("step is missing the required 'identifier'")]
    MissingIdentifier,
    #[error("section step '{0}' must declare at least one step")]
    EmptySection(String),
    #[error("transformer step '{0}' is missing 'resourceName'")]
    MissingResourceName(String),
}

/// Wire shape of any authored step, validated into a [`RawStep`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepDocument {
    #[serde(default)]
    identifier: String,
    #[serde(default, rename = "type")]
    step_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
    #[serde(default)]
    resource_name: Option<String>,
    #[serde(default)]
    actions: BTreeMap<ActionType, StepAction>,
    #[serde(default)]
    async_actions: Vec<AsyncActionConfiguration>,
    #[serde(default)]
    skip_if: Option<String>,
}

impl<'de> Deserialize<'de> for RawStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = StepDocument::deserialize(deserializer)?;
        RawStep::try_from(document).map_err(D::Error::custom)
    }
}

impl TryFrom<StepDocument> for RawStep {
    type Error = StepDefinitionError;

    fn try_from(document: StepDocument) -> Result<Self, Self::Error> {
        let identifier = document.identifier.trim().to_string();
        if identifier.is_empty() {
            return Err(StepDefinitionError::MissingIdentifier);
        }

        match document.step_type.as_deref() {
            Some(SECTION_STEP_TYPE) => {
                if document.steps.is_empty() {
                    return Err(StepDefinitionError::EmptySection(identifier));
                }
                Ok(RawStep::Section(SectionStep {
                    identifier,
                    steps: document.steps,
                    async_actions: document.async_actions,
                }))
            }
            Some(TRANSFORMER_STEP_TYPE) => {
                let resource_name = document
                    .resource_name
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| StepDefinitionError::MissingResourceName(identifier.clone()))?;
                Ok(RawStep::Transformer(TransformerStep { identifier, resource_name }))
            }
            other => Ok(RawStep::Leaf(LeafStep {
                identifier,
                step_type: other.unwrap_or(DEFAULT_STEP_TYPE).to_string(),
                title: document.title,
                text: document.text,
                detail: document.detail,
                actions: document.actions,
                async_actions: document.async_actions,
                skip_if: document.skip_if,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_action::RecorderConfiguration;
    use serde_json::json;

    #[test]
    fn deserializes_nested_step_tree() {
        let step: RawStep = serde_json::from_value(json!({
            "identifier": "intro",
            "type": "section",
            "steps": [
                { "identifier": "welcome", "type": "instruction", "title": "Hello" },
                { "identifier": "tapping", "type": "transform", "resourceName": "tapping.json" },
                {
                    "identifier": "consent",
                    "actions": { "skip": { "buttonTitle": "Not now", "skipToStepIdentifier": "done" } }
                }
            ]
        }))
        .expect("deserialize section");

        let RawStep::Section(section) = step else {
            panic!("expected a section");
        };
        assert_eq!(section.identifier, "intro");
        assert_eq!(section.steps.len(), 3);
        assert!(matches!(&section.steps[1], RawStep::Transformer(t) if t.resource_name == "tapping.json"));
        let RawStep::Leaf(consent) = &section.steps[2] else {
            panic!("expected a leaf");
        };
        assert_eq!(consent.step_type, DEFAULT_STEP_TYPE);
        assert_eq!(
            consent.action(ActionType::Skip).and_then(|a| a.skip_to_step_identifier.as_deref()),
            Some("done")
        );
    }

    #[test]
    fn rejects_empty_sections() {
        let error = serde_json::from_value::<RawStep>(json!({
            "identifier": "empty",
            "type": "section",
            "steps": []
        }))
        .expect_err("empty section must fail");

        assert!(error.to_string().contains("must declare at least one step"));
    }

    #[test]
    fn rejects_transformer_without_resource() {
        let error = serde_json::from_value::<RawStep>(json!({
            "identifier": "tapping",
            "type": "transform"
        }))
        .expect_err("transformer without resource must fail");

        assert!(error.to_string().contains("resourceName"));
    }

    #[test]
    fn rejects_missing_identifier() {
        let error = serde_json::from_value::<RawStep>(json!({ "type": "instruction" })).expect_err("missing identifier");
        assert!(error.to_string().contains("identifier"));
    }

    #[test]
    fn copy_with_identifier_leaves_original_untouched() {
        let original = LeafStep::new("welcome");
        let copy = original.copy_with_identifier("intro.welcome");

        assert_eq!(copy.identifier(), "intro.welcome");
        assert_eq!(original.identifier(), "welcome");
        assert_ne!(copy, original);
    }

    #[test]
    fn first_and_last_leaf_descend_through_sections() {
        let inner = ResolvedStep::Section(SectionStep::new(
            "s.inner",
            vec![
                ResolvedStep::Leaf(LeafStep::new("s.inner.a")),
                ResolvedStep::Leaf(LeafStep::new("s.inner.b")),
            ],
        ));
        let outer = ResolvedStep::Section(SectionStep::new("s", vec![inner, ResolvedStep::Leaf(LeafStep::new("s.c"))]));

        assert_eq!(outer.first_leaf().map(|leaf| leaf.identifier.as_str()), Some("s.inner.a"));
        assert_eq!(outer.last_leaf().map(|leaf| leaf.identifier.as_str()), Some("s.c"));
        let leaves: Vec<&str> = outer.leaves().iter().map(|leaf| leaf.identifier.as_str()).collect();
        assert_eq!(leaves, vec!["s.inner.a", "s.inner.b", "s.c"]);
        assert!(outer.find("s.inner").and_then(ResolvedStep::as_section).is_some());
    }

    #[test]
    fn raw_form_restores_local_identifiers() {
        let resolved = ResolvedStep::Section(SectionStep::new(
            "intro",
            vec![
                ResolvedStep::Leaf(LeafStep::new("intro.intro.video")),
                ResolvedStep::Leaf(LeafStep::new("intro.video")),
            ],
        ));

        let RawStep::Section(section) = RawStep::from(resolved) else {
            panic!("expected a section");
        };
        let locals: Vec<&str> = section.steps.iter().map(|step| step.identifier()).collect();
        assert_eq!(section.identifier, "intro");
        assert_eq!(locals, vec!["intro.video", "video"]);
    }

    #[test]
    fn section_serializes_type_tag() {
        let section = SectionStep::new("intro", vec![ResolvedStep::Leaf(LeafStep::new("intro.welcome"))])
            .with_async_action(AsyncActionConfiguration::Motion(RecorderConfiguration::new("motion")));
        let value = serde_json::to_value(ResolvedStep::Section(section)).expect("serialize section");

        assert_eq!(value["type"], "section");
        assert_eq!(value["steps"][0]["identifier"], "intro.welcome");
        assert_eq!(value["steps"][0]["type"], "instruction");
        assert_eq!(value["asyncActions"][0]["type"], "motion");
    }

    #[test]
    fn steps_hash_structurally() {
        use std::collections::HashSet;

        let mut steps = HashSet::new();
        steps.insert(LeafStep::new("a"));
        steps.insert(LeafStep::new("a"));
        steps.insert(LeafStep::new("b"));
        assert_eq!(steps.len(), 2);
    }
}
