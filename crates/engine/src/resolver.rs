//! Task resolution: transformer expansion and hierarchical identifiers.
//!
//! Resolution walks the authored tree depth-first in preorder:
//!
//! - a transformer under prefix `p` is replaced by the section stored in its
//!   resource, renamed to `p + transformer.identifier`, and resolved under `p`
//!   (the transformer's identifier becomes the section's, not an extra level);
//! - a section takes `p + identifier` and resolves its children under
//!   `p + identifier + "."`, preserving order;
//! - a leaf takes `p + identifier`.
//!
//! Qualification always prepends the prefix, even when a local identifier
//! already starts with it. A resolved task converted back through
//! [`TaskDefinition::from`] carries local identifiers again, so resolving it
//! yields an equal tree. The cancellation token is checked at every node; a
//! failure anywhere discards the whole load.

use std::collections::HashSet;

use serde::de::Error as _;
use serde_json::Value;
use taskflow_types::identifier::{child_prefix, qualify};
use taskflow_types::step::SECTION_STEP_TYPE;
use taskflow_types::{RawStep, ResolvedStep, SectionStep, Step, Task, TaskDefinition, TransformerStep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::TaskError;
use crate::resource::{ResourceKind, ResourceProvider, decode_resource};
use crate::scope::compute_scopes;

/// Resolves authored task trees against a resource provider.
pub struct TaskResolver<'a> {
    provider: &'a dyn ResourceProvider,
    cancellation: CancellationToken,
}

impl<'a> TaskResolver<'a> {
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self {
            provider,
            cancellation: CancellationToken::new(),
        }
    }

    /// Uses `cancellation` to abort resolution between nodes.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Resolves a task definition into a navigable [`Task`] with scoped async actions.
    ///
    /// # Errors
    ///
    /// - [`TaskError::ResourceNotFound`] when a transformer resource is missing
    /// - [`TaskError::Io`] / [`TaskError::Parse`] when a transformer resource cannot be read or decoded
    /// - [`TaskError::DuplicateIdentifier`] when two steps resolve to the same identifier
    /// - [`TaskError::Cancelled`] when the token fires mid-resolution
    pub fn resolve_task(&self, definition: &TaskDefinition) -> Result<Task, TaskError> {
        let steps = self.resolve_steps(&definition.steps, "")?;
        ensure_unique_identifiers(&definition.identifier, &steps)?;
        let async_actions = compute_scopes(&steps);
        info!(
            task = %definition.identifier,
            top_level_steps = steps.len(),
            async_actions = async_actions.len(),
            "resolved task"
        );

        Ok(Task {
            identifier: definition.identifier.clone(),
            steps,
            async_actions,
            title: definition.title.clone(),
            icon_name: definition.icon_name.clone(),
        })
    }

    /// Resolves a sibling list under `prefix`.
    pub fn resolve_steps(&self, steps: &[RawStep], prefix: &str) -> Result<Vec<ResolvedStep>, TaskError> {
        steps.iter().map(|step| self.resolve_step(step, prefix)).collect()
    }

    /// Resolves a single step under `prefix`.
    pub fn resolve_step(&self, step: &RawStep, prefix: &str) -> Result<ResolvedStep, TaskError> {
        if self.cancellation.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        match step {
            RawStep::Transformer(transformer) => {
                let section = self.fetch_transformer(transformer)?;
                let renamed = section.copy_with_identifier(transformer.identifier.clone());
                debug!(
                    transformer = %transformer.identifier,
                    resource = %transformer.resource_name,
                    section = %qualify(prefix, &renamed.identifier),
                    "expanded transformer"
                );
                self.resolve_section(&renamed, prefix)
            }
            RawStep::Section(section) => self.resolve_section(section, prefix),
            RawStep::Leaf(leaf) => Ok(ResolvedStep::Leaf(leaf.copy_with_identifier(qualify(prefix, &leaf.identifier)))),
        }
    }

    fn resolve_section(&self, section: &SectionStep<RawStep>, prefix: &str) -> Result<ResolvedStep, TaskError> {
        let identifier = qualify(prefix, &section.identifier);
        let steps = self.resolve_steps(&section.steps, &child_prefix(&identifier))?;
        Ok(ResolvedStep::Section(SectionStep {
            identifier,
            steps,
            async_actions: section.async_actions.clone(),
        }))
    }

    /// Loads the section stored behind a transformer.
    ///
    /// Stored sections may omit `type` and `identifier`; both are implied by
    /// the transformer that references them.
    fn fetch_transformer(&self, transformer: &TransformerStep) -> Result<SectionStep<RawStep>, TaskError> {
        let name = transformer.resource_name.as_str();
        let bytes = self.provider.fetch(ResourceKind::Transformer, name)?;
        if self.cancellation.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let mut document: Value = decode_resource(ResourceKind::Transformer, name, &bytes)?;
        if let Value::Object(fields) = &mut document {
            fields
                .entry("type")
                .or_insert_with(|| Value::String(SECTION_STEP_TYPE.to_string()));
            fields
                .entry("identifier")
                .or_insert_with(|| Value::String(transformer.identifier.clone()));
        }

        let parse_error = |source: serde_json::Error| TaskError::Parse {
            kind: ResourceKind::Transformer,
            name: name.to_string(),
            source,
        };
        match serde_json::from_value::<RawStep>(document).map_err(parse_error)? {
            RawStep::Section(section) => Ok(section),
            other => Err(parse_error(serde_json::Error::custom(format!(
                "transformer resource must define a section step, found '{}'",
                other.identifier()
            )))),
        }
    }
}

fn ensure_unique_identifiers(task: &str, steps: &[ResolvedStep]) -> Result<(), TaskError> {
    fn walk<'a>(task: &str, steps: &'a [ResolvedStep], seen: &mut HashSet<&'a str>) -> Result<(), TaskError> {
        for step in steps {
            if !seen.insert(step.identifier()) {
                return Err(TaskError::DuplicateIdentifier {
                    task: task.to_string(),
                    identifier: step.identifier().to_string(),
                });
            }
            if let ResolvedStep::Section(section) = step {
                walk(task, &section.steps, seen)?;
            }
        }
        Ok(())
    }

    walk(task, steps, &mut HashSet::new())
}
