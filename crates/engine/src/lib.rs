//! # Taskflow Engine
//!
//! Turns authored research-task definitions into navigable tasks and walks a
//! participant through them.
//!
//! ## Key Features
//!
//! - **Resolution**: expands transformer placeholders and assigns hierarchical
//!   step identifiers (`section.child`)
//! - **Async action scoping**: infers start/stop windows for background
//!   recorders from their position in the section tree
//! - **Navigation**: positional order with composable skip and jump decorators
//! - **Repository**: async loading over any [`ResourceProvider`] with cancellation
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use taskflow_engine::navigation::{ConditionSkipRuleFactory, NavigatorLayer, OrderedStepNavigator, compose};
//! use taskflow_engine::{InMemoryResourceProvider, ResourceKind, ResourceTaskRepository, StepNavigator};
//! use taskflow_types::TaskResult;
//!
//! let provider = InMemoryResourceProvider::new().with_resource(
//!     ResourceKind::Task,
//!     "t1",
//!     r#"{ "identifier": "t1", "steps": [
//!         { "identifier": "intro", "type": "section",
//!           "steps": [{ "identifier": "welcome" }, { "identifier": "consent" }] },
//!         { "identifier": "done" }
//!     ] }"#,
//! );
//! let task = ResourceTaskRepository::new(provider).load_task("t1")?;
//!
//! let navigator = compose(
//!     Box::new(OrderedStepNavigator::new(Arc::new(task))),
//!     vec![NavigatorLayer::skip(ConditionSkipRuleFactory)],
//! );
//! let result = TaskResult::new("t1");
//! let first = navigator.next_step(None, &result).map(|step| step.identifier.clone());
//! assert_eq!(first.as_deref(), Some("intro.welcome"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod navigation;
pub mod recorder;
pub mod repository;
pub mod resolver;
pub mod resource;
pub mod scope;

pub use error::{RecorderError, ResourceError, TaskError};
pub use navigation::{NavigatorLayer, Progress, StepNavigator, compose};
pub use recorder::{AsyncActionSchedule, RecorderRegistry, RecorderState};
pub use repository::{ResourceTaskRepository, TaskRepository};
pub use resolver::TaskResolver;
pub use resource::{DirectoryResourceProvider, InMemoryResourceProvider, ResourceKind, ResourceProvider};
pub use scope::compute_scopes;
