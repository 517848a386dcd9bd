//! Strongly typed task definitions shared by the engine and the command line.
//!
//! The models here mirror the JSON documents authored for research tasks:
//! steps (leaves, sections, transformer placeholders), async action
//! declarations, participant-facing actions, task metadata, and the results a
//! participant accumulates while walking through a task.

pub mod action;
pub mod async_action;
pub mod identifier;
pub mod result;
pub mod step;
pub mod task;

pub use action::{ActionType, StepAction};
pub use async_action::{AsyncActionBase, AsyncActionConfiguration, RecorderConfiguration};
pub use result::{StepResult, TaskResult};
pub use step::{LeafStep, RawStep, ResolvedStep, SectionStep, Step, StepDefinitionError, TransformerStep};
pub use task::{Task, TaskDefinition, TaskInfo};
