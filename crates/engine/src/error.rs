//! Error taxonomy for task loading and recorder bookkeeping.
//!
//! "No next step" is not an error: navigation signals task completion with
//! `None`.

use thiserror::Error;

use crate::resource::ResourceKind;

/// Failure raised by a [`ResourceProvider`](crate::resource::ResourceProvider).
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Nothing is stored under the requested name.
    #[error("no {kind} resource named '{name}'")]
    NotFound { kind: ResourceKind, name: String },
    /// The resource exists but could not be read.
    #[error("failed to read {kind} resource '{name}': {source}")]
    Io {
        kind: ResourceKind,
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while loading or resolving a task. Loads are all-or-nothing.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A task, task-info, or transformer resource could not be located.
    #[error("{kind} resource '{name}' was not found")]
    ResourceNotFound { kind: ResourceKind, name: String },
    /// A resource exists but reading it failed.
    #[error("failed to read {kind} resource '{name}': {source}")]
    Io {
        kind: ResourceKind,
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// A resource was read but is not a valid definition.
    #[error("failed to parse {kind} resource '{name}': {source}")]
    Parse {
        kind: ResourceKind,
        name: String,
        #[source]
        source: serde_json::Error,
    },
    /// Two steps share a qualified identifier after resolution.
    #[error("duplicate step identifier '{identifier}' in resolved task '{task}'")]
    DuplicateIdentifier { task: String, identifier: String },
    /// The load was cancelled before resolution finished.
    #[error("task load was cancelled")]
    Cancelled,
    /// The worker running the load panicked or was aborted.
    #[error("task load worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<ResourceError> for TaskError {
    fn from(error: ResourceError) -> Self {
        match error {
            ResourceError::NotFound { kind, name } => TaskError::ResourceNotFound { kind, name },
            ResourceError::Io { kind, name, source } => TaskError::Io { kind, name, source },
        }
    }
}

/// Precondition violations in recorder bookkeeping.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecorderError {
    /// The requested transition is not valid for the recorder's state.
    #[error("invalid argument for recorder '{recorder}' of task '{task}': {reason}")]
    InvalidArgument {
        task: String,
        recorder: String,
        reason: String,
    },
}
