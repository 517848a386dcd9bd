//! Task repository: the entry point the presentation layer loads tasks through.

use std::sync::Arc;

use taskflow_types::{Task, TaskDefinition, TaskInfo};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::resolver::TaskResolver;
use crate::resource::{ResourceKind, ResourceProvider, decode_resource};

/// Loads resolved tasks and their metadata.
#[async_trait::async_trait]
pub trait TaskRepository: Send + Sync {
    /// Loads, resolves, and scopes the task named `identifier`.
    async fn get_task(&self, identifier: &str) -> Result<Task, TaskError>;

    /// Loads the descriptive metadata of the task named `identifier`.
    async fn get_task_info(&self, identifier: &str) -> Result<TaskInfo, TaskError>;
}

/// Repository backed by a [`ResourceProvider`].
///
/// Async loads run on the blocking pool, since providers may do file or network
/// I/O. Every load gets a child of the repository's cancellation token;
/// [`ResourceTaskRepository::cancel`] aborts loads in flight and refuses new
/// ones.
pub struct ResourceTaskRepository<P> {
    provider: Arc<P>,
    cancellation: CancellationToken,
}

impl<P: ResourceProvider + 'static> ResourceTaskRepository<P> {
    pub fn new(provider: P) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    pub fn from_shared(provider: Arc<P>) -> Self {
        Self {
            provider,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Cancels every in-flight and future load of this repository.
    pub fn cancel(&self) {
        debug!("cancelling task loads");
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Synchronous core of [`TaskRepository::get_task`].
    pub fn load_task(&self, identifier: &str) -> Result<Task, TaskError> {
        load_task(self.provider.as_ref(), identifier, self.cancellation.child_token())
    }

    /// Synchronous core of [`TaskRepository::get_task_info`].
    pub fn load_task_info(&self, identifier: &str) -> Result<TaskInfo, TaskError> {
        load_task_info(self.provider.as_ref(), identifier)
    }
}

#[async_trait::async_trait]
impl<P: ResourceProvider + 'static> TaskRepository for ResourceTaskRepository<P> {
    async fn get_task(&self, identifier: &str) -> Result<Task, TaskError> {
        let provider = Arc::clone(&self.provider);
        let token = self.cancellation.child_token();
        let worker_token = token.clone();
        let identifier = identifier.to_string();
        let handle = tokio::task::spawn_blocking(move || load_task(provider.as_ref(), &identifier, worker_token));

        tokio::select! {
            joined = handle => joined?,
            () = token.cancelled() => Err(TaskError::Cancelled),
        }
    }

    async fn get_task_info(&self, identifier: &str) -> Result<TaskInfo, TaskError> {
        if self.cancellation.is_cancelled() {
            return Err(TaskError::Cancelled);
        }
        let provider = Arc::clone(&self.provider);
        let identifier = identifier.to_string();
        tokio::task::spawn_blocking(move || load_task_info(provider.as_ref(), &identifier)).await?
    }
}

fn load_task(provider: &dyn ResourceProvider, identifier: &str, cancellation: CancellationToken) -> Result<Task, TaskError> {
    if cancellation.is_cancelled() {
        return Err(TaskError::Cancelled);
    }
    let bytes = provider.fetch(ResourceKind::Task, identifier)?;
    let definition: TaskDefinition = decode_resource(ResourceKind::Task, identifier, &bytes)?;
    if definition.identifier != identifier {
        warn!(
            requested = %identifier,
            declared = %definition.identifier,
            "task resource declares a different identifier"
        );
    }

    TaskResolver::new(provider)
        .with_cancellation(cancellation)
        .resolve_task(&definition)
}

fn load_task_info(provider: &dyn ResourceProvider, identifier: &str) -> Result<TaskInfo, TaskError> {
    let bytes = provider.fetch(ResourceKind::TaskInfo, identifier)?;
    decode_resource(ResourceKind::TaskInfo, identifier, &bytes)
}
