//! Task handler registry.
//!
//! Every [`TaskType`] of a pipeline must have a handler before a workflow
//! is started; [`TaskRegistry::ensure_covers`] checks that up front so a
//! run never discovers a missing handler halfway through.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};
use tracing::info;

use crate::definition::{TaskType, WorkflowConfiguration, WorkflowTask};
use crate::error::WorkflowError;

/// Data shared by all tasks of one workflow run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub workflow_id: String,
    pub project_id: Option<String>,
    pub config: Arc<WorkflowConfiguration>,
    /// Outputs of finished tasks keyed by task ID.
    outputs: Arc<DashMap<String, Value>>,
}

impl TaskContext {
    pub fn new(workflow_id: impl Into<String>, config: Arc<WorkflowConfiguration>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            project_id: config.project_id.clone(),
            config,
            outputs: Arc::new(DashMap::new()),
        }
    }

    /// Output of an already finished task.
    pub fn output(&self, task_id: &str) -> Option<Value> {
        self.outputs.get(task_id).map(|v| v.value().clone())
    }

    pub fn record(&self, task_id: impl Into<String>, output: Value) {
        self.outputs.insert(task_id.into(), output);
    }

    pub fn completed_tasks(&self) -> usize {
        self.outputs.len()
    }
}

/// Performs the work of one task type.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError>;
}

/// Adapts an async closure into a [`TaskHandler`].
pub struct FnTaskHandler<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnTaskHandler<F, Fut>
where
    F: Fn(WorkflowTask, TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, WorkflowError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnTaskHandler<F, Fut>
where
    F: Fn(WorkflowTask, TaskContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, WorkflowError>> + Send,
{
    async fn handle(&self, task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        (self.f)(task.clone(), ctx.clone()).await
    }
}

/// Handler that only logs the task and reports success.
pub struct LoggingTaskHandler;

#[async_trait]
impl TaskHandler for LoggingTaskHandler {
    async fn handle(&self, task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        info!(
            workflow_id = %ctx.workflow_id,
            task_id = %task.id,
            task_type = %task.task_type,
            "Running task: {}",
            task.name
        );
        Ok(json!({ "task": task.id, "status": "ok" }))
    }
}

/// Maps task types to handlers.
pub struct TaskRegistry {
    handlers: DashMap<TaskType, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Registry with a [`LoggingTaskHandler`] for every task type.
    pub fn with_logging_handlers() -> Self {
        let registry = Self::new();
        let handler: Arc<dyn TaskHandler> = Arc::new(LoggingTaskHandler);
        for task_type in TaskType::ALL {
            registry.register(task_type, handler.clone());
        }
        registry
    }

    /// Register a handler, replacing any previous one for the type.
    pub fn register(&self, task_type: TaskType, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(task_type, handler);
    }

    pub fn register_fn<F, Fut>(&self, task_type: TaskType, f: F)
    where
        F: Fn(WorkflowTask, TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, WorkflowError>> + Send + 'static,
    {
        self.register(task_type, Arc::new(FnTaskHandler::new(f)));
    }

    pub fn get(&self, task_type: TaskType) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(&task_type).map(|h| h.value().clone())
    }

    pub fn contains(&self, task_type: TaskType) -> bool {
        self.handlers.contains_key(&task_type)
    }

    /// Resolve a handler from a task-type tag such as `"test_execution"`.
    pub fn lookup(&self, tag: &str) -> Result<Arc<dyn TaskHandler>, WorkflowError> {
        let task_type: TaskType = tag.parse()?;
        self.get(task_type)
            .ok_or_else(|| WorkflowError::MissingHandler(tag.to_string()))
    }

    /// Fail with the first task type in `tasks` that has no handler.
    pub fn ensure_covers(&self, tasks: &[WorkflowTask]) -> Result<(), WorkflowError> {
        match tasks.iter().find(|t| !self.contains(t.task_type)) {
            Some(task) => Err(WorkflowError::MissingHandler(
                task.task_type.as_str().to_string(),
            )),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
