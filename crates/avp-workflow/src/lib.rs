//! # AVP Workflow
//!
//! Orchestration of validation workflows for the model validation platform.
//!
//! A workflow is a fixed pipeline of named tasks (validate, allocate, assign,
//! ground truth, configure, execute, analyze, report, cleanup) run for one
//! project under one of four strategies:
//!
//! - **Sequential**: list order, one task at a time
//! - **Parallel**: dependency levels, every task of a level concurrently
//! - **Hybrid**: critical tasks sequentially, the rest by dependency level
//! - **Adaptive**: picks one of the above from a complexity score
//!
//! Progress records are kept in an injectable [`WorkflowStateStore`] and
//! every mutation goes through compare-and-swap, so concurrently finishing
//! tasks never lose updates.
//!
//! [`ProgressTracker`] is a separate per-project, per-component progress
//! board with synchronous change callbacks.

pub mod complexity;
pub mod definition;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod progress_tracker;
pub mod registry;
pub mod store;
mod strategies;

pub use complexity::{ComplexityAnalyzer, HeuristicComplexityAnalyzer};
pub use definition::{
    ExecutionStrategy, TaskType, WorkflowConfiguration, WorkflowPriority, WorkflowProgress,
    WorkflowState, WorkflowTask,
};
pub use error::WorkflowError;
pub use orchestrator::WorkflowOrchestrator;
pub use progress_tracker::{OverallProgress, ProgressRecord, ProgressTracker};
pub use registry::{LoggingTaskHandler, TaskContext, TaskHandler, TaskRegistry};
pub use store::{MemoryWorkflowStateStore, WorkflowStateStore};
