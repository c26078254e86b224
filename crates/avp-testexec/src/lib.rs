//! # AVP Test Execution
//!
//! Plans and runs the test sessions of a project.
//!
//! A [`TestExecutionPlan`] orders sessions by creation time and chunks them
//! into groups of `max_concurrent_tests`. [`TestExecutionOrchestrator`] runs
//! the plan either one session at a time or group by group, with a worker
//! semaphore bounding concurrency inside a group. The model itself sits
//! behind the [`TestRunner`] trait; [`SimulatedTestRunner`] stands in for it.

pub mod error;
pub mod orchestrator;
pub mod plan;
pub mod repository;
pub mod runner;
mod schema;

pub use error::TestExecutionError;
pub use orchestrator::TestExecutionOrchestrator;
pub use plan::{ExecutionSummary, SessionResult, TestExecutionPlan, TestExecutionReport};
pub use repository::{
    MemoryTestSessionRepository, SqliteTestSessionRepository, TestSessionStore,
};
pub use runner::{SimulatedTestRunner, TestRunner};
